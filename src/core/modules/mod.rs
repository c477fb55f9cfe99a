// mod.rs - Module identity, assignment bookkeeping and detection driver

pub mod cut;
pub mod hclust;
pub mod merge;

use ndarray::ArrayView2;
use serde::Serialize;

use crate::error::{CoexError, Result};
pub use cut::cut_tree;
pub use hclust::{average_linkage, Dendrogram, MergeStep};
pub use merge::merge_close_modules;

/// Opaque module identifier. `0` is reserved for genes not co-expressed
/// with any qualifying group. Color names are a separate display mapping,
/// never the identity used across merge steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleId(pub usize);

impl ModuleId {
    pub const UNASSIGNED: ModuleId = ModuleId(0);

    pub fn is_unassigned(self) -> bool {
        self.0 == 0
    }

    /// Display color, following the conventional module palette.
    /// Unassigned genes are grey.
    pub fn color(self) -> String {
        const PALETTE: [&str; 24] = [
            "turquoise",
            "blue",
            "brown",
            "yellow",
            "green",
            "red",
            "black",
            "pink",
            "magenta",
            "purple",
            "greenyellow",
            "tan",
            "salmon",
            "cyan",
            "midnightblue",
            "lightcyan",
            "grey60",
            "lightgreen",
            "lightyellow",
            "royalblue",
            "darkred",
            "darkgreen",
            "darkturquoise",
            "orange",
        ];
        if self.0 == 0 {
            "grey".to_string()
        } else if self.0 <= PALETTE.len() {
            PALETTE[self.0 - 1].to_string()
        } else {
            format!("module{}", self.0)
        }
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.color())
    }
}

/// Gene-to-module mapping, with both the initial (pre-merge) and merged
/// labels retained for traceability. Mutated only during detection.
#[derive(Debug, Clone)]
pub struct ModuleAssignment {
    pub gene_ids: Vec<String>,
    pub initial: Vec<ModuleId>,
    pub merged: Vec<ModuleId>,
}

impl ModuleAssignment {
    /// Distinct assigned module ids after merging, ascending.
    pub fn modules(&self) -> Vec<ModuleId> {
        let mut ids: Vec<ModuleId> = self
            .merged
            .iter()
            .copied()
            .filter(|m| !m.is_unassigned())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Indices of the genes assigned to `module` (post-merge labels).
    pub fn genes_in(&self, module: ModuleId) -> Vec<usize> {
        self.merged
            .iter()
            .enumerate()
            .filter(|(_, &m)| m == module)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn module_size(&self, module: ModuleId) -> usize {
        self.merged.iter().filter(|&&m| m == module).count()
    }

    pub fn n_unassigned(&self) -> usize {
        self.merged.iter().filter(|m| m.is_unassigned()).count()
    }

    /// Resolve a user-supplied label (color name, `module<k>` or a bare
    /// number) to a module id with at least one gene.
    pub fn resolve_label(&self, label: &str) -> Result<ModuleId> {
        let candidate = self
            .modules()
            .into_iter()
            .find(|m| m.color() == label)
            .or_else(|| {
                label
                    .parse::<usize>()
                    .ok()
                    .map(ModuleId)
                    .filter(|m| self.module_size(*m) > 0 && !m.is_unassigned())
            });
        candidate.ok_or_else(|| CoexError::UnknownModule(label.to_string()))
    }
}

/// Module detection configuration: branch-cut sensitivity, minimum module
/// size and eigengene merge cutoff.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DetectorConfig {
    pub min_module_size: usize,
    /// Branch cut height as a fraction of the tallest dendrogram merge.
    pub cut_height_fraction: f64,
    /// Modules whose eigengene dissimilarity (1 - cor) is at or below this
    /// value are merged.
    pub merge_cut_height: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_module_size: 30,
            cut_height_fraction: 0.99,
            merge_cut_height: 0.25,
        }
    }
}

/// Full module detection: average-linkage clustering on TOM dissimilarity,
/// branch cut with the minimum-size constraint, then eigengene-similarity
/// merging. `expr` is the samples x genes matrix behind the dissimilarity.
pub fn detect_modules(
    expr: ArrayView2<f64>,
    gene_ids: &[String],
    dissimilarity: ArrayView2<f64>,
    config: &DetectorConfig,
) -> Result<(Dendrogram, ModuleAssignment)> {
    if gene_ids.len() != dissimilarity.nrows() {
        return Err(CoexError::ShapeMismatch {
            stage: "module detection",
            detail: format!(
                "{} gene ids for a {} x {} dissimilarity matrix",
                gene_ids.len(),
                dissimilarity.nrows(),
                dissimilarity.ncols()
            ),
        });
    }

    let dendrogram = average_linkage(dissimilarity)?;
    let cut_height = config.cut_height_fraction * dendrogram.max_height();
    let initial = cut_tree(&dendrogram, cut_height, config.min_module_size);

    let n_initial = distinct_assigned(&initial);
    if n_initial == 0 {
        println!(
            "⚠️  No branch reached the minimum module size ({}); all {} genes are unassigned",
            config.min_module_size,
            gene_ids.len()
        );
    }

    let (merged, n_merges) = merge_close_modules(expr, &initial, config.merge_cut_height)?;
    if n_merges > 0 {
        println!(
            "🔗 Merged {} module pair(s) at eigengene dissimilarity <= {} ({} -> {} modules)",
            n_merges,
            config.merge_cut_height,
            n_initial,
            distinct_assigned(&merged)
        );
    }

    Ok((
        dendrogram,
        ModuleAssignment {
            gene_ids: gene_ids.to_vec(),
            initial,
            merged,
        },
    ))
}

fn distinct_assigned(labels: &[ModuleId]) -> usize {
    let mut ids: Vec<ModuleId> = labels
        .iter()
        .copied()
        .filter(|m| !m.is_unassigned())
        .collect();
    ids.sort();
    ids.dedup();
    ids.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn module_colors_are_stable() {
        assert_eq!(ModuleId::UNASSIGNED.color(), "grey");
        assert_eq!(ModuleId(1).color(), "turquoise");
        assert_eq!(ModuleId(2).color(), "blue");
        assert_eq!(ModuleId(99).color(), "module99");
    }

    #[test]
    fn resolve_label_by_color_and_number() {
        let assignment = ModuleAssignment {
            gene_ids: vec!["a".into(), "b".into(), "c".into()],
            initial: vec![ModuleId(1), ModuleId(1), ModuleId::UNASSIGNED],
            merged: vec![ModuleId(1), ModuleId(1), ModuleId::UNASSIGNED],
        };
        assert_eq!(assignment.resolve_label("turquoise").unwrap(), ModuleId(1));
        assert_eq!(assignment.resolve_label("1").unwrap(), ModuleId(1));
        assert!(matches!(
            assignment.resolve_label("blue").unwrap_err(),
            CoexError::UnknownModule(_)
        ));
    }

    /// 3 samples x 4 genes, two perfectly correlated pairs
    /// independent of each other, minimum module size 2 -> exactly two
    /// modules, one per pair.
    #[test]
    fn two_pair_scenario_yields_two_modules() {
        let expr = ndarray::array![
            [1.0, 2.0, 5.0, 10.0],
            [2.0, 4.0, 1.0, 2.0],
            [3.0, 6.0, 3.0, 6.0]
        ];
        let gene_ids: Vec<String> = (1..=4).map(|i| format!("g{}", i)).collect();
        let cor = crate::core::correlation::self_correlations(expr.view(), &gene_ids).unwrap();
        let adj =
            crate::core::adjacency::adjacency(cor.cor.view(), 2.0, crate::core::SignMode::Signed)
                .unwrap();
        let tom = crate::core::tom::tom_similarity(adj.view(), 64).unwrap();
        let diss = crate::core::tom::tom_dissimilarity(tom.view());

        let config = DetectorConfig {
            min_module_size: 2,
            ..Default::default()
        };
        let (_, assignment) =
            detect_modules(expr.view(), &gene_ids, diss.view(), &config).unwrap();

        assert_eq!(assignment.modules().len(), 2);
        assert_eq!(assignment.merged[0], assignment.merged[1]);
        assert_eq!(assignment.merged[2], assignment.merged[3]);
        assert_ne!(assignment.merged[0], assignment.merged[2]);
        assert_eq!(assignment.n_unassigned(), 0);
    }

    /// Fewer genes than the minimum module size is reported, not an error.
    #[test]
    fn everything_unassigned_is_not_an_error() {
        let expr = ndarray::array![[1.0, 5.0], [2.0, 3.0], [3.0, 4.0]];
        let gene_ids = vec!["a".to_string(), "b".to_string()];
        let diss = Array2::from_shape_vec((2, 2), vec![0.0, 0.9, 0.9, 0.0]).unwrap();
        let config = DetectorConfig::default(); // min size 30
        let (_, assignment) =
            detect_modules(expr.view(), &gene_ids, diss.view(), &config).unwrap();
        assert_eq!(assignment.n_unassigned(), 2);
        assert!(assignment.modules().is_empty());
    }

    /// Re-running detection on identical input is deterministic.
    #[test]
    fn detection_is_deterministic() {
        let mut state = 0x9E3779B97F4A7C15_u64;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        let expr = Array2::from_shape_fn((8, 12), |_| next());
        let gene_ids: Vec<String> = (0..12).map(|i| format!("g{}", i)).collect();
        let cor = crate::core::correlation::self_correlations(expr.view(), &gene_ids).unwrap();
        let adj =
            crate::core::adjacency::adjacency(cor.cor.view(), 2.0, crate::core::SignMode::Signed)
                .unwrap();
        let tom = crate::core::tom::tom_similarity(adj.view(), 64).unwrap();
        let diss = crate::core::tom::tom_dissimilarity(tom.view());

        let config = DetectorConfig {
            min_module_size: 3,
            ..Default::default()
        };
        let (_, a) = detect_modules(expr.view(), &gene_ids, diss.view(), &config).unwrap();
        let (_, b) = detect_modules(expr.view(), &gene_ids, diss.view(), &config).unwrap();
        assert_eq!(a.initial, b.initial);
        assert_eq!(a.merged, b.merged);
    }
}
