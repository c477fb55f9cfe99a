// pipeline.rs - Stage orchestration for a full network analysis
//
// Correlation -> (power scan) -> adjacency -> TOM -> module detection ->
// eigengenes -> module-trait / kME / GS -> hub selection. Each stage is
// timed and reported; the first fatal error aborts the run.

use std::time::Instant;

use crate::core::adjacency::{adjacency, SignMode};
use crate::core::analysis::{gene_significance, module_membership, module_trait_stats};
use crate::core::correlation::{self_correlations, CorStats};
use crate::core::eigengene::{module_eigengenes, Eigengenes};
use crate::core::hubs::{select_hubs, HubConfig, ModuleGeneSet};
use crate::core::modules::{detect_modules, Dendrogram, DetectorConfig, ModuleAssignment, ModuleId};
use crate::core::soft_threshold::{default_powers, scan_powers, PowerScan};
use crate::core::tom::{tom_dissimilarity, tom_similarity, DEFAULT_BLOCK_SIZE};
use crate::data::{ExpressionMatrix, TraitMatrix};
use crate::error::{CoexError, ConfigurationWarning, Result};

/// Complete analysis configuration. Field defaults mirror the conventional
/// parameter values; everything is overridable from the CLI or config file.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Explicit soft-threshold power. When unset, a power scan runs and the
    /// first candidate reaching `target_fit_r2` is used.
    pub power: Option<f64>,
    /// Candidate powers for the scan; empty means the default ladder.
    pub powers: Vec<f64>,
    pub target_fit_r2: f64,
    pub sign_mode: SignMode,
    pub block_size: usize,
    pub detector: DetectorConfig,
    pub hub: HubConfig,
    /// Trait column for gene significance; defaults to the first column.
    pub trait_column: Option<String>,
    /// Explicit modules of interest for hub extraction. Empty means
    /// automatic selection by module-trait significance.
    pub hub_modules: Vec<String>,
    /// p-value cutoff for automatic module-of-interest selection.
    pub module_pvalue: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            power: None,
            powers: Vec::new(),
            target_fit_r2: 0.8,
            sign_mode: SignMode::Signed,
            block_size: DEFAULT_BLOCK_SIZE,
            detector: DetectorConfig::default(),
            hub: HubConfig::default(),
            trait_column: None,
            hub_modules: Vec::new(),
            module_pvalue: 0.05,
        }
    }
}

/// Everything a run produces, ready for the output writers.
#[derive(Debug)]
pub struct AnalysisResult {
    pub power_scan: Option<PowerScan>,
    pub power: f64,
    pub dendrogram: Dendrogram,
    pub assignment: ModuleAssignment,
    pub eigengenes: Eigengenes,
    pub module_trait: Option<CorStats>,
    pub kme: CorStats,
    pub gene_significance: Option<CorStats>,
    /// Trait column the GS table was computed against.
    pub trait_column: Option<String>,
    pub hub_sets: Vec<ModuleGeneSet>,
    pub warnings: Vec<ConfigurationWarning>,
}

/// Run the full pipeline. `traits` is optional: without it, module-trait
/// statistics and gene significance are skipped and hub extraction covers
/// every detected module (or the explicitly requested ones).
pub fn run_analysis(
    expr: &ExpressionMatrix,
    traits: Option<&TraitMatrix>,
    config: &NetworkConfig,
) -> Result<AnalysisResult> {
    expr.validate()?;
    if let Some(t) = traits {
        if t.sample_ids != expr.sample_ids {
            return Err(CoexError::ShapeMismatch {
                stage: "trait alignment",
                detail: "trait samples are not aligned with expression samples".to_string(),
            });
        }
    }
    let mut warnings = Vec::new();

    println!(
        "🔄 Computing gene-gene correlations ({} genes, {} samples)...",
        expr.n_genes(),
        expr.n_samples()
    );
    let start = Instant::now();
    let cor = self_correlations(expr.data.view(), &expr.gene_ids)?;
    println!("✅ Correlations computed in {:.2}s", start.elapsed().as_secs_f64());

    let (power, power_scan) = match config.power {
        Some(p) => {
            if !(p > 0.0) {
                return Err(CoexError::Config(format!(
                    "soft-threshold power must be positive, got {}",
                    p
                )));
            }
            (p, None)
        }
        None => {
            let candidates = if config.powers.is_empty() {
                default_powers()
            } else {
                config.powers.clone()
            };
            let start = Instant::now();
            let scan = scan_powers(cor.cor.view(), &candidates, config.sign_mode)?;
            scan.print_table();
            println!("✅ Power scan finished in {:.2}s", start.elapsed().as_secs_f64());
            match scan.pick_power(config.target_fit_r2) {
                Some(p) => {
                    println!(
                        "✅ Selected power {} (first candidate with fit R² >= {})",
                        p, config.target_fit_r2
                    );
                    (p, Some(scan))
                }
                None => {
                    let warning = ConfigurationWarning::new(format!(
                        "no candidate power reached the target scale-free fit R² of {}; \
                         rerun with an explicit --power to proceed",
                        config.target_fit_r2
                    ));
                    println!("⚠️  {}", warning);
                    return Err(CoexError::Config(warning.message));
                }
            }
        }
    };

    println!(
        "🔄 Building {} adjacency at power {}...",
        config.sign_mode.description(),
        power
    );
    let adj = adjacency(cor.cor.view(), power, config.sign_mode)?;

    println!(
        "🔄 Computing topological overlap (block size {})...",
        config.block_size
    );
    let start = Instant::now();
    let tom = tom_similarity(adj.view(), config.block_size)?;
    let diss = tom_dissimilarity(tom.view());
    println!("✅ TOM computed in {:.2}s", start.elapsed().as_secs_f64());

    println!("🔄 Clustering genes and detecting modules...");
    let (dendrogram, assignment) =
        detect_modules(expr.data.view(), &expr.gene_ids, diss.view(), &config.detector)?;
    println!(
        "✅ Detected {} modules ({} of {} genes unassigned)",
        assignment.modules().len(),
        assignment.n_unassigned(),
        expr.n_genes()
    );

    println!("🔄 Computing module eigengenes and membership statistics...");
    let eigengenes =
        module_eigengenes(expr.data.view(), &expr.sample_ids, &assignment.merged, false)?;
    let kme = module_membership(expr, &eigengenes)?;

    let (module_trait, gs, trait_column) = match traits {
        Some(t) => {
            let mt = module_trait_stats(&eigengenes, t)?;
            let column = config
                .trait_column
                .clone()
                .unwrap_or_else(|| t.trait_names[0].clone());
            let gs = gene_significance(expr, t, &column)?;
            (Some(mt), Some(gs), Some(column))
        }
        None => (None, None, None),
    };

    let interest = modules_of_interest(
        &assignment,
        &eigengenes,
        module_trait.as_ref(),
        config,
        &mut warnings,
    )?;
    if config.hub_modules.is_empty() && module_trait.is_some() && !interest.is_empty() {
        println!(
            "🔍 Modules of interest (trait p < {}): {}",
            config.module_pvalue,
            interest
                .iter()
                .map(|m| m.color())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    println!(
        "🔍 Extracting hub genes for {} module(s)...",
        interest.len()
    );
    let hub_sets = select_hubs(&assignment, &kme, gs.as_ref(), &interest, &config.hub)?;

    Ok(AnalysisResult {
        power_scan,
        power,
        dendrogram,
        assignment,
        eigengenes,
        module_trait,
        kme,
        gene_significance: gs,
        trait_column,
        hub_sets,
        warnings,
    })
}

/// Modules selected for hub extraction: explicit labels when given,
/// otherwise modules with a trait association below the p-value cutoff,
/// otherwise every detected module.
fn modules_of_interest(
    assignment: &ModuleAssignment,
    eigengenes: &Eigengenes,
    module_trait: Option<&CorStats>,
    config: &NetworkConfig,
    warnings: &mut Vec<ConfigurationWarning>,
) -> Result<Vec<ModuleId>> {
    if !config.hub_modules.is_empty() {
        return config
            .hub_modules
            .iter()
            .map(|label| assignment.resolve_label(label))
            .collect();
    }

    let selected = match module_trait {
        Some(stats) => {
            let mut picked = Vec::new();
            for (row, &module) in eigengenes.modules.iter().enumerate() {
                let min_p = stats
                    .pvalue
                    .row(row)
                    .iter()
                    .cloned()
                    .fold(f64::INFINITY, f64::min);
                if min_p < config.module_pvalue {
                    picked.push(module);
                }
            }
            if picked.is_empty() && !eigengenes.modules.is_empty() {
                warnings.push(ConfigurationWarning::new(format!(
                    "no module-trait association below p = {}; no hub genes extracted",
                    config.module_pvalue
                )));
            }
            picked
        }
        None => assignment.modules(),
    };

    if selected.is_empty() && assignment.modules().is_empty() {
        warnings.push(ConfigurationWarning::new(
            "no modules detected; consider lowering --min-module-size",
        ));
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Two perfectly correlated gene pairs, uncorrelated with each other,
    /// plus a trait tracking the first pair.
    fn fixture() -> (ExpressionMatrix, TraitMatrix) {
        let expr = ExpressionMatrix {
            sample_ids: vec!["s1".into(), "s2".into(), "s3".into()],
            gene_ids: (1..=4).map(|i| format!("g{}", i)).collect(),
            data: array![
                [1.0, 2.0, 5.0, 10.0],
                [2.0, 4.0, 1.0, 2.0],
                [3.0, 6.0, 3.0, 6.0]
            ],
        };
        let traits = TraitMatrix {
            sample_ids: expr.sample_ids.clone(),
            trait_names: vec!["dose".to_string()],
            data: array![[1.0], [2.0], [3.0]],
        };
        (expr, traits)
    }

    fn small_config() -> NetworkConfig {
        NetworkConfig {
            power: Some(2.0),
            detector: DetectorConfig {
                min_module_size: 2,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn end_to_end_with_explicit_power_and_trait() {
        let (expr, traits) = fixture();
        let result = run_analysis(&expr, Some(&traits), &small_config()).unwrap();

        assert_eq!(result.power, 2.0);
        assert!(result.power_scan.is_none());
        assert_eq!(result.assignment.modules().len(), 2);
        assert_eq!(result.eigengenes.n_modules(), 2);
        assert_eq!(result.kme.col_ids.len(), 2);
        assert_eq!(result.trait_column.as_deref(), Some("dose"));

        // The dose trait is the g1/g2 profile itself: that module is
        // significant, the other is not
        assert_eq!(result.hub_sets.len(), 1);
        let set = &result.hub_sets[0];
        assert_eq!(set.members.len(), 2);
        assert_eq!(set.hubs.len(), 2);
        let ids: Vec<&str> = set.hubs.iter().map(|h| h.gene_id.as_str()).collect();
        assert!(ids.contains(&"g1") && ids.contains(&"g2"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn runs_without_traits_and_extracts_all_modules() {
        let (expr, _) = fixture();
        let result = run_analysis(&expr, None, &small_config()).unwrap();
        assert!(result.module_trait.is_none());
        assert!(result.gene_significance.is_none());
        assert_eq!(result.hub_sets.len(), 2);
        for set in &result.hub_sets {
            assert!(set.members.iter().all(|m| m.gs.is_nan()));
        }
    }

    #[test]
    fn explicit_hub_module_label_overrides_auto_selection() {
        let (expr, traits) = fixture();
        let mut config = small_config();
        config.hub_modules = vec!["blue".to_string()];
        let result = run_analysis(&expr, Some(&traits), &config).unwrap();
        assert_eq!(result.hub_sets.len(), 1);
        assert_eq!(result.hub_sets[0].module, ModuleId(2));

        config.hub_modules = vec!["chartreuse".to_string()];
        assert!(matches!(
            run_analysis(&expr, Some(&traits), &config).unwrap_err(),
            CoexError::UnknownModule(_)
        ));
    }

    #[test]
    fn unaligned_traits_are_rejected() {
        let (expr, mut traits) = fixture();
        traits.sample_ids.swap(0, 1);
        let err = run_analysis(&expr, Some(&traits), &small_config()).unwrap_err();
        assert!(matches!(err, CoexError::ShapeMismatch { .. }));
    }

    #[test]
    fn nonpositive_power_is_a_config_error() {
        let (expr, _) = fixture();
        let mut config = small_config();
        config.power = Some(0.0);
        assert!(matches!(
            run_analysis(&expr, None, &config).unwrap_err(),
            CoexError::Config(_)
        ));
    }

    #[test]
    fn failed_power_scan_aborts_instead_of_defaulting() {
        let (expr, _) = fixture();
        let mut config = small_config();
        config.power = None;
        config.powers = vec![1.0];
        config.target_fit_r2 = 0.999; // unreachable for 4 genes
        assert!(matches!(
            run_analysis(&expr, None, &config).unwrap_err(),
            CoexError::Config(_)
        ));
    }
}
