// hubs.rs - Hub gene selection within modules of interest

use serde::Serialize;

use crate::core::correlation::CorStats;
use crate::core::modules::{ModuleAssignment, ModuleId};
use crate::error::{CoexError, Result};

/// Hub selection thresholds. Defaults follow the conventional
/// |kME| > 0.7 with p < 0.05 cut.
#[derive(Debug, Clone, Serialize)]
pub struct HubConfig {
    pub kme_threshold: f64,
    pub kme_pvalue: f64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            kme_threshold: 0.7,
            kme_pvalue: 0.05,
        }
    }
}

/// One gene's membership record inside its module: kME against the module's
/// own eigengene plus gene significance for the selected trait (NaN when no
/// trait column was analysed).
#[derive(Debug, Clone, Serialize)]
pub struct HubGene {
    pub gene_id: String,
    pub module: ModuleId,
    pub kme: f64,
    pub kme_pvalue: f64,
    pub gs: f64,
    pub gs_pvalue: f64,
}

/// Per-module gene listing: every member gene ordered by |kME| descending,
/// and the subset passing the hub thresholds in the same order.
#[derive(Debug, Clone)]
pub struct ModuleGeneSet {
    pub module: ModuleId,
    pub members: Vec<HubGene>,
    pub hubs: Vec<HubGene>,
}

/// Extract member and hub gene tables for `modules`. `kme` must carry one
/// column per module eigengene (labelled `ME<color>`); `gs` is the
/// single-column gene significance table, if a trait was analysed. A module
/// with no qualifying hubs yields an empty `hubs` list, never an error.
pub fn select_hubs(
    assignment: &ModuleAssignment,
    kme: &CorStats,
    gs: Option<&CorStats>,
    modules: &[ModuleId],
    config: &HubConfig,
) -> Result<Vec<ModuleGeneSet>> {
    let mut sets = Vec::with_capacity(modules.len());
    for &module in modules {
        let gene_idx = assignment.genes_in(module);
        if gene_idx.is_empty() {
            return Err(CoexError::UnknownModule(module.color()));
        }
        let me_label = format!("ME{}", module.color());
        let col = kme
            .col_index(&me_label)
            .ok_or_else(|| CoexError::UnknownModule(me_label.clone()))?;

        let mut members: Vec<HubGene> = gene_idx
            .into_iter()
            .map(|g| {
                let (gs_val, gs_p) = match gs {
                    Some(stats) => (stats.cor[[g, 0]], stats.pvalue[[g, 0]]),
                    None => (f64::NAN, f64::NAN),
                };
                HubGene {
                    gene_id: assignment.gene_ids[g].clone(),
                    module,
                    kme: kme.cor[[g, col]],
                    kme_pvalue: kme.pvalue[[g, col]],
                    gs: gs_val,
                    gs_pvalue: gs_p,
                }
            })
            .collect();
        // |kME| descending, gene id as the deterministic tie-break
        members.sort_by(|a, b| {
            b.kme
                .abs()
                .partial_cmp(&a.kme.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.gene_id.cmp(&b.gene_id))
        });

        let hubs: Vec<HubGene> = members
            .iter()
            .filter(|g| g.kme.abs() > config.kme_threshold && g.kme_pvalue < config.kme_pvalue)
            .cloned()
            .collect();

        sets.push(ModuleGeneSet {
            module,
            members,
            hubs,
        });
    }
    Ok(sets)
}
