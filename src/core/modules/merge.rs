// merge.rs - Eigengene-similarity module merging

use ndarray::ArrayView2;

use super::ModuleId;
use crate::core::correlation::pearson_pairwise;
use crate::core::eigengene::module_eigengenes;
use crate::error::Result;

/// Iteratively merge modules whose eigengenes are closer than
/// `merge_cut_height` in correlation dissimilarity (1 - cor). The merged
/// module adopts the label of the larger constituent (ties: the lower id);
/// eigengenes are recomputed after every merge; unassigned genes are never
/// touched. Returns the final labels and the number of merges performed.
pub fn merge_close_modules(
    expr: ArrayView2<f64>,
    labels: &[ModuleId],
    merge_cut_height: f64,
) -> Result<(Vec<ModuleId>, usize)> {
    let mut labels = labels.to_vec();
    let mut n_merges = 0usize;
    let sample_ids: Vec<String> = (0..expr.nrows()).map(|i| i.to_string()).collect();

    loop {
        let eigengenes = {
            let distinct = distinct_modules(&labels);
            if distinct.len() < 2 {
                break;
            }
            module_eigengenes(expr, &sample_ids, &labels, false)?
        };

        // Most-correlated eigengene pair (ties: lowest module id pair)
        let mut best_cor = f64::NEG_INFINITY;
        let mut best_pair = (0usize, 0usize);
        let m = eigengenes.n_modules();
        for i in 0..m {
            for j in (i + 1)..m {
                let (r, _) = pearson_pairwise(
                    eigengenes.data.column(i),
                    eigengenes.data.column(j),
                    &eigengenes.modules[i].color(),
                    &eigengenes.modules[j].color(),
                )?;
                if r > best_cor {
                    best_cor = r;
                    best_pair = (i, j);
                }
            }
        }

        if 1.0 - best_cor > merge_cut_height {
            break;
        }

        let a = eigengenes.modules[best_pair.0];
        let b = eigengenes.modules[best_pair.1];
        let size_a = labels.iter().filter(|&&l| l == a).count();
        let size_b = labels.iter().filter(|&&l| l == b).count();
        let (keep, absorb) = if size_b > size_a { (b, a) } else { (a, b) };

        for label in labels.iter_mut() {
            if *label == absorb {
                *label = keep;
            }
        }
        n_merges += 1;
    }

    Ok((labels, n_merges))
}

fn distinct_modules(labels: &[ModuleId]) -> Vec<ModuleId> {
    let mut ids: Vec<ModuleId> = labels
        .iter()
        .copied()
        .filter(|m| !m.is_unassigned())
        .collect();
    ids.sort();
    ids.dedup();
    ids
}
