// eigengene.rs - Module eigengene computation
//
// The eigengene is the first principal component of the column-standardized
// expression submatrix of a module's genes, computed by power iteration on
// the samples x samples Gram matrix (samples are few; genes may be many).
// The sign is oriented so the eigengene correlates positively with the mean
// module expression, preventing arbitrary PCA sign flips.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::core::modules::ModuleId;
use crate::error::{CoexError, Result};

const POWER_ITER_MAX: usize = 500;
const POWER_ITER_TOL: f64 = 1e-10;

/// Per-module summary expression profiles, samples x modules.
#[derive(Debug, Clone)]
pub struct Eigengenes {
    pub sample_ids: Vec<String>,
    pub modules: Vec<ModuleId>,
    pub data: Array2<f64>,
}

impl Eigengenes {
    /// Column labels in the conventional `ME<color>` form.
    pub fn labels(&self) -> Vec<String> {
        self.modules
            .iter()
            .map(|m| format!("ME{}", m.color()))
            .collect()
    }

    pub fn column_for(&self, module: ModuleId) -> Option<usize> {
        self.modules.iter().position(|&m| m == module)
    }

    pub fn n_modules(&self) -> usize {
        self.modules.len()
    }
}

/// Standardize columns to zero mean, unit (sample) standard deviation.
fn standardize_columns(m: &mut Array2<f64>) -> Result<()> {
    let n = m.nrows() as f64;
    for mut col in m.columns_mut() {
        let mean = col.sum() / n;
        col.mapv_inplace(|v| v - mean);
        let sd = (col.dot(&col) / (n - 1.0)).sqrt();
        if sd == 0.0 || !sd.is_finite() {
            return Err(CoexError::DegenerateInput {
                stage: "eigengene",
                detail: "zero-variance gene in module submatrix".to_string(),
            });
        }
        col.mapv_inplace(|v| v / sd);
    }
    Ok(())
}

/// First principal component (unit-norm sample scores) of the expression
/// submatrix restricted to `genes`. Single-gene modules fall out of the
/// same computation as that gene's standardized profile.
pub fn module_eigengene(expr: ArrayView2<f64>, genes: &[usize]) -> Result<Array1<f64>> {
    if genes.is_empty() {
        return Err(CoexError::DegenerateInput {
            stage: "eigengene",
            detail: "empty module".to_string(),
        });
    }
    let n_samples = expr.nrows();

    let mut sub = Array2::zeros((n_samples, genes.len()));
    for (c, &g) in genes.iter().enumerate() {
        sub.column_mut(c).assign(&expr.column(g));
    }
    if sub.iter().any(|v| !v.is_finite()) {
        return Err(CoexError::DegenerateInput {
            stage: "eigengene",
            detail: "non-finite expression value in module submatrix".to_string(),
        });
    }
    standardize_columns(&mut sub)?;

    // Gram matrix over samples; its top eigenvector is the PC1 score vector
    let gram = sub.dot(&sub.t());

    // Deterministic non-degenerate start vector
    let mut v: Array1<f64> = Array1::from_iter((0..n_samples).map(|i| 1.0 + i as f64 * 1e-3));
    let norm = v.dot(&v).sqrt();
    v.mapv_inplace(|x| x / norm);

    for _ in 0..POWER_ITER_MAX {
        let w = gram.dot(&v);
        let lambda = w.dot(&w).sqrt();
        if lambda <= f64::EPSILON || !lambda.is_finite() {
            return Err(CoexError::DegenerateInput {
                stage: "eigengene",
                detail: "power iteration collapsed (zero leading eigenvalue)".to_string(),
            });
        }
        let next = w.mapv(|x| x / lambda);
        let delta: f64 = next
            .iter()
            .zip(v.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        v = next;
        if delta < POWER_ITER_TOL {
            break;
        }
    }

    // Orient against the mean standardized expression of the module
    let mean_profile = sub.mean_axis(Axis(1)).unwrap();
    if v.dot(&mean_profile) < 0.0 {
        v.mapv_inplace(|x| -x);
    }
    Ok(v)
}

/// Eigengenes for every assigned module (ascending id order), optionally
/// including the unassigned pool as a pseudo-module.
pub fn module_eigengenes(
    expr: ArrayView2<f64>,
    sample_ids: &[String],
    labels: &[ModuleId],
    include_unassigned: bool,
) -> Result<Eigengenes> {
    if labels.len() != expr.ncols() {
        return Err(CoexError::ShapeMismatch {
            stage: "eigengene",
            detail: format!(
                "{} labels for {} expression columns",
                labels.len(),
                expr.ncols()
            ),
        });
    }

    let mut modules: Vec<ModuleId> = labels
        .iter()
        .copied()
        .filter(|m| include_unassigned || !m.is_unassigned())
        .collect();
    modules.sort();
    modules.dedup();

    let mut data = Array2::zeros((expr.nrows(), modules.len()));
    for (c, &module) in modules.iter().enumerate() {
        let genes: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &m)| m == module)
            .map(|(i, _)| i)
            .collect();
        let eigengene = module_eigengene(expr, &genes)?;
        data.column_mut(c).assign(&eigengene);
    }

    Ok(Eigengenes {
        sample_ids: sample_ids.to_vec(),
        modules,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::correlation::pearson_pairwise;
    use ndarray::array;

    fn sample_ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("s{}", i)).collect()
    }

    #[test]
    fn single_gene_module_is_standardized_profile() {
        let expr = array![[1.0, 9.0], [2.0, 9.5], [3.0, 8.0], [4.0, 7.0]];
        let me = module_eigengene(expr.view(), &[0]).unwrap();
        // Unit norm, monotone increasing like the gene itself
        assert!((me.dot(&me) - 1.0).abs() < 1e-10);
        assert!(me[0] < me[1] && me[1] < me[2] && me[2] < me[3]);
    }

    #[test]
    fn eigengene_tracks_perfectly_correlated_pair() {
        let expr = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0]];
        let me = module_eigengene(expr.view(), &[0, 1]).unwrap();
        let (r, _) = pearson_pairwise(me.view(), expr.column(0), "me", "g0").unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn orientation_is_positive_against_mean_expression() {
        let expr = array![
            [1.0, 1.1, 0.9],
            [2.0, 2.2, 1.9],
            [3.0, 2.9, 3.1],
            [4.0, 4.1, 3.8]
        ];
        let me = module_eigengene(expr.view(), &[0, 1, 2]).unwrap();
        let mean: Array1<f64> = expr.mean_axis(Axis(1)).unwrap();
        let (r, _) = pearson_pairwise(me.view(), mean.view(), "me", "mean").unwrap();
        assert!(r > 0.0);
    }

    #[test]
    fn eigengenes_exclude_unassigned_by_default() {
        let expr = array![[1.0, 2.0, 7.0], [2.0, 4.0, 3.0], [3.0, 6.0, 5.0]];
        let labels = vec![ModuleId(1), ModuleId(1), ModuleId::UNASSIGNED];
        let me = module_eigengenes(expr.view(), &sample_ids(3), &labels, false).unwrap();
        assert_eq!(me.modules, vec![ModuleId(1)]);
        assert_eq!(me.labels(), vec!["MEturquoise"]);

        let with_grey = module_eigengenes(expr.view(), &sample_ids(3), &labels, true).unwrap();
        assert_eq!(with_grey.n_modules(), 2);
    }

    #[test]
    fn empty_module_is_degenerate() {
        let expr = array![[1.0], [2.0], [3.0]];
        assert!(matches!(
            module_eigengene(expr.view(), &[]).unwrap_err(),
            CoexError::DegenerateInput { .. }
        ));
    }
}
