// analysis.rs - Module-trait, module-membership (kME) and gene
// significance (GS) statistics
//
// Pure transforms over already-validated matrices; all the statistical
// machinery lives in the correlation engine.

use crate::core::correlation::{column_correlations, CorStats};
use crate::core::eigengene::Eigengenes;
use crate::data::{ExpressionMatrix, TraitMatrix};
use crate::error::{CoexError, Result};

fn check_rows(stage: &'static str, left: usize, right: usize) -> Result<()> {
    if left != right {
        return Err(CoexError::ShapeMismatch {
            stage,
            detail: format!("{} samples vs {} samples", left, right),
        });
    }
    Ok(())
}

/// Module-trait relationship: correlation of each module eigengene with
/// each trait indicator column, with Student-t p-values.
pub fn module_trait_stats(eigengenes: &Eigengenes, traits: &TraitMatrix) -> Result<CorStats> {
    check_rows(
        "module-trait correlation",
        eigengenes.data.nrows(),
        traits.n_samples(),
    )?;
    column_correlations(
        eigengenes.data.view(),
        &eigengenes.labels(),
        traits.data.view(),
        &traits.trait_names,
    )
}

/// Module membership (kME): correlation of every gene's expression with
/// every module eigengene. Deliberately independent of the gene's own
/// module assignment; a gene can rank high for a module it was not
/// assigned to, and that is exposed as-is.
pub fn module_membership(expr: &ExpressionMatrix, eigengenes: &Eigengenes) -> Result<CorStats> {
    check_rows(
        "module membership",
        expr.n_samples(),
        eigengenes.data.nrows(),
    )?;
    column_correlations(
        expr.data.view(),
        &expr.gene_ids,
        eigengenes.data.view(),
        &eigengenes.labels(),
    )
}

/// Gene significance (GS): correlation of every gene with one named trait
/// column.
pub fn gene_significance(
    expr: &ExpressionMatrix,
    traits: &TraitMatrix,
    trait_name: &str,
) -> Result<CorStats> {
    check_rows("gene significance", expr.n_samples(), traits.n_samples())?;
    let idx = traits.trait_index(trait_name)?;
    let column = traits
        .data
        .column(idx)
        .to_owned()
        .insert_axis(ndarray::Axis(1));
    column_correlations(
        expr.data.view(),
        &expr.gene_ids,
        column.view(),
        std::slice::from_ref(&traits.trait_names[idx]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::correlation::pearson_pairwise;
    use crate::core::eigengene::module_eigengenes;
    use crate::core::modules::ModuleId;
    use ndarray::array;

    fn expr_fixture() -> ExpressionMatrix {
        ExpressionMatrix {
            sample_ids: (0..5).map(|i| format!("s{}", i)).collect(),
            gene_ids: (0..3).map(|i| format!("g{}", i)).collect(),
            data: array![
                [1.0, 1.2, 5.0],
                [2.0, 2.1, 3.0],
                [3.0, 2.9, 4.0],
                [4.0, 4.2, 1.0],
                [5.0, 5.1, 2.0]
            ],
        }
    }

    fn trait_fixture() -> TraitMatrix {
        TraitMatrix {
            sample_ids: (0..5).map(|i| format!("s{}", i)).collect(),
            trait_names: vec!["treated".to_string(), "flat".to_string()],
            data: array![
                [0.0, 1.0],
                [0.0, 1.0],
                [1.0, 1.0],
                [1.0, 1.0],
                [1.0, 1.0]
            ],
        }
    }

    #[test]
    fn kme_matches_direct_correlation_with_own_eigengene() {
        let expr = expr_fixture();
        let labels = vec![ModuleId(1), ModuleId(1), ModuleId(2)];
        let me =
            module_eigengenes(expr.data.view(), &expr.sample_ids, &labels, false).unwrap();
        let kme = module_membership(&expr, &me).unwrap();

        // g0 belongs to module 1 (column 0 of the eigengene matrix)
        let (direct, _) =
            pearson_pairwise(expr.data.column(0), me.data.column(0), "g0", "ME1").unwrap();
        assert!((kme.cor[[0, 0]] - direct).abs() < 1e-12);

        // kME is also reported for the module g0 was NOT assigned to
        assert_eq!(kme.cor.ncols(), 2);
    }

    #[test]
    fn gene_significance_for_binary_trait() {
        let expr = expr_fixture();
        let traits = trait_fixture();
        let gs = gene_significance(&expr, &traits, "treated").unwrap();
        assert_eq!(gs.cor.ncols(), 1);
        // g0 increases with the trait
        assert!(gs.cor[[0, 0]] > 0.5);
    }

    #[test]
    fn zero_variance_trait_is_a_typed_error_not_silent_zero() {
        let expr = expr_fixture();
        let traits = trait_fixture();
        let err = gene_significance(&expr, &traits, "flat").unwrap_err();
        assert!(matches!(err, CoexError::DegenerateInput { .. }));
        assert!(err.to_string().contains("flat"));
    }

    #[test]
    fn module_trait_shapes_and_labels() {
        let expr = expr_fixture();
        let traits = trait_fixture();
        let labels = vec![ModuleId(1), ModuleId(1), ModuleId(2)];
        let me =
            module_eigengenes(expr.data.view(), &expr.sample_ids, &labels, false).unwrap();
        // Drop the zero-variance trait for this check
        let traits = TraitMatrix {
            sample_ids: traits.sample_ids.clone(),
            trait_names: vec!["treated".to_string()],
            data: traits.data.slice(ndarray::s![.., 0..1]).to_owned(),
        };
        let stats = module_trait_stats(&me, &traits).unwrap();
        assert_eq!(stats.row_ids, vec!["MEturquoise", "MEblue"]);
        assert_eq!(stats.col_ids, vec!["treated"]);
        assert!(stats.cor.iter().all(|r| r.abs() <= 1.0));
    }

    #[test]
    fn row_count_mismatch_is_caught() {
        let expr = expr_fixture();
        let mut traits = trait_fixture();
        traits.data = traits.data.slice(ndarray::s![0..4, ..]).to_owned();
        traits.sample_ids.pop();
        let err = gene_significance(&expr, &traits, "treated").unwrap_err();
        assert!(matches!(err, CoexError::ShapeMismatch { .. }));
    }
}
