// adjacency.rs - Correlation to adjacency transformation

use std::str::FromStr;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{CoexError, Result};

/// Network sign convention.
///
/// Signed is the primary mode: anti-correlated genes get adjacency near 0
/// instead of being folded onto their positive counterparts, which matters
/// for the downstream biological reading of modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignMode {
    Signed,
    Unsigned,
    SignedHybrid,
}

impl FromStr for SignMode {
    type Err = CoexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "signed" => Ok(SignMode::Signed),
            "unsigned" => Ok(SignMode::Unsigned),
            "signed-hybrid" | "signed_hybrid" | "hybrid" => Ok(SignMode::SignedHybrid),
            _ => Err(CoexError::Config(format!(
                "invalid sign mode: {}. Use: signed, unsigned, signed-hybrid",
                s
            ))),
        }
    }
}

impl SignMode {
    pub fn description(&self) -> &str {
        match self {
            SignMode::Signed => "signed (((1+r)/2)^p)",
            SignMode::Unsigned => "unsigned (|r|^p)",
            SignMode::SignedHybrid => "signed hybrid (r^p for r>0, else 0)",
        }
    }

    fn transform(&self, r: f64, power: f64) -> f64 {
        match self {
            SignMode::Signed => ((1.0 + r) / 2.0).powf(power),
            SignMode::Unsigned => r.abs().powf(power),
            SignMode::SignedHybrid => {
                if r > 0.0 {
                    r.powf(power)
                } else {
                    0.0
                }
            }
        }
    }
}

/// Build the adjacency matrix from a gene-gene correlation matrix with the
/// chosen soft-threshold power. The diagonal is forced to 0 (no self-loops).
pub fn adjacency(cor: ArrayView2<f64>, power: f64, mode: SignMode) -> Result<Array2<f64>> {
    if cor.nrows() != cor.ncols() {
        return Err(CoexError::ShapeMismatch {
            stage: "adjacency",
            detail: format!("correlation matrix is {} x {}", cor.nrows(), cor.ncols()),
        });
    }
    if power <= 0.0 {
        return Err(CoexError::Config(format!(
            "soft-threshold power must be positive (got {})",
            power
        )));
    }

    let mut adj = Array2::zeros(cor.raw_dim());
    for ((i, j), &r) in cor.indexed_iter() {
        if !r.is_finite() || r < -1.0 - 1e-12 || r > 1.0 + 1e-12 {
            return Err(CoexError::DegenerateInput {
                stage: "adjacency",
                detail: format!("correlation[{}][{}] = {} outside [-1, 1]", i, j, r),
            });
        }
        adj[[i, j]] = if i == j {
            0.0
        } else {
            self::SignMode::transform(&mode, r.clamp(-1.0, 1.0), power)
        };
    }
    Ok(adj)
}

/// Node connectivity: row sums of the adjacency matrix.
pub fn connectivity(adj: ArrayView2<f64>) -> Vec<f64> {
    adj.rows().into_iter().map(|row| row.sum()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn signed_mode_maps_anticorrelation_to_zero() {
        let cor = array![[1.0, -1.0], [-1.0, 1.0]];
        let adj = adjacency(cor.view(), 6.0, SignMode::Signed).unwrap();
        assert_eq!(adj[[0, 1]], 0.0);
        assert_eq!(adj[[0, 0]], 0.0); // no self-loops
    }

    #[test]
    fn unsigned_mode_folds_sign() {
        let cor = array![[1.0, -0.5], [-0.5, 1.0]];
        let adj = adjacency(cor.view(), 2.0, SignMode::Unsigned).unwrap();
        assert!((adj[[0, 1]] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn hybrid_mode_zeroes_negative_correlations() {
        let cor = array![[1.0, 0.5, -0.5], [0.5, 1.0, 0.0], [-0.5, 0.0, 1.0]];
        let adj = adjacency(cor.view(), 1.0, SignMode::SignedHybrid).unwrap();
        assert_eq!(adj[[0, 1]], 0.5);
        assert_eq!(adj[[0, 2]], 0.0);
    }

    #[test]
    fn entries_stay_in_unit_interval() {
        let cor = array![[1.0, 0.3, -0.8], [0.3, 1.0, 0.1], [-0.8, 0.1, 1.0]];
        for mode in [SignMode::Signed, SignMode::Unsigned, SignMode::SignedHybrid] {
            let adj = adjacency(cor.view(), 6.0, mode).unwrap();
            for &v in adj.iter() {
                assert!((0.0..=1.0).contains(&v));
            }
            for i in 0..3 {
                assert_eq!(adj[[i, i]], 0.0);
            }
        }
    }

    #[test]
    fn nan_correlation_is_rejected() {
        let cor = array![[1.0, f64::NAN], [f64::NAN, 1.0]];
        let err = adjacency(cor.view(), 6.0, SignMode::Signed).unwrap_err();
        assert!(matches!(err, CoexError::DegenerateInput { .. }));
    }

    #[test]
    fn sign_mode_parsing() {
        assert_eq!(SignMode::from_str("signed").unwrap(), SignMode::Signed);
        assert_eq!(
            SignMode::from_str("signed-hybrid").unwrap(),
            SignMode::SignedHybrid
        );
        assert!(SignMode::from_str("bogus").is_err());
    }
}
