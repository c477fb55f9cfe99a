// correlation.rs - Pairwise Pearson correlation with Student-t p-values

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::{CoexError, Result};
use crate::stats::cor_pvalue;

/// Correlation / p-value matrix pair with row and column identifiers.
/// Used for gene-gene, gene-eigengene (kME), eigengene-trait and
/// gene-trait (GS) statistics alike.
#[derive(Debug, Clone)]
pub struct CorStats {
    pub row_ids: Vec<String>,
    pub col_ids: Vec<String>,
    pub cor: Array2<f64>,
    pub pvalue: Array2<f64>,
}

impl CorStats {
    pub fn row_index(&self, id: &str) -> Option<usize> {
        self.row_ids.iter().position(|r| r == id)
    }

    pub fn col_index(&self, id: &str) -> Option<usize> {
        self.col_ids.iter().position(|c| c == id)
    }
}

/// Pearson correlation of one column pair over pairwise-complete
/// observations. Returns (r, n_complete).
pub fn pearson_pairwise(
    x: ArrayView1<f64>,
    y: ArrayView1<f64>,
    x_id: &str,
    y_id: &str,
) -> Result<(f64, usize)> {
    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut n = 0usize;
    for (&a, &b) in x.iter().zip(y.iter()) {
        if a.is_finite() && b.is_finite() {
            sx += a;
            sy += b;
            n += 1;
        }
    }
    if n <= 2 {
        return Err(CoexError::InsufficientSamples {
            a: x_id.to_string(),
            b: y_id.to_string(),
            n,
        });
    }
    let mx = sx / n as f64;
    let my = sy / n as f64;

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (&a, &b) in x.iter().zip(y.iter()) {
        if a.is_finite() && b.is_finite() {
            let dx = a - mx;
            let dy = b - my;
            cov += dx * dy;
            vx += dx * dx;
            vy += dy * dy;
        }
    }
    let denom = (vx * vy).sqrt();
    if denom == 0.0 {
        return Err(CoexError::DegenerateInput {
            stage: "correlation",
            detail: format!(
                "zero variance over complete observations for '{}' vs '{}'",
                x_id, y_id
            ),
        });
    }
    Ok(((cov / denom).clamp(-1.0, 1.0), n))
}

/// Column-standardize to unit Euclidean norm around the mean, so that
/// Z_x^T . Z_y is directly the Pearson correlation matrix.
fn standardize(m: ArrayView2<f64>, ids: &[String]) -> Result<Array2<f64>> {
    let n = m.nrows();
    let mut z = m.to_owned();
    for (j, mut col) in z.columns_mut().into_iter().enumerate() {
        let mean = col.sum() / n as f64;
        col.mapv_inplace(|v| v - mean);
        let norm = col.dot(&col).sqrt();
        if norm == 0.0 {
            return Err(CoexError::DegenerateInput {
                stage: "correlation",
                detail: format!("column '{}' has zero variance", ids[j]),
            });
        }
        col.mapv_inplace(|v| v / norm);
    }
    Ok(z)
}

/// Pairwise Pearson correlation between the columns of `x` and the columns
/// of `y` (equal row counts), with two-sided Student-t p-values.
///
/// All-finite inputs take the fast matrix-product path; any non-finite
/// value switches to pairwise-complete computation per column pair.
pub fn column_correlations(
    x: ArrayView2<f64>,
    x_ids: &[String],
    y: ArrayView2<f64>,
    y_ids: &[String],
) -> Result<CorStats> {
    if x.nrows() != y.nrows() {
        return Err(CoexError::ShapeMismatch {
            stage: "correlation",
            detail: format!("{} rows vs {} rows", x.nrows(), y.nrows()),
        });
    }
    let n = x.nrows();
    if n <= 2 {
        return Err(CoexError::InsufficientSamples {
            a: x_ids.first().cloned().unwrap_or_default(),
            b: y_ids.first().cloned().unwrap_or_default(),
            n,
        });
    }

    let all_finite =
        x.iter().all(|v| v.is_finite()) && y.iter().all(|v| v.is_finite());

    if all_finite {
        let zx = standardize(x, x_ids)?;
        let zy = standardize(y, y_ids)?;
        let mut cor = zx.t().dot(&zy);
        cor.mapv_inplace(|v| v.clamp(-1.0, 1.0));

        let pvalue_rows: Vec<Vec<f64>> = cor
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|row| row.iter().map(|&r| cor_pvalue(r, n)).collect())
            .collect();
        let mut pvalue = Array2::zeros(cor.raw_dim());
        for (i, row) in pvalue_rows.into_iter().enumerate() {
            for (j, p) in row.into_iter().enumerate() {
                pvalue[[i, j]] = p;
            }
        }

        return Ok(CorStats {
            row_ids: x_ids.to_vec(),
            col_ids: y_ids.to_vec(),
            cor,
            pvalue,
        });
    }

    // Pairwise-complete path
    let results: Vec<Result<Vec<(f64, f64)>>> = (0..x.ncols())
        .into_par_iter()
        .map(|i| {
            let xi = x.column(i);
            (0..y.ncols())
                .map(|j| {
                    let (r, n_pair) = pearson_pairwise(xi, y.column(j), &x_ids[i], &y_ids[j])?;
                    Ok((r, cor_pvalue(r, n_pair)))
                })
                .collect()
        })
        .collect();

    let mut cor = Array2::zeros((x.ncols(), y.ncols()));
    let mut pvalue = Array2::zeros((x.ncols(), y.ncols()));
    for (i, row) in results.into_iter().enumerate() {
        for (j, (r, p)) in row?.into_iter().enumerate() {
            cor[[i, j]] = r;
            pvalue[[i, j]] = p;
        }
    }

    Ok(CorStats {
        row_ids: x_ids.to_vec(),
        col_ids: y_ids.to_vec(),
        cor,
        pvalue,
    })
}

/// Gene-gene correlation matrix: symmetric with an exact unit diagonal.
pub fn self_correlations(x: ArrayView2<f64>, ids: &[String]) -> Result<CorStats> {
    let mut stats = column_correlations(x, ids, x, ids)?;
    let n = stats.cor.nrows();
    for i in 0..n {
        stats.cor[[i, i]] = 1.0;
        stats.pvalue[[i, i]] = 0.0;
        for j in (i + 1)..n {
            // Enforce exact symmetry against floating-point drift
            let r = stats.cor[[i, j]];
            stats.cor[[j, i]] = r;
            let p = stats.pvalue[[i, j]];
            stats.pvalue[[j, i]] = p;
        }
    }
    Ok(stats)
}
