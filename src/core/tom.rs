// tom.rs - Topological overlap matrix computation
//
// TOM_ij = (l_ij + a_ij) / (min(k_i, k_j) + 1 - a_ij), with
// l_ij = sum_u a_iu * a_uj and k_i = sum_u a_iu. The shared-neighbor sums
// are computed as one dense matrix product per row block (L = A_block . A)
// rather than explicit triple loops; blocks are processed in parallel and
// always multiply against the FULL adjacency matrix, so cross-block
// neighbor contributions are never lost.

use ndarray::{s, Array2, ArrayView2};
use rayon::prelude::*;

use crate::core::adjacency::connectivity;
use crate::error::{CoexError, Result};

/// Default number of rows per TOM block.
pub const DEFAULT_BLOCK_SIZE: usize = 2500;

fn progress_bar(len: u64) -> indicatif::ProgressBar {
    let pb = indicatif::ProgressBar::new(len);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {per_sec} ETA: {eta}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

/// Compute the topological overlap similarity matrix of an adjacency
/// matrix, block by block. `block_size` bounds the size of the per-block
/// shared-neighbor product held in memory at once.
pub fn tom_similarity(adj: ArrayView2<f64>, block_size: usize) -> Result<Array2<f64>> {
    let n = adj.nrows();
    if adj.ncols() != n {
        return Err(CoexError::ShapeMismatch {
            stage: "tom",
            detail: format!("adjacency matrix is {} x {}", n, adj.ncols()),
        });
    }
    if block_size == 0 {
        return Err(CoexError::Config("TOM block size must be > 0".to_string()));
    }
    for ((i, j), &a) in adj.indexed_iter() {
        if !a.is_finite() || !(0.0..=1.0).contains(&a) {
            return Err(CoexError::DegenerateInput {
                stage: "tom",
                detail: format!("adjacency[{}][{}] = {} outside [0, 1]", i, j, a),
            });
        }
    }

    let k = connectivity(adj);
    let n_blocks = n.div_ceil(block_size);
    let pb = progress_bar(n_blocks as u64);

    let blocks: Vec<(usize, Array2<f64>)> = (0..n_blocks)
        .into_par_iter()
        .map(|b| {
            let start = b * block_size;
            let end = (start + block_size).min(n);
            // Shared-neighbor sums for this row block over ALL n genes
            let l_block = adj.slice(s![start..end, ..]).dot(&adj);

            let mut tom_block = Array2::zeros((end - start, n));
            for bi in 0..(end - start) {
                let i = start + bi;
                for j in 0..n {
                    if i == j {
                        tom_block[[bi, j]] = 1.0;
                        continue;
                    }
                    let a_ij = adj[[i, j]];
                    let denom = k[i].min(k[j]) + 1.0 - a_ij;
                    let v = (l_block[[bi, j]] + a_ij) / denom;
                    tom_block[[bi, j]] = v.clamp(0.0, 1.0);
                }
            }
            pb.inc(1);
            (start, tom_block)
        })
        .collect();

    pb.finish_and_clear();

    let mut tom = Array2::zeros((n, n));
    for (start, block) in blocks {
        tom.slice_mut(s![start..start + block.nrows(), ..])
            .assign(&block);
    }
    Ok(tom)
}

/// TOM dissimilarity (1 - TOM), the clustering distance.
pub fn tom_dissimilarity(tom: ArrayView2<f64>) -> Array2<f64> {
    tom.mapv(|v| 1.0 - v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn example_adjacency() -> Array2<f64> {
        array![[0.0, 0.5, 0.2], [0.5, 0.0, 0.4], [0.2, 0.4, 0.0]]
    }

    #[test]
    fn hand_computed_three_gene_case() {
        let tom = tom_similarity(example_adjacency().view(), 64).unwrap();
        // l_01 = a_02 * a_21 = 0.08; denom = min(0.7, 0.9) + 1 - 0.5 = 1.2
        assert!((tom[[0, 1]] - (0.08 + 0.5) / 1.2).abs() < 1e-12);
        for i in 0..3 {
            assert_eq!(tom[[i, i]], 1.0);
            for j in 0..3 {
                assert!((tom[[i, j]] - tom[[j, i]]).abs() < 1e-12);
                assert!((0.0..=1.0).contains(&tom[[i, j]]));
            }
        }
    }

    #[test]
    fn block_size_does_not_change_the_result() {
        let adj = example_adjacency();
        let full = tom_similarity(adj.view(), 64).unwrap();
        let blocked = tom_similarity(adj.view(), 1).unwrap();
        for (a, b) in full.iter().zip(blocked.iter()) {
            assert!((a - b).abs() < 1e-15);
        }
    }

    #[test]
    fn rejects_out_of_range_adjacency() {
        let adj = array![[0.0, 1.5], [1.5, 0.0]];
        let err = tom_similarity(adj.view(), 64).unwrap_err();
        assert!(matches!(err, CoexError::DegenerateInput { .. }));
    }

    #[test]
    fn dissimilarity_is_one_minus_similarity() {
        let tom = tom_similarity(example_adjacency().view(), 64).unwrap();
        let diss = tom_dissimilarity(tom.view());
        assert!((diss[[0, 1]] - (1.0 - tom[[0, 1]])).abs() < 1e-15);
        assert_eq!(diss[[0, 0]], 0.0);
    }
}
