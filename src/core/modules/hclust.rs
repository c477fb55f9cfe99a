// hclust.rs - Average-linkage agglomerative clustering

use ndarray::ArrayView2;

use crate::error::{CoexError, Result};

/// One merge in the dendrogram. `left` and `right` are cluster ids:
/// 0..n-1 are leaves, n + i is the cluster created by merge i.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeStep {
    pub left: usize,
    pub right: usize,
    pub height: f64,
    pub size: usize,
}

/// Binary merge tree over genes from average-linkage clustering on a
/// dissimilarity matrix.
#[derive(Debug, Clone)]
pub struct Dendrogram {
    pub n_leaves: usize,
    pub merges: Vec<MergeStep>,
}

impl Dendrogram {
    pub fn max_height(&self) -> f64 {
        self.merges
            .iter()
            .map(|m| m.height)
            .fold(0.0_f64, f64::max)
    }
}

/// Run average-linkage (UPGMA) clustering on a precomputed dissimilarity
/// matrix. Cluster distances are updated with the Lance-Williams weighted
/// average; ties are broken by lowest slot index, so the result is fully
/// deterministic.
pub fn average_linkage(dissimilarity: ArrayView2<f64>) -> Result<Dendrogram> {
    let n = dissimilarity.nrows();
    if dissimilarity.ncols() != n {
        return Err(CoexError::ShapeMismatch {
            stage: "clustering",
            detail: format!(
                "dissimilarity matrix is {} x {}",
                n,
                dissimilarity.ncols()
            ),
        });
    }
    for ((i, j), &d) in dissimilarity.indexed_iter() {
        if !d.is_finite() {
            return Err(CoexError::DegenerateInput {
                stage: "clustering",
                detail: format!("dissimilarity[{}][{}] = {}", i, j, d),
            });
        }
    }

    if n == 0 {
        return Ok(Dendrogram {
            n_leaves: 0,
            merges: Vec::new(),
        });
    }

    // Working state per slot: each leaf starts in its own slot; a merge
    // reuses the lower slot and deactivates the higher one.
    let mut dist = dissimilarity.to_owned();
    let mut active: Vec<usize> = (0..n).collect();
    let mut cluster_id: Vec<usize> = (0..n).collect();
    let mut size: Vec<usize> = vec![1; n];
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    while active.len() > 1 {
        // Closest active pair; strict < keeps the earliest pair on ties
        let mut best = f64::INFINITY;
        let mut best_a = active[0];
        let mut best_b = active[0];
        for (ai, &a) in active.iter().enumerate() {
            for &b in &active[ai + 1..] {
                if dist[[a, b]] < best {
                    best = dist[[a, b]];
                    best_a = a;
                    best_b = b;
                }
            }
        }

        let new_size = size[best_a] + size[best_b];
        merges.push(MergeStep {
            left: cluster_id[best_a],
            right: cluster_id[best_b],
            height: best,
            size: new_size,
        });

        // Lance-Williams average update into slot best_a
        let wa = size[best_a] as f64;
        let wb = size[best_b] as f64;
        for &c in &active {
            if c == best_a || c == best_b {
                continue;
            }
            let d = (dist[[best_a, c]] * wa + dist[[best_b, c]] * wb) / (wa + wb);
            dist[[best_a, c]] = d;
            dist[[c, best_a]] = d;
        }

        cluster_id[best_a] = n + merges.len() - 1;
        size[best_a] = new_size;
        active.retain(|&c| c != best_b);
    }

    Ok(Dendrogram {
        n_leaves: n,
        merges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn merges_closest_pair_first() {
        let diss = array![
            [0.0, 0.1, 0.9, 0.8],
            [0.1, 0.0, 0.85, 0.9],
            [0.9, 0.85, 0.0, 0.2],
            [0.8, 0.9, 0.2, 0.0]
        ];
        let dendro = average_linkage(diss.view()).unwrap();
        assert_eq!(dendro.n_leaves, 4);
        assert_eq!(dendro.merges.len(), 3);
        assert_eq!((dendro.merges[0].left, dendro.merges[0].right), (0, 1));
        assert!((dendro.merges[0].height - 0.1).abs() < 1e-12);
        assert_eq!((dendro.merges[1].left, dendro.merges[1].right), (2, 3));
        // Final merge joins the two pair-clusters at the average distance
        assert_eq!(dendro.merges[2].size, 4);
        let expected = (0.9 + 0.85 + 0.8 + 0.9) / 4.0;
        assert!((dendro.merges[2].height - expected).abs() < 1e-12);
    }

    #[test]
    fn heights_are_monotone_for_ultrametric_input() {
        let diss = array![
            [0.0, 0.2, 0.6, 0.6],
            [0.2, 0.0, 0.6, 0.6],
            [0.6, 0.6, 0.0, 0.3],
            [0.6, 0.6, 0.3, 0.0]
        ];
        let dendro = average_linkage(diss.view()).unwrap();
        for w in dendro.merges.windows(2) {
            assert!(w[0].height <= w[1].height + 1e-12);
        }
    }

    #[test]
    fn single_leaf_has_no_merges() {
        let diss = array![[0.0]];
        let dendro = average_linkage(diss.view()).unwrap();
        assert_eq!(dendro.n_leaves, 1);
        assert!(dendro.merges.is_empty());
        assert_eq!(dendro.max_height(), 0.0);
    }

    #[test]
    fn nan_dissimilarity_is_fatal() {
        let diss = array![[0.0, f64::NAN], [f64::NAN, 0.0]];
        let err = average_linkage(diss.view()).unwrap_err();
        assert!(matches!(err, CoexError::DegenerateInput { .. }));
    }
}
