// cut.rs - Branch cut of the dendrogram into initial modules

use super::hclust::Dendrogram;
use super::ModuleId;

/// Cut the dendrogram at `cut_height`: leaves joined by merges at or below
/// the cut form branches; branches with at least `min_size` genes become
/// modules, labelled 1.. in order of decreasing size (ties by lowest gene
/// index). Everything else is unassigned (0).
pub fn cut_tree(dendrogram: &Dendrogram, cut_height: f64, min_size: usize) -> Vec<ModuleId> {
    let n = dendrogram.n_leaves;
    let mut parent: Vec<usize> = (0..n + dendrogram.merges.len()).collect();

    fn find(parent: &mut Vec<usize>, mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for (step, merge) in dendrogram.merges.iter().enumerate() {
        let cluster = n + step;
        if merge.height <= cut_height {
            let ra = find(&mut parent, merge.left);
            let rb = find(&mut parent, merge.right);
            parent[ra] = cluster;
            parent[rb] = cluster;
        }
    }

    // Group leaves by component root
    let mut roots: Vec<usize> = (0..n).map(|leaf| find(&mut parent, leaf)).collect();
    let mut branch_leaves: std::collections::HashMap<usize, Vec<usize>> =
        std::collections::HashMap::new();
    for (leaf, root) in roots.drain(..).enumerate() {
        branch_leaves.entry(root).or_default().push(leaf);
    }

    // Order qualifying branches by decreasing size, then first gene index
    let mut branches: Vec<Vec<usize>> = branch_leaves
        .into_values()
        .filter(|leaves| leaves.len() >= min_size)
        .collect();
    branches.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));

    let mut labels = vec![ModuleId::UNASSIGNED; n];
    for (rank, leaves) in branches.iter().enumerate() {
        for &leaf in leaves {
            labels[leaf] = ModuleId(rank + 1);
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::modules::hclust::average_linkage;
    use ndarray::array;

    fn two_branch_dendrogram() -> Dendrogram {
        // Leaves {0,1,2} tight, {3,4} tight, joined only at the top
        let diss = array![
            [0.0, 0.1, 0.15, 0.9, 0.9],
            [0.1, 0.0, 0.12, 0.9, 0.9],
            [0.15, 0.12, 0.0, 0.9, 0.9],
            [0.9, 0.9, 0.9, 0.0, 0.2],
            [0.9, 0.9, 0.9, 0.2, 0.0]
        ];
        average_linkage(diss.view()).unwrap()
    }

    #[test]
    fn cut_separates_branches_and_orders_labels_by_size() {
        let dendro = two_branch_dendrogram();
        let labels = cut_tree(&dendro, 0.5, 2);
        // Larger branch gets label 1
        assert_eq!(labels[0], ModuleId(1));
        assert_eq!(labels[1], ModuleId(1));
        assert_eq!(labels[2], ModuleId(1));
        assert_eq!(labels[3], ModuleId(2));
        assert_eq!(labels[4], ModuleId(2));
    }

    #[test]
    fn min_size_sends_small_branches_to_unassigned() {
        let dendro = two_branch_dendrogram();
        let labels = cut_tree(&dendro, 0.5, 3);
        assert_eq!(labels[3], ModuleId::UNASSIGNED);
        assert_eq!(labels[4], ModuleId::UNASSIGNED);
        assert_eq!(labels[0], ModuleId(1));
    }

    #[test]
    fn cut_above_every_merge_yields_one_module() {
        let dendro = two_branch_dendrogram();
        let labels = cut_tree(&dendro, 1.0, 2);
        assert!(labels.iter().all(|&m| m == ModuleId(1)));
    }

    #[test]
    fn cut_below_every_merge_leaves_all_unassigned() {
        let dendro = two_branch_dendrogram();
        let labels = cut_tree(&dendro, 0.01, 2);
        assert!(labels.iter().all(|m| m.is_unassigned()));
    }
}
