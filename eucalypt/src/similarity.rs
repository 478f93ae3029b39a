//! Similarity metrics between a source and a destination subtree.

use indextree::NodeId;

use crate::mapping::MappingStore;
use crate::tree::{Tree, TreeTypes};

/// Compute the Dice coefficient between two nodes based on mapped descendants.
///
/// dice(A, B) = 2 × |descendants of A mapped into B| / (|descendants_A| + |descendants_B|)
///
/// Two nodes without descendants have similarity 0.
pub fn dice_coefficient<T: TreeTypes>(
    src_tree: &Tree<T>,
    dst_tree: &Tree<T>,
    src: NodeId,
    dst: NodeId,
    mapping: &MappingStore,
) -> f64 {
    let desc_src = src_tree.descendants(src);
    let desc_dst = dst_tree.descendants(dst);
    let total = desc_src.len() + desc_dst.len();
    if total == 0 {
        return 0.0;
    }

    let common = desc_src
        .iter()
        .filter(|&&a| {
            mapping
                .get_dst(a)
                .is_some_and(|b| dst_tree.is_descendant(b, dst))
        })
        .count();

    2.0 * common as f64 / total as f64
}

/// Bottom-up acceptance threshold when none is configured.
///
/// `1 / (1 + ln(n))` for `n` combined descendants: the larger the two
/// subtrees, the lower the bar.
pub fn adaptive_threshold(src_descendants: usize, dst_descendants: usize) -> f64 {
    let total = src_descendants + dst_descendants;
    if total == 0 {
        return 1.0;
    }
    1.0 / (1.0 + (total as f64).ln())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SimpleTypes;
    use crate::tree::{NodeData, TreeBuilder};

    type TestTypes = SimpleTypes<&'static str, String>;

    fn block(labels: &[&str]) -> Tree<TestTypes> {
        let mut builder = TreeBuilder::<TestTypes>::new(NodeData::new("root"));
        let root = builder.root();
        let inner = builder.add_child(root, NodeData::new("block"));
        for &label in labels {
            builder.add_child(inner, NodeData::leaf("leaf", label));
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_dice_counts_mapped_descendants() {
        let src = block(&["a", "b", "c"]);
        let dst = block(&["a", "b", "x", "y", "z"]);
        let src_inner = src.pre_order()[1];
        let dst_inner = dst.pre_order()[1];
        let mut mapping = MappingStore::for_trees(&src, &dst);

        assert_eq!(dice_coefficient(&src, &dst, src_inner, dst_inner, &mapping), 0.0);

        mapping.add(src.pre_order()[2], dst.pre_order()[2]);
        mapping.add(src.pre_order()[3], dst.pre_order()[3]);
        let sim = dice_coefficient(&src, &dst, src_inner, dst_inner, &mapping);
        assert!((sim - 0.5).abs() < 1e-9, "2*2/(3+5) = 0.5, got {sim}");
    }

    #[test]
    fn test_dice_ignores_pairs_outside_the_candidate() {
        let src = block(&["a"]);
        let dst = block(&["a"]);
        let mut mapping = MappingStore::for_trees(&src, &dst);
        // Leaf mapped to the destination block itself, which is not its own descendant.
        mapping.add(src.pre_order()[2], dst.pre_order()[1]);

        let sim = dice_coefficient(&src, &dst, src.pre_order()[1], dst.pre_order()[1], &mapping);
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_dice_of_leaves_is_zero() {
        let src = block(&["a"]);
        let dst = block(&["a"]);
        let leaf_a = src.pre_order()[2];
        let leaf_b = dst.pre_order()[2];
        let sim = dice_coefficient(&src, &dst, leaf_a, leaf_b, &MappingStore::new());
        assert_eq!(sim, 0.0);
        assert!(!sim.is_nan());
    }

    #[test]
    fn test_adaptive_threshold_decreases_with_size() {
        assert_eq!(adaptive_threshold(0, 0), 1.0);
        assert_eq!(adaptive_threshold(1, 0), 1.0);
        let small = adaptive_threshold(2, 2);
        let large = adaptive_threshold(200, 200);
        assert!(small > large);
        assert!(large > 0.0);
    }
}
