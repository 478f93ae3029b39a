//! Longest common subsequence over lists of subtrees.

use indextree::NodeId;

use crate::tree::{Tree, TreeTypes};

/// Longest common subsequence of `a` and `b` under an equivalence predicate.
///
/// Returns index pairs `(i, j)` in increasing order on both sides. Among
/// alignments of maximum length, the one found by scanning earliest indices
/// first wins.
pub fn longest_common_subsequence<A, B>(
    a: &[A],
    b: &[B],
    mut equivalent: impl FnMut(&A, &B) -> bool,
) -> Vec<(usize, usize)> {
    let n = a.len();
    let m = b.len();
    if n == 0 || m == 0 {
        return Vec::new();
    }

    let width = m + 1;
    // lengths[i * width + j] = LCS length of a[i..] and b[j..]
    let mut lengths = vec![0usize; (n + 1) * width];
    let mut equal = vec![false; n * m];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i * width + j] = if equivalent(&a[i], &b[j]) {
                equal[i * m + j] = true;
                lengths[(i + 1) * width + j + 1] + 1
            } else {
                lengths[(i + 1) * width + j].max(lengths[i * width + j + 1])
            };
        }
    }

    let mut pairs = Vec::with_capacity(lengths[0]);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if equal[i * m + j] {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if lengths[(i + 1) * width + j] >= lengths[i * width + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

/// Two subtrees are isomorphic when they have the same type and label at every
/// node, in the same shape.
pub fn isomorphic<T: TreeTypes>(
    src_tree: &Tree<T>,
    src: NodeId,
    dst_tree: &Tree<T>,
    dst: NodeId,
) -> bool {
    if src_tree.iso_hash(src) != dst_tree.iso_hash(dst) || src_tree.size(src) != dst_tree.size(dst)
    {
        return false;
    }
    src_tree
        .subtree(src)
        .iter()
        .zip(dst_tree.subtree(dst))
        .all(|(&a, &b)| {
            src_tree.kind(a) == dst_tree.kind(b)
                && src_tree.label(a) == dst_tree.label(b)
                && src_tree.child_count(a) == dst_tree.child_count(b)
        })
}

/// Two subtrees are isostructural when they have the same type at every node,
/// in the same shape. Labels are ignored.
pub fn isostructural<T: TreeTypes>(
    src_tree: &Tree<T>,
    src: NodeId,
    dst_tree: &Tree<T>,
    dst: NodeId,
) -> bool {
    if src_tree.shape_hash(src) != dst_tree.shape_hash(dst)
        || src_tree.size(src) != dst_tree.size(dst)
    {
        return false;
    }
    src_tree
        .subtree(src)
        .iter()
        .zip(dst_tree.subtree(dst))
        .all(|(&a, &b)| {
            src_tree.kind(a) == dst_tree.kind(b)
                && src_tree.child_count(a) == dst_tree.child_count(b)
        })
}

/// LCS of two lists of subtrees under [`isomorphic`].
pub fn lcs_isomorphic<T: TreeTypes>(
    src_tree: &Tree<T>,
    src: &[NodeId],
    dst_tree: &Tree<T>,
    dst: &[NodeId],
) -> Vec<(usize, usize)> {
    longest_common_subsequence(src, dst, |&a, &b| isomorphic(src_tree, a, dst_tree, b))
}

/// LCS of two lists of subtrees under [`isostructural`].
pub fn lcs_isostructural<T: TreeTypes>(
    src_tree: &Tree<T>,
    src: &[NodeId],
    dst_tree: &Tree<T>,
    dst: &[NodeId],
) -> Vec<(usize, usize)> {
    longest_common_subsequence(src, dst, |&a, &b| isostructural(src_tree, a, dst_tree, b))
}
