//! The bidirectional node mapping shared by every matching phase.

use indextree::NodeId;

use crate::tree::{Tree, TreeTypes};

/// A partial bijection between the nodes of a source and a destination tree.
/// Uses Vec for O(1) lookups indexed by NodeId.
///
/// Every source node maps to at most one destination node and vice versa.
/// Entry points that add pairs refuse to break that invariant.
#[derive(Debug, Clone, Default)]
pub struct MappingStore {
    /// Map from source node to destination node (indexed by the source NodeId)
    src_to_dst: Vec<Option<NodeId>>,
    /// Map from destination node to source node (indexed by the destination NodeId)
    dst_to_src: Vec<Option<NodeId>>,
    /// All pairs in insertion order (NodeId can't be reconstructed from index)
    pairs: Vec<(NodeId, NodeId)>,
}

impl MappingStore {
    /// Create a new empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty mapping sized for two trees.
    pub fn for_trees<T: TreeTypes>(src: &Tree<T>, dst: &Tree<T>) -> Self {
        Self {
            src_to_dst: vec![None; src.len() + 1],
            dst_to_src: vec![None; dst.len() + 1],
            pairs: Vec::with_capacity(src.len().min(dst.len())),
        }
    }

    /// Add a pair. Both nodes must be unmapped.
    #[inline]
    pub fn add(&mut self, src: NodeId, dst: NodeId) {
        debug_assert!(
            !self.is_src_mapped(src) && !self.is_dst_mapped(dst),
            "mapping would stop being a bijection"
        );
        let src_idx = usize::from(src);
        let dst_idx = usize::from(dst);

        // Grow vectors if needed
        if src_idx >= self.src_to_dst.len() {
            self.src_to_dst.resize(src_idx + 1, None);
        }
        if dst_idx >= self.dst_to_src.len() {
            self.dst_to_src.resize(dst_idx + 1, None);
        }

        self.src_to_dst[src_idx] = Some(dst);
        self.dst_to_src[dst_idx] = Some(src);
        self.pairs.push((src, dst));
    }

    /// Add a pair if both nodes are still unmapped. Returns whether it was added.
    pub fn try_add(&mut self, src: NodeId, dst: NodeId) -> bool {
        if self.is_src_mapped(src) || self.is_dst_mapped(dst) {
            return false;
        }
        self.add(src, dst);
        true
    }

    /// Map two isomorphic (or isostructural) subtrees node by node, in pre-order.
    ///
    /// Pairs already mapped to each other are kept; pairs where either side is
    /// mapped elsewhere are skipped.
    pub fn add_recursively<T: TreeTypes>(
        &mut self,
        src_tree: &Tree<T>,
        dst_tree: &Tree<T>,
        src: NodeId,
        dst: NodeId,
    ) {
        let src_nodes = src_tree.subtree(src);
        let dst_nodes = dst_tree.subtree(dst);
        debug_assert_eq!(src_nodes.len(), dst_nodes.len());
        for (&a, &b) in src_nodes.iter().zip(dst_nodes) {
            if !self.has(a, b) {
                self.try_add(a, b);
            }
        }
    }

    /// Remove a pair. Returns whether the pair was present.
    pub fn remove(&mut self, src: NodeId, dst: NodeId) -> bool {
        if !self.has(src, dst) {
            return false;
        }
        self.src_to_dst[usize::from(src)] = None;
        self.dst_to_src[usize::from(dst)] = None;
        self.pairs.retain(|&pair| pair != (src, dst));
        true
    }

    /// Check if a source node is mapped.
    #[inline(always)]
    pub fn is_src_mapped(&self, src: NodeId) -> bool {
        self.get_dst(src).is_some()
    }

    /// Check if a destination node is mapped.
    #[inline(always)]
    pub fn is_dst_mapped(&self, dst: NodeId) -> bool {
        self.get_src(dst).is_some()
    }

    /// Whether `src` is mapped to `dst`.
    #[inline(always)]
    pub fn has(&self, src: NodeId, dst: NodeId) -> bool {
        self.get_dst(src) == Some(dst)
    }

    /// Get the partner of a source node.
    #[inline(always)]
    pub fn get_dst(&self, src: NodeId) -> Option<NodeId> {
        self.src_to_dst.get(usize::from(src)).copied().flatten()
    }

    /// Get the partner of a destination node.
    #[inline(always)]
    pub fn get_src(&self, dst: NodeId) -> Option<NodeId> {
        self.dst_to_src.get(usize::from(dst)).copied().flatten()
    }

    /// Whether some child of a source node is unmapped.
    pub fn has_unmapped_src_children<T: TreeTypes>(&self, tree: &Tree<T>, src: NodeId) -> bool {
        tree.children(src).any(|c| !self.is_src_mapped(c))
    }

    /// Whether some child of a destination node is unmapped.
    pub fn has_unmapped_dst_children<T: TreeTypes>(&self, tree: &Tree<T>, dst: NodeId) -> bool {
        tree.children(dst).any(|c| !self.is_dst_mapped(c))
    }

    /// Whether some strict descendant of a source node is mapped.
    pub fn has_mapped_src_descendant<T: TreeTypes>(&self, tree: &Tree<T>, src: NodeId) -> bool {
        tree.descendants(src).iter().any(|&d| self.is_src_mapped(d))
    }

    /// Whether some strict descendant of a destination node is mapped.
    pub fn has_mapped_dst_descendant<T: TreeTypes>(&self, tree: &Tree<T>, dst: NodeId) -> bool {
        tree.descendants(dst).iter().any(|&d| self.is_dst_mapped(d))
    }

    /// Whether the whole source subtree, root included, is unmapped.
    pub fn is_src_subtree_unmapped<T: TreeTypes>(&self, tree: &Tree<T>, src: NodeId) -> bool {
        tree.subtree(src).iter().all(|&n| !self.is_src_mapped(n))
    }

    /// Whether the whole destination subtree, root included, is unmapped.
    pub fn is_dst_subtree_unmapped<T: TreeTypes>(&self, tree: &Tree<T>, dst: NodeId) -> bool {
        tree.subtree(dst).iter().all(|&n| !self.is_dst_mapped(n))
    }

    /// Get all mapped pairs, in the order they were added.
    pub fn pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.pairs.iter().copied()
    }

    /// Get the number of mapped pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
