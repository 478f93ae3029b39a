//! Greedy top-down matching of identical subtrees.

use core::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use indextree::NodeId;
use rapidhash::RapidHashMap as HashMap;

use crate::mapping::MappingStore;
use crate::matching::Matcher;
use crate::sequence::isomorphic;
use crate::similarity::dice_coefficient;
use crate::tree::{Tree, TreeTypes};
use crate::{debug, trace};

/// Maps isomorphic subtrees, tallest first.
///
/// Nodes are compared level by level in decreasing height. A subtree with
/// exactly one isomorphic partner on each side is mapped immediately; subtrees
/// with several partners are ranked by the similarity of their parents once
/// every unique pair has been mapped.
#[derive(Debug, Clone, Copy)]
pub struct TopDownMatcher {
    min_height: usize,
}

impl Default for TopDownMatcher {
    fn default() -> Self {
        Self::new(1)
    }
}

impl TopDownMatcher {
    /// Ignore subtrees lower than `min_height` (a leaf has height 1).
    pub fn new(min_height: usize) -> Self {
        Self {
            min_height: min_height.max(1),
        }
    }
}

impl Matcher for TopDownMatcher {
    fn extend_mapping<T: TreeTypes>(
        &self,
        src: &Tree<T>,
        dst: &Tree<T>,
        mut mapping: MappingStore,
    ) -> MappingStore {
        trace!(min_height = self.min_height, "top_down start");

        let mut src_queue = HeightQueue::new(src, self.min_height);
        let mut dst_queue = HeightQueue::new(dst, self.min_height);
        src_queue.push(src.root());
        dst_queue.push(dst.root());

        let mut ambiguous: Vec<(NodeId, NodeId)> = Vec::new();

        while let (Some(src_height), Some(dst_height)) =
            (src_queue.peek_height(), dst_queue.peek_height())
        {
            match src_height.cmp(&dst_height) {
                Ordering::Greater => {
                    for node in src_queue.pop() {
                        src_queue.open(node);
                    }
                    continue;
                }
                Ordering::Less => {
                    for node in dst_queue.pop() {
                        dst_queue.open(node);
                    }
                    continue;
                }
                Ordering::Equal => {}
            }

            let src_nodes = src_queue.pop();
            let dst_nodes = dst_queue.pop();

            let mut dst_by_hash: HashMap<u64, Vec<usize>> = HashMap::default();
            for (j, &d) in dst_nodes.iter().enumerate() {
                dst_by_hash.entry(dst.iso_hash(d)).or_default().push(j);
            }

            let mut pairs: Vec<(usize, usize)> = Vec::new();
            let mut src_partners = vec![0usize; src_nodes.len()];
            let mut dst_partners = vec![0usize; dst_nodes.len()];
            for (i, &s) in src_nodes.iter().enumerate() {
                let Some(bucket) = dst_by_hash.get(&src.iso_hash(s)) else {
                    continue;
                };
                for &j in bucket {
                    if isomorphic(src, s, dst, dst_nodes[j]) {
                        pairs.push((i, j));
                        src_partners[i] += 1;
                        dst_partners[j] += 1;
                    }
                }
            }

            for &(i, j) in &pairs {
                let (s, d) = (src_nodes[i], dst_nodes[j]);
                if src_partners[i] == 1 && dst_partners[j] == 1 {
                    if can_map_subtrees(src, dst, &mapping, s, d) {
                        trace!(
                            src = usize::from(s),
                            dst = usize::from(d),
                            "top_down: unique isomorphic pair"
                        );
                        mapping.add_recursively(src, dst, s, d);
                    }
                } else {
                    ambiguous.push((s, d));
                }
            }

            for (i, &s) in src_nodes.iter().enumerate() {
                if src_partners[i] == 0 {
                    src_queue.open(s);
                }
            }
            for (j, &d) in dst_nodes.iter().enumerate() {
                if dst_partners[j] == 0 {
                    dst_queue.open(d);
                }
            }
        }

        // Parent similarity first, then the closest sibling positions, then
        // source order.
        let mut ranked: Vec<(f64, usize, usize, usize, NodeId, NodeId)> = ambiguous
            .into_iter()
            .map(|(s, d)| {
                let parent_sim = match (src.parent(s), dst.parent(d)) {
                    (Some(ps), Some(pd)) => dice_coefficient(src, dst, ps, pd, &mapping),
                    _ => 0.0,
                };
                let distance = src.position(s).abs_diff(dst.position(d));
                (parent_sim, distance, src.pre_index(s), dst.pre_index(d), s, d)
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
                .then(a.3.cmp(&b.3))
        });

        for (_, _, _, _, s, d) in ranked {
            if can_map_subtrees(src, dst, &mapping, s, d) && !mapping.has(s, d) {
                trace!(src = usize::from(s), dst = usize::from(d), "top_down: ambiguous pair");
                mapping.add_recursively(src, dst, s, d);
            }
        }

        debug!(matched = mapping.len(), "top_down done");
        mapping
    }
}

/// Whether mapping `s` onto `d` node by node keeps the mapping a bijection and
/// agrees with every pair already present.
fn can_map_subtrees<T: TreeTypes>(
    src: &Tree<T>,
    dst: &Tree<T>,
    mapping: &MappingStore,
    s: NodeId,
    d: NodeId,
) -> bool {
    src.subtree(s)
        .iter()
        .zip(dst.subtree(d))
        .all(|(&a, &b)| {
            mapping.has(a, b) || (!mapping.is_src_mapped(a) && !mapping.is_dst_mapped(b))
        })
}

/// Nodes of one tree waiting to be compared, highest subtree first.
struct HeightQueue<'t, T: TreeTypes> {
    tree: &'t Tree<T>,
    min_height: usize,
    // (height, earliest pre-order first)
    heap: BinaryHeap<(usize, Reverse<usize>)>,
}

impl<'t, T: TreeTypes> HeightQueue<'t, T> {
    fn new(tree: &'t Tree<T>, min_height: usize) -> Self {
        Self {
            tree,
            min_height,
            heap: BinaryHeap::new(),
        }
    }

    fn push(&mut self, node: NodeId) {
        let height = self.tree.height(node);
        if height >= self.min_height {
            self.heap.push((height, Reverse(self.tree.pre_index(node))));
        }
    }

    fn peek_height(&self) -> Option<usize> {
        self.heap.peek().map(|&(height, _)| height)
    }

    /// Remove every node of the greatest height, in pre-order.
    fn pop(&mut self) -> Vec<NodeId> {
        let Some(height) = self.peek_height() else {
            return Vec::new();
        };
        let mut nodes = Vec::new();
        while let Some(&(h, Reverse(pre))) = self.heap.peek() {
            if h != height {
                break;
            }
            self.heap.pop();
            nodes.push(self.tree.pre_order()[pre]);
        }
        nodes
    }

    fn open(&mut self, node: NodeId) {
        for child in self.tree.children(node) {
            self.push(child);
        }
    }
}
