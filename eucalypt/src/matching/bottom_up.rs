//! Bottom-up matching of ancestors, with last-chance recovery of their children.

use indextree::NodeId;
use rapidhash::{RapidHashMap as HashMap, RapidHashSet as HashSet};
use rayon::prelude::*;

use crate::mapping::MappingStore;
use crate::matching::Matcher;
use crate::sequence::{lcs_isomorphic, lcs_isostructural};
use crate::similarity::{adaptive_threshold, dice_coefficient};
use crate::tree::{Tree, TreeTypes};
use crate::{debug, trace};

/// Candidate lists at least this long are scored in parallel.
const PARALLEL_SCORING_MIN: usize = 32;

/// Maps unmapped inner nodes to the destination ancestor that contains most of
/// their already-mapped descendants.
#[derive(Debug, Clone, Copy, Default)]
pub struct BottomUpMatcher {
    threshold: Option<f64>,
}

impl BottomUpMatcher {
    /// Use a fixed similarity threshold, or the adaptive one when `None`.
    pub fn new(threshold: Option<f64>) -> Self {
        Self { threshold }
    }

    fn threshold_for<T: TreeTypes>(
        &self,
        src: &Tree<T>,
        dst: &Tree<T>,
        s: NodeId,
        d: NodeId,
    ) -> f64 {
        match self.threshold {
            Some(threshold) => threshold,
            None => adaptive_threshold(src.size(s) - 1, dst.size(d) - 1),
        }
    }

    /// Best destination partner for the unmapped source node `s`, if any clears
    /// its threshold. Earlier candidates win ties.
    fn best_candidate<T: TreeTypes>(
        &self,
        src: &Tree<T>,
        dst: &Tree<T>,
        mapping: &MappingStore,
        s: NodeId,
    ) -> Option<NodeId> {
        let candidates = dst_candidates(src, dst, mapping, s);
        if candidates.is_empty() {
            return None;
        }

        let score = |&d: &NodeId| dice_coefficient(src, dst, s, d, mapping);
        let scores: Vec<f64> = if candidates.len() >= PARALLEL_SCORING_MIN {
            candidates.par_iter().map(score).collect()
        } else {
            candidates.iter().map(score).collect()
        };

        let mut best = None;
        let mut max = -1.0;
        for (&d, &sim) in candidates.iter().zip(&scores) {
            let threshold = self.threshold_for(src, dst, s, d);
            trace!(
                src = usize::from(s),
                dst = usize::from(d),
                sim,
                threshold,
                "bottom_up: candidate"
            );
            if sim > max && sim >= threshold {
                max = sim;
                best = Some(d);
            }
        }
        best
    }
}

impl Matcher for BottomUpMatcher {
    fn extend_mapping<T: TreeTypes>(
        &self,
        src: &Tree<T>,
        dst: &Tree<T>,
        mut mapping: MappingStore,
    ) -> MappingStore {
        trace!(threshold = ?self.threshold, "bottom_up start");

        for &s in src.post_order() {
            if src.is_root(s) {
                mapping.try_add(s, dst.root());
                if mapping.has(s, dst.root()) {
                    last_chance_match(src, dst, &mut mapping, s, dst.root());
                }
                break;
            }

            match mapping.get_dst(s) {
                None if !src.is_leaf(s) => {
                    if let Some(d) = self.best_candidate(src, dst, &mapping, s) {
                        trace!(src = usize::from(s), dst = usize::from(d), "bottom_up: match");
                        last_chance_match(src, dst, &mut mapping, s, d);
                        mapping.add(s, d);
                    }
                }
                Some(d)
                    if mapping.has_unmapped_src_children(src, s)
                        && mapping.has_unmapped_dst_children(dst, d) =>
                {
                    last_chance_match(src, dst, &mut mapping, s, d);
                }
                _ => {}
            }
        }

        debug!(matched = mapping.len(), "bottom_up done");
        mapping
    }
}

/// Destination nodes of the same type as `s` that contain the image of one of
/// its mapped descendants. Each destination ancestor is examined once.
fn dst_candidates<T: TreeTypes>(
    src: &Tree<T>,
    dst: &Tree<T>,
    mapping: &MappingStore,
    s: NodeId,
) -> Vec<NodeId> {
    let kind = src.kind(s);
    let mut candidates = Vec::new();
    let mut visited: HashSet<NodeId> = HashSet::default();

    for seed in src.descendants(s).iter().filter_map(|&c| mapping.get_dst(c)) {
        for parent in dst.ancestors(seed) {
            if !visited.insert(parent) {
                break;
            }
            if dst.kind(parent) == kind && !mapping.is_dst_mapped(parent) && !dst.is_root(parent) {
                candidates.push(parent);
            }
        }
    }
    candidates
}

fn unmapped_src_children<T: TreeTypes>(
    tree: &Tree<T>,
    mapping: &MappingStore,
    s: NodeId,
) -> Vec<NodeId> {
    tree.children(s).filter(|&c| !mapping.is_src_mapped(c)).collect()
}

fn unmapped_dst_children<T: TreeTypes>(
    tree: &Tree<T>,
    mapping: &MappingStore,
    d: NodeId,
) -> Vec<NodeId> {
    tree.children(d).filter(|&c| !mapping.is_dst_mapped(c)).collect()
}

/// Map the remaining children of an aligned pair.
///
/// Three stages run in order, each on the children still unmapped when it
/// starts: isomorphic LCS, isostructural LCS, then pairing of types that occur
/// exactly once on each side. Pairs found by the last stage are recovered in
/// turn.
pub(crate) fn last_chance_match<T: TreeTypes>(
    src: &Tree<T>,
    dst: &Tree<T>,
    mapping: &mut MappingStore,
    s: NodeId,
    d: NodeId,
) {
    let mut pending = vec![(s, d)];
    while let Some((s, d)) = pending.pop() {
        lcs_stage(src, dst, mapping, s, d, Alignment::Isomorphic);
        lcs_stage(src, dst, mapping, s, d, Alignment::Isostructural);
        let pairs = histogram_stage(src, dst, mapping, s, d);
        pending.extend(pairs.into_iter().rev());
    }
}

#[derive(Debug, Clone, Copy)]
enum Alignment {
    Isomorphic,
    Isostructural,
}

fn lcs_stage<T: TreeTypes>(
    src: &Tree<T>,
    dst: &Tree<T>,
    mapping: &mut MappingStore,
    s: NodeId,
    d: NodeId,
    alignment: Alignment,
) {
    let src_children = unmapped_src_children(src, mapping, s);
    let dst_children = unmapped_dst_children(dst, mapping, d);
    if src_children.is_empty() || dst_children.is_empty() {
        return;
    }

    let lcs = match alignment {
        Alignment::Isomorphic => lcs_isomorphic(src, &src_children, dst, &dst_children),
        Alignment::Isostructural => lcs_isostructural(src, &src_children, dst, &dst_children),
    };
    for (i, j) in lcs {
        let (a, b) = (src_children[i], dst_children[j]);
        if mapping.is_src_subtree_unmapped(src, a) && mapping.is_dst_subtree_unmapped(dst, b) {
            trace!(src = usize::from(a), dst = usize::from(b), ?alignment, "last_chance: lcs pair");
            mapping.add_recursively(src, dst, a, b);
        }
    }
}

/// Pair children whose type is unique among the unmapped children on both
/// sides. Returns the new pairs in source child order.
fn histogram_stage<T: TreeTypes>(
    src: &Tree<T>,
    dst: &Tree<T>,
    mapping: &mut MappingStore,
    s: NodeId,
    d: NodeId,
) -> Vec<(NodeId, NodeId)> {
    let mut order: Vec<&T::Kind> = Vec::new();
    let mut src_histogram: HashMap<&T::Kind, Vec<NodeId>> = HashMap::default();
    for c in unmapped_src_children(src, mapping, s) {
        let kind = src.kind(c);
        let bucket = src_histogram.entry(kind).or_default();
        if bucket.is_empty() {
            order.push(kind);
        }
        bucket.push(c);
    }

    let mut dst_histogram: HashMap<&T::Kind, Vec<NodeId>> = HashMap::default();
    for c in unmapped_dst_children(dst, mapping, d) {
        dst_histogram.entry(dst.kind(c)).or_default().push(c);
    }

    let mut pairs = Vec::new();
    for kind in order {
        if let (Some([a]), Some([b])) = (
            src_histogram.get(kind).map(Vec::as_slice),
            dst_histogram.get(kind).map(Vec::as_slice),
        ) {
            trace!(src = usize::from(*a), dst = usize::from(*b), "last_chance: histogram pair");
            mapping.add(*a, *b);
            pairs.push((*a, *b));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SimpleTypes;
    use crate::tree::{NodeData, TreeBuilder};

    type TestTypes = SimpleTypes<&'static str, String>;

    fn seeded(src: &Tree<TestTypes>, dst: &Tree<TestTypes>) -> MappingStore {
        let mut mapping = MappingStore::for_trees(src, dst);
        mapping.add(src.root(), dst.root());
        mapping
    }

    #[test]
    fn test_ancestor_found_through_mapped_leaves() {
        // root -> block -> [a, b, c]   vs   root -> wrapper -> block -> [a, b, z]
        let mut sb = TreeBuilder::<TestTypes>::new(NodeData::new("root"));
        let sr = sb.root();
        let s_block = sb.add_child(sr, NodeData::new("block"));
        let s_leaves: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|&l| sb.add_child(s_block, NodeData::leaf("leaf", l)))
            .collect();
        let src = sb.build().unwrap();

        let mut db = TreeBuilder::<TestTypes>::new(NodeData::new("root"));
        let dr = db.root();
        let wrapper = db.add_child(dr, NodeData::new("wrapper"));
        let d_block = db.add_child(wrapper, NodeData::new("block"));
        let d_leaves: Vec<_> = ["a", "b", "z"]
            .iter()
            .map(|&l| db.add_child(d_block, NodeData::leaf("leaf", l)))
            .collect();
        let dst = db.build().unwrap();

        let mut mapping = seeded(&src, &dst);
        mapping.add(s_leaves[0], d_leaves[0]);
        mapping.add(s_leaves[1], d_leaves[1]);

        let mapping = BottomUpMatcher::default().extend_mapping(&src, &dst, mapping);

        assert!(mapping.has(s_block, d_block));
        // Last-chance recovery pairs the remaining leaves by shape.
        assert!(mapping.has(s_leaves[2], d_leaves[2]));
    }

    #[test]
    fn test_mapped_pair_recovers_leftover_children() {
        // root -> block -> [a, b, c]   vs   root -> block -> [a, c, z],
        // with both blocks and `a` already mapped.
        let mut sb = TreeBuilder::<TestTypes>::new(NodeData::new("root"));
        let sr = sb.root();
        let s_block = sb.add_child(sr, NodeData::new("block"));
        let s_leaves: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|&l| sb.add_child(s_block, NodeData::leaf("leaf", l)))
            .collect();
        let src = sb.build().unwrap();

        let mut db = TreeBuilder::<TestTypes>::new(NodeData::new("root"));
        let dr = db.root();
        let d_block = db.add_child(dr, NodeData::new("block"));
        let d_leaves: Vec<_> = ["a", "c", "z"]
            .iter()
            .map(|&l| db.add_child(d_block, NodeData::leaf("leaf", l)))
            .collect();
        let dst = db.build().unwrap();

        let mut mapping = seeded(&src, &dst);
        mapping.add(s_block, d_block);
        mapping.add(s_leaves[0], d_leaves[0]);

        // The roots have nothing left to pair, so only the block pair can
        // recover its children.
        let mut at_root = mapping.clone();
        last_chance_match(&src, &dst, &mut at_root, src.root(), dst.root());
        assert_eq!(at_root.len(), mapping.len());

        let mapping = BottomUpMatcher::default().extend_mapping(&src, &dst, mapping);

        // isomorphic LCS
        assert!(mapping.has(s_leaves[2], d_leaves[1]));
        // isostructural LCS on what is left
        assert!(mapping.has(s_leaves[1], d_leaves[2]));
        assert_eq!(mapping.len(), 5);
    }

    #[test]
    fn test_fixed_threshold_rejects_weak_candidates() {
        let mut sb = TreeBuilder::<TestTypes>::new(NodeData::new("root"));
        let sr = sb.root();
        let s_block = sb.add_child(sr, NodeData::new("block"));
        let s_a = sb.add_child(s_block, NodeData::leaf("leaf", "a"));
        for l in ["b", "c", "d"] {
            sb.add_child(s_block, NodeData::leaf("leaf", l));
        }
        let src = sb.build().unwrap();

        let mut db = TreeBuilder::<TestTypes>::new(NodeData::new("root"));
        let dr = db.root();
        let d_block = db.add_child(dr, NodeData::new("block"));
        let d_a = db.add_child(d_block, NodeData::leaf("leaf", "a"));
        for l in ["w", "x", "y"] {
            db.add_child(d_block, NodeData::leaf("leaf", l));
        }
        let dst = db.build().unwrap();

        let mut mapping = seeded(&src, &dst);
        mapping.add(s_a, d_a);

        let strict = BottomUpMatcher::new(Some(0.9));
        assert_eq!(
            strict.best_candidate(&src, &dst, &mapping, s_block),
            None,
            "dice 0.25 is below 0.9"
        );
        let lenient = BottomUpMatcher::new(Some(0.2));
        assert_eq!(lenient.best_candidate(&src, &dst, &mapping, s_block), Some(d_block));
    }

    /// root -> children; a child with a label is a leaf, otherwise it holds
    /// one `id` leaf per entry.
    fn build(children: &[(&'static str, Option<&str>, &[&str])]) -> Tree<TestTypes> {
        let mut builder = TreeBuilder::<TestTypes>::new(NodeData::new("root"));
        let r = builder.root();
        for &(kind, label, ids) in children {
            match label {
                Some(label) => {
                    builder.add_child(r, NodeData::leaf(kind, label));
                }
                None => {
                    let n = builder.add_child(r, NodeData::new(kind));
                    for &id in ids {
                        builder.add_child(n, NodeData::leaf("id", id));
                    }
                }
            }
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_last_chance_stages() {
        let src = build(&[
            ("call", None, &["f", "x"]),
            ("num", Some("1"), &[]),
            ("block", None, &["p"]),
        ]);
        let dst = build(&[
            ("call", None, &["f", "x"]),
            ("num", Some("2"), &[]),
            ("num", Some("3"), &[]),
            ("block", None, &["p", "q"]),
        ]);
        let sc: Vec<_> = src.children(src.root()).collect();
        let dc: Vec<_> = dst.children(dst.root()).collect();

        let mut mapping = seeded(&src, &dst);
        last_chance_match(&src, &dst, &mut mapping, src.root(), dst.root());

        // isomorphic LCS
        assert!(mapping.has(sc[0], dc[0]));
        // isostructural LCS, earliest partner
        assert!(mapping.has(sc[1], dc[1]));
        assert!(!mapping.is_dst_mapped(dc[2]));
        // blocks differ in shape but their type is unique on both sides
        assert!(mapping.has(sc[2], dc[3]));
        // and recovery continues inside the histogram pair
        let src_p = src.children(sc[2]).next().unwrap();
        let dst_p = dst.children(dc[3]).next().unwrap();
        assert!(mapping.has(src_p, dst_p));
    }
}
