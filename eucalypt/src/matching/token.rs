//! Token recovery: leaf correspondences inside aligned expressions.
//!
//! Structural matching works on whole subtrees and misses leaves whose
//! surroundings changed shape. This pass walks the source tree, treats every
//! expression-like node as a match unit, and pairs the unmapped leaves of each
//! unit with the unmapped leaves of its destination counterpart.

use indextree::NodeId;

use crate::config::TokenRecovery;
use crate::mapping::MappingStore;
use crate::matching::Matcher;
use crate::similarity::dice_coefficient;
use crate::tree::{KindClass, Tree, TreeTypes};
use crate::{debug, trace};

/// Weight of a candidate pair whose parents are mapped to each other.
const PARENT_SCORE: u32 = 2;
/// Weight of a candidate pair the mapping already holds.
const MAPPED_SCORE: u32 = 1;

/// Recovers leaf pairs inside expression-like units.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenMatcher {
    mode: TokenRecovery,
}

impl TokenMatcher {
    /// Create a matcher for the given recovery variant.
    pub fn new(mode: TokenRecovery) -> Self {
        Self { mode }
    }

    /// Run token recovery over a stabilized mapping.
    ///
    /// Leaves with the same type and label are added to `mapping`. The returned
    /// overlay holds those pairs and the mapped pairs already inside each unit.
    /// In relaxed mode the label-agnostic re-pairings then take over the
    /// overlay entries of the leaves they pair. The overlay is not merged into
    /// `mapping`, and re-pairing never removes a pair from `mapping`.
    pub fn recover<T: TreeTypes>(
        &self,
        src: &Tree<T>,
        dst: &Tree<T>,
        mapping: &mut MappingStore,
    ) -> MappingStore {
        let mut overlay = MappingStore::for_trees(src, dst);
        if self.mode == TokenRecovery::Off {
            return overlay;
        }

        let mut stack = vec![src.root()];
        while let Some(s) = stack.pop() {
            if src.kind_class(s).intersects(KindClass::TOKEN_UNIT) {
                if let Some(d) = unit_candidate(src, dst, mapping, s) {
                    trace!(src = usize::from(s), dst = usize::from(d), "token: unit");
                    self.match_unit(src, dst, mapping, &mut overlay, s, d);
                }
                // The unit is handled as a whole.
                continue;
            }
            let children: Vec<NodeId> = src.children(s).collect();
            stack.extend(children.into_iter().rev());
        }

        debug!(overlay = overlay.len(), mode = ?self.mode, "token recovery done");
        overlay
    }

    fn match_unit<T: TreeTypes>(
        &self,
        src: &Tree<T>,
        dst: &Tree<T>,
        mapping: &mut MappingStore,
        overlay: &mut MappingStore,
        s: NodeId,
        d: NodeId,
    ) {
        let scope = dst.parent(d).unwrap_or(d);
        let src_leaves = collect_src_leaves(src, dst, mapping, overlay, s, scope);
        let dst_leaves: Vec<NodeId> = unit_leaves(dst, d)
            .into_iter()
            .filter(|&n| !mapping.is_dst_mapped(n))
            .collect();

        // Exact pairs, first unclaimed destination leaf in pre-order.
        let mut claimed_dst = vec![false; dst_leaves.len()];
        for &a in &src_leaves {
            let exact = dst_leaves.iter().enumerate().find(|&(j, &b)| {
                !claimed_dst[j] && src.kind(a) == dst.kind(b) && src.label(a) == dst.label(b)
            });
            if let Some((j, &b)) = exact {
                trace!(src = usize::from(a), dst = usize::from(b), "token: exact leaf pair");
                mapping.add(a, b);
                overlay.try_add(a, b);
                claimed_dst[j] = true;
            }
        }

        if self.mode == TokenRecovery::Relaxed {
            relax_unit(src, dst, mapping, overlay, s, d);
        }
    }
}

/// Label-agnostic re-pairing of every leaf in a unit, mapped or not.
///
/// Same-kind pairs are scored, then assigned greedily by score, source order
/// and destination order, each leaf at most once. An assigned pair replaces
/// whatever the overlay held for either leaf. `mapping` is left untouched.
fn relax_unit<T: TreeTypes>(
    src: &Tree<T>,
    dst: &Tree<T>,
    mapping: &MappingStore,
    overlay: &mut MappingStore,
    s: NodeId,
    d: NodeId,
) {
    let src_leaves = unit_leaves(src, s);
    let dst_leaves = unit_leaves(dst, d);

    let mut scored: Vec<(u32, usize, usize)> = Vec::new();
    for (i, &a) in src_leaves.iter().enumerate() {
        for (j, &b) in dst_leaves.iter().enumerate() {
            if src.kind(a) != dst.kind(b) {
                continue;
            }
            let mut score = 0;
            if let (Some(pa), Some(pb)) = (src.parent(a), dst.parent(b))
                && mapping.has(pa, pb)
            {
                score += PARENT_SCORE;
            }
            if mapping.has(a, b) {
                score += MAPPED_SCORE;
            }
            if score > 0 {
                scored.push((score, i, j));
            }
        }
    }
    scored.sort_by(|x, y| y.0.cmp(&x.0).then(x.1.cmp(&y.1)).then(x.2.cmp(&y.2)));

    let mut taken_src = vec![false; src_leaves.len()];
    let mut taken_dst = vec![false; dst_leaves.len()];
    for (score, i, j) in scored {
        if taken_src[i] || taken_dst[j] {
            continue;
        }
        taken_src[i] = true;
        taken_dst[j] = true;

        let (a, b) = (src_leaves[i], dst_leaves[j]);
        if overlay.has(a, b) {
            continue;
        }
        if let Some(old) = overlay.get_dst(a) {
            overlay.remove(a, old);
        }
        if let Some(old) = overlay.get_src(b) {
            overlay.remove(old, b);
        }
        overlay.add(a, b);
        trace!(
            src = usize::from(a),
            dst = usize::from(b),
            score,
            "token: relaxed leaf pair"
        );
    }
}

impl Matcher for TokenMatcher {
    fn extend_mapping<T: TreeTypes>(
        &self,
        src: &Tree<T>,
        dst: &Tree<T>,
        mut mapping: MappingStore,
    ) -> MappingStore {
        self.recover(src, dst, &mut mapping);
        mapping
    }
}

/// Destination counterpart of a unit: its current partner, or else the
/// most similar unit among the children of its parent's partner.
fn unit_candidate<T: TreeTypes>(
    src: &Tree<T>,
    dst: &Tree<T>,
    mapping: &MappingStore,
    s: NodeId,
) -> Option<NodeId> {
    if let Some(d) = mapping.get_dst(s) {
        return Some(d);
    }
    let parent = mapping.get_dst(src.parent(s)?)?;

    let mut best = None;
    let mut max = -1.0;
    for c in dst.children(parent) {
        if !dst.kind_class(c).intersects(KindClass::TOKEN_UNIT) {
            continue;
        }
        let sim = dice_coefficient(src, dst, s, c, mapping);
        if sim > max {
            max = sim;
            best = Some(c);
        }
    }
    best
}

/// Unmapped leaves of the source unit, outside nested containers. Mapped nodes
/// whose partner lies inside `scope` go to the overlay on the way.
fn collect_src_leaves<T: TreeTypes>(
    src: &Tree<T>,
    dst: &Tree<T>,
    mapping: &MappingStore,
    overlay: &mut MappingStore,
    unit: NodeId,
    scope: NodeId,
) -> Vec<NodeId> {
    let mut leaves = Vec::new();
    let mut stack = vec![unit];
    while let Some(n) = stack.pop() {
        if src.kind_class(n).contains(KindClass::CONTAINER) {
            continue;
        }
        match mapping.get_dst(n) {
            Some(image) => {
                if dst.is_descendant(image, scope) {
                    overlay.try_add(n, image);
                }
            }
            None if src.is_leaf(n) => leaves.push(n),
            None => {}
        }
        let children: Vec<NodeId> = src.children(n).collect();
        stack.extend(children.into_iter().rev());
    }
    leaves
}

/// Leaves of a unit in pre-order, outside nested containers.
fn unit_leaves<T: TreeTypes>(tree: &Tree<T>, unit: NodeId) -> Vec<NodeId> {
    let mut leaves = Vec::new();
    let mut stack = vec![unit];
    while let Some(n) = stack.pop() {
        if tree.kind_class(n).contains(KindClass::CONTAINER) {
            continue;
        }
        if tree.is_leaf(n) {
            leaves.push(n);
        }
        let children: Vec<NodeId> = tree.children(n).collect();
        stack.extend(children.into_iter().rev());
    }
    leaves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::JavaTypes;
    use crate::script::{Action, generate_edit_script};
    use crate::suppress::suppress_overlay_moves;
    use crate::tree::{NodeData, TreeBuilder};

    /// ExpressionStatement -> MethodInvocation(name, args...)
    fn call(args: &[(&'static str, &str)]) -> (Tree<JavaTypes>, NodeId, NodeId, Vec<NodeId>) {
        let mut builder = TreeBuilder::<JavaTypes>::new(NodeData::new("ExpressionStatement"));
        let root = builder.root();
        let invocation =
            builder.add_child(root, NodeData::new("MethodInvocation").with_role("expression"));
        let name = builder.add_child(
            invocation,
            NodeData::leaf("SimpleName", "log").with_role("name"),
        );
        let args = args
            .iter()
            .map(|&(kind, label)| {
                builder.add_child(invocation, NodeData::leaf(kind, label).with_role("arguments"))
            })
            .collect();
        (builder.build().unwrap(), invocation, name, args)
    }

    #[test]
    fn test_strict_pairs_identical_leaves_one_to_one() {
        let (src, s_call, _, s_args) = call(&[("SimpleName", "x"), ("SimpleName", "x")]);
        let (dst, d_call, _, d_args) = call(&[
            ("NumberLiteral", "1"),
            ("SimpleName", "x"),
            ("SimpleName", "x"),
        ]);

        let mut mapping = MappingStore::for_trees(&src, &dst);
        mapping.add(src.root(), dst.root());
        mapping.add(s_call, d_call);

        let overlay = TokenMatcher::new(TokenRecovery::Strict).recover(&src, &dst, &mut mapping);

        assert!(mapping.has(s_args[0], d_args[1]));
        assert!(mapping.has(s_args[1], d_args[2]));
        assert!(overlay.has(s_args[0], d_args[1]));
        assert!(!mapping.is_dst_mapped(d_args[0]));
        // Both `log` names are unmapped leaves too.
        assert_eq!(mapping.len(), 5);
    }

    #[test]
    fn test_unit_found_through_parent() {
        let (src, s_call, s_name, _) = call(&[("SimpleName", "x")]);
        let (dst, d_call, d_name, _) = call(&[("SimpleName", "y")]);

        let mut mapping = MappingStore::for_trees(&src, &dst);
        mapping.add(src.root(), dst.root());

        TokenMatcher::new(TokenRecovery::Strict).recover(&src, &dst, &mut mapping);

        assert!(!mapping.is_src_mapped(s_call), "units themselves are not mapped");
        assert!(!mapping.is_dst_mapped(d_call));
        assert!(mapping.has(s_name, d_name));
    }

    #[test]
    fn test_relaxed_pairs_by_type_in_overlay_only() {
        let (src, s_call, _, s_args) = call(&[("SimpleName", "x")]);
        let (dst, d_call, _, d_args) = call(&[("SimpleName", "y")]);

        let mut mapping = MappingStore::for_trees(&src, &dst);
        mapping.add(src.root(), dst.root());
        mapping.add(s_call, d_call);

        let overlay = TokenMatcher::new(TokenRecovery::Relaxed).recover(&src, &dst, &mut mapping);

        assert!(overlay.has(s_args[0], d_args[0]));
        assert!(!mapping.is_src_mapped(s_args[0]), "relaxed pairs stay in the overlay");
        // The mapped call itself is inside the destination scope.
        assert!(overlay.has(s_call, d_call));
    }

    /// ExpressionStatement -> MethodInvocation(log, ParenthesizedExpression(inner), outer)
    ///
    /// Returns `[invocation, log, parenthesized, inner, outer]`.
    fn wrapped(inner: &str, outer: &str) -> (Tree<JavaTypes>, [NodeId; 5]) {
        let mut builder = TreeBuilder::<JavaTypes>::new(NodeData::new("ExpressionStatement"));
        let root = builder.root();
        let invocation =
            builder.add_child(root, NodeData::new("MethodInvocation").with_role("expression"));
        let name = builder.add_child(
            invocation,
            NodeData::leaf("SimpleName", "log").with_role("name"),
        );
        let paren = builder.add_child(
            invocation,
            NodeData::new("ParenthesizedExpression").with_role("arguments"),
        );
        let inner = builder.add_child(
            paren,
            NodeData::leaf("SimpleName", inner).with_role("expression"),
        );
        let outer = builder.add_child(
            invocation,
            NodeData::leaf("SimpleName", outer).with_role("arguments"),
        );
        (builder.build().unwrap(), [invocation, name, paren, inner, outer])
    }

    /// `log((x), y)` against `log((y), x)`, every name mapped to its namesake.
    fn crossed() -> (Tree<JavaTypes>, Tree<JavaTypes>, MappingStore, [NodeId; 5], [NodeId; 5]) {
        let (src, s) = wrapped("x", "y");
        let (dst, d) = wrapped("y", "x");
        let mut mapping = MappingStore::for_trees(&src, &dst);
        mapping.add(src.root(), dst.root());
        for (&a, &b) in s.iter().zip(&d).take(3) {
            mapping.add(a, b);
        }
        mapping.add(s[3], d[4]);
        mapping.add(s[4], d[3]);
        (src, dst, mapping, s, d)
    }

    #[test]
    fn test_relaxed_assignment_takes_highest_score_first() {
        let (src, dst, mut mapping, s, d) = crossed();
        let [_, s_log, _, s_inner, s_outer] = s;
        let [_, d_log, _, d_inner, d_outer] = d;

        let strict = TokenMatcher::new(TokenRecovery::Strict).recover(&src, &dst, &mut mapping);
        assert!(strict.has(s_inner, d_outer));
        assert!(strict.has(s_outer, d_inner));

        let relaxed = TokenMatcher::new(TokenRecovery::Relaxed).recover(&src, &dst, &mut mapping);

        // `log` keeps its mapped partner: parents and pair both count.
        assert!(relaxed.has(s_log, d_log));
        // Each name goes to the leaf sitting under its parent's partner,
        // rather than to the namesake it is mapped to.
        assert!(relaxed.has(s_inner, d_inner));
        assert!(relaxed.has(s_outer, d_outer));
        assert!(!relaxed.has(s_inner, d_outer));
        // The mapping keeps every pair it had.
        assert!(mapping.has(s_inner, d_outer));
        assert!(mapping.has(s_outer, d_inner));
        assert_eq!(mapping.len(), 6);
    }

    #[test]
    fn test_relaxed_pairing_changes_overlay_suppression() {
        let (src, dst, mut mapping, s, d) = crossed();
        let script = generate_edit_script(&src, &dst, &mapping);
        assert_eq!(
            script.moves().copied().collect::<Vec<_>>(),
            [
                Action::Move {
                    src: s[4],
                    dst: d[3],
                    parent: d[2],
                    position: 0,
                    relabeled: false
                },
                Action::Move {
                    src: s[3],
                    dst: d[4],
                    parent: d[0],
                    position: 2,
                    relabeled: false
                },
            ]
        );

        let strict = TokenMatcher::new(TokenRecovery::Strict).recover(&src, &dst, &mut mapping);
        let mut strict_script = script.clone();
        assert_eq!(suppress_overlay_moves(&mut strict_script, &src, &strict), 2);
        assert_eq!(strict_script.moves().count(), 0);

        let relaxed = TokenMatcher::new(TokenRecovery::Relaxed).recover(&src, &dst, &mut mapping);
        let mut relaxed_script = script.clone();
        assert_eq!(suppress_overlay_moves(&mut relaxed_script, &src, &relaxed), 0);
        assert_eq!(relaxed_script, script);
    }

    #[test]
    fn test_off_does_nothing() {
        let (src, s_call, _, _) = call(&[("SimpleName", "x")]);
        let (dst, d_call, _, _) = call(&[("SimpleName", "x")]);
        let mut mapping = MappingStore::for_trees(&src, &dst);
        mapping.add(s_call, d_call);

        let overlay = TokenMatcher::new(TokenRecovery::Off).recover(&src, &dst, &mut mapping);
        assert!(overlay.is_empty());
        assert_eq!(mapping.len(), 1);
    }
}
