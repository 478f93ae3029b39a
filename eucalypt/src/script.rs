//! Edit script generation.
//!
//! Turns a finished node mapping into INSERT, DELETE, UPDATE and MOVE actions,
//! after Chawathe et al., "Change Detection in Hierarchically Structured
//! Information" (1996):
//! 1. UPDATE: mapped pairs whose labels differ and that stay in place
//! 2. INSERT: destination nodes without a partner, parents first
//! 3. MOVE: mapped pairs whose parent changed, or that fall outside the
//!    longest common subsequence of their siblings mapped under the same
//!    parent
//! 4. DELETE: source nodes without a partner, children first
//!
//! Every node ends up in at most one action.

use indextree::NodeId;
use rapidhash::RapidHashSet as HashSet;

use crate::debug;
use crate::mapping::MappingStore;
use crate::sequence::longest_common_subsequence;
use crate::tree::{Tree, TreeTypes};

/// An edit action over a source and a destination tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// A destination node with no source counterpart.
    Insert {
        /// The new node in the destination tree
        dst: NodeId,
        /// Its parent in the destination tree
        parent: NodeId,
        /// Position among siblings (0-indexed)
        position: usize,
    },

    /// A source node with no destination counterpart.
    Delete {
        /// The removed node in the source tree
        src: NodeId,
    },

    /// A mapped pair whose labels differ.
    Update {
        /// The node in the source tree
        src: NodeId,
        /// Its partner in the destination tree
        dst: NodeId,
    },

    /// A mapped pair whose position in the tree changed.
    Move {
        /// The node in the source tree
        src: NodeId,
        /// Its partner in the destination tree
        dst: NodeId,
        /// New parent in the destination tree
        parent: NodeId,
        /// New position among siblings
        position: usize,
        /// The labels differ as well.
        relabeled: bool,
    },

    /// Re-asserts a mapped pair without showing it as a change.
    ///
    /// Emitted in place of a Move that was judged cosmetic.
    Rematch {
        /// The node in the source tree
        src: NodeId,
        /// Its partner in the destination tree
        dst: NodeId,
    },
}

impl Action {
    /// Stable name of the action kind.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Insert { .. } => "insert-node",
            Action::Delete { .. } => "delete-node",
            Action::Update { .. } => "update-node",
            Action::Move { .. } => "move-tree",
            Action::Rematch { .. } => "rematch-tree",
        }
    }

    /// Whether the action is meant to be shown. Only Rematch is not.
    pub fn is_visible(&self) -> bool {
        !matches!(self, Action::Rematch { .. })
    }

    /// The source node this action addresses, if any.
    pub fn src(&self) -> Option<NodeId> {
        match *self {
            Action::Insert { .. } => None,
            Action::Delete { src }
            | Action::Update { src, .. }
            | Action::Move { src, .. }
            | Action::Rematch { src, .. } => Some(src),
        }
    }

    /// The destination node this action addresses, if any.
    pub fn dst(&self) -> Option<NodeId> {
        match *self {
            Action::Delete { .. } => None,
            Action::Insert { dst, .. }
            | Action::Update { dst, .. }
            | Action::Move { dst, .. }
            | Action::Rematch { dst, .. } => Some(dst),
        }
    }
}

/// An ordered, editable sequence of actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditScript {
    actions: Vec<Action>,
}

impl EditScript {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action.
    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Keep only the actions matching the predicate, in order.
    pub fn retain(&mut self, f: impl FnMut(&Action) -> bool) {
        self.actions.retain(f);
    }

    /// The actions, in order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Iterate over the actions.
    pub fn iter(&self) -> core::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether there are no actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The Move actions, in order.
    pub fn moves(&self) -> impl Iterator<Item = &Action> + '_ {
        self.actions
            .iter()
            .filter(|a| matches!(a, Action::Move { .. }))
    }

    /// The Move action of a source node, if it has one.
    pub fn move_for(&self, src: NodeId) -> Option<&Action> {
        self.moves().find(|a| a.src() == Some(src))
    }

    /// Number of actions meant to be shown.
    pub fn visible_len(&self) -> usize {
        self.actions.iter().filter(|a| a.is_visible()).count()
    }

    /// A copy reduced to subtree roots.
    ///
    /// An insert whose parent is inserted too, a delete whose parent is
    /// deleted too, and a move whose destination parent is moved too are
    /// implied by that parent and dropped. Everything else is kept.
    pub fn simplified<T: TreeTypes>(&self, src: &Tree<T>, dst: &Tree<T>) -> EditScript {
        let mut inserted: HashSet<NodeId> = HashSet::default();
        let mut deleted: HashSet<NodeId> = HashSet::default();
        let mut moved: HashSet<NodeId> = HashSet::default();
        for action in &self.actions {
            match *action {
                Action::Insert { dst, .. } => {
                    inserted.insert(dst);
                }
                Action::Delete { src } => {
                    deleted.insert(src);
                }
                Action::Move { dst, .. } => {
                    moved.insert(dst);
                }
                Action::Update { .. } | Action::Rematch { .. } => {}
            }
        }

        let actions = self
            .actions
            .iter()
            .filter(|action| match **action {
                Action::Insert { parent, .. } => !inserted.contains(&parent),
                Action::Delete { src: node } => {
                    src.parent(node).is_none_or(|p| !deleted.contains(&p))
                }
                Action::Move { dst: node, .. } => {
                    dst.parent(node).is_none_or(|p| !moved.contains(&p))
                }
                Action::Update { .. } | Action::Rematch { .. } => true,
            })
            .copied()
            .collect();
        EditScript { actions }
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a Action;
    type IntoIter = core::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl IntoIterator for EditScript {
    type Item = Action;
    type IntoIter = alloc::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

impl FromIterator<Action> for EditScript {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        EditScript {
            actions: iter.into_iter().collect(),
        }
    }
}

/// Mapped destination nodes that changed place.
///
/// A node moved when its parent is not the partner of its source node's
/// parent. Within each mapped parent pair, the children mapped across the two
/// parents are aligned by longest common subsequence, and the ones left out
/// of the alignment moved.
fn moved_nodes<T: TreeTypes>(
    src: &Tree<T>,
    dst: &Tree<T>,
    mapping: &MappingStore,
) -> HashSet<NodeId> {
    let mut moved: HashSet<NodeId> = HashSet::default();
    for &d in dst.pre_order() {
        let Some(s) = mapping.get_src(d) else {
            continue;
        };
        if let (Some(src_parent), Some(dst_parent)) = (src.parent(s), dst.parent(d))
            && !mapping.has(src_parent, dst_parent)
        {
            moved.insert(d);
        }

        let src_children: Vec<NodeId> = src
            .children(s)
            .filter(|&c| mapping.get_dst(c).is_some_and(|m| dst.parent(m) == Some(d)))
            .collect();
        let dst_children: Vec<NodeId> = dst
            .children(d)
            .filter(|&c| mapping.get_src(c).is_some_and(|m| src.parent(m) == Some(s)))
            .collect();
        if src_children.len() < 2 {
            continue;
        }

        let aligned = longest_common_subsequence(&src_children, &dst_children, |&a, &b| {
            mapping.has(a, b)
        });
        let mut in_order = vec![false; dst_children.len()];
        for (_, j) in aligned {
            in_order[j] = true;
        }
        for (&c, kept) in dst_children.iter().zip(in_order) {
            if !kept {
                moved.insert(c);
            }
        }
    }
    moved
}

/// Generate an edit script from a mapping between two trees.
pub fn generate_edit_script<T: TreeTypes>(
    src: &Tree<T>,
    dst: &Tree<T>,
    mapping: &MappingStore,
) -> EditScript {
    debug!(matched_pairs = mapping.len(), "generate_edit_script start");
    let mut script = EditScript::new();

    let moved = moved_nodes(src, dst, mapping);

    // UPDATE
    for &d in dst.pre_order() {
        if let Some(s) = mapping.get_src(d)
            && !moved.contains(&d)
            && src.label(s) != dst.label(d)
        {
            script.push(Action::Update { src: s, dst: d });
        }
    }

    // INSERT, parents before children
    for &d in dst.pre_order() {
        if mapping.is_dst_mapped(d) {
            continue;
        }
        // The roots are always mapped by the matchers.
        if let Some(parent) = dst.parent(d) {
            script.push(Action::Insert {
                dst: d,
                parent,
                position: dst.position(d),
            });
        }
    }

    // MOVE
    for &d in dst.pre_order() {
        if !moved.contains(&d) {
            continue;
        }
        let (Some(s), Some(parent)) = (mapping.get_src(d), dst.parent(d)) else {
            continue;
        };
        script.push(Action::Move {
            src: s,
            dst: d,
            parent,
            position: dst.position(d),
            relabeled: src.label(s) != dst.label(d),
        });
    }

    // DELETE, children before parents
    for &s in src.post_order() {
        if !mapping.is_src_mapped(s) && !src.is_root(s) {
            script.push(Action::Delete { src: s });
        }
    }

    debug!(actions = script.len(), moves = moved.len(), "generate_edit_script done");
    script
}
