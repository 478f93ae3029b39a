//! Tree representation for diffing.
//!
//! Uses `indextree` as the arena backend. A [`Tree`] is produced once by
//! [`TreeBuilder::build`] or [`Tree::from_table`] and never changes afterwards:
//! building precomputes traversal orders, subtree sizes, heights and the two
//! subtree hashes (type+label and type-only) that the matchers rely on.

use core::fmt::Debug;
use core::hash::{Hash, Hasher};
use std::hash::DefaultHasher;

use indextree::{Arena, NodeId};

use crate::error::TreeError;

bitflags::bitflags! {
    /// Syntactic categories of a node type.
    ///
    /// Resolved once per node when the node is created, through
    /// [`TreeTypes::kind_class`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct KindClass: u8 {
        /// Expression-like node, a match unit for token recovery.
        const EXPRESSION = 1 << 0;
        /// Small node that is not an expression but is still recovered as a unit.
        const SMALL = 1 << 1;
        /// Big container (declaration, statement, block).
        const CONTAINER = 1 << 2;
        /// Conditional statement that may chain through its alternative branch.
        const CONDITIONAL = 1 << 3;
        /// Expression whose operand slots are interchangeable.
        const COMMUTATIVE = 1 << 4;

        /// Categories that start a token recovery unit.
        const TOKEN_UNIT = Self::EXPRESSION.bits() | Self::SMALL.bits();
    }
}

bitflags::bitflags! {
    /// Classification of the role a node plays inside its parent.
    ///
    /// The `*_SLOT` bits name the category of child the parent expects in that
    /// role; at most one of them is set for a given role.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RoleClass: u8 {
        /// Consequence or alternative branch of a conditional.
        const BRANCH = 1 << 0;
        /// The alternative ("else") branch of a conditional.
        const ALTERNATIVE = 1 << 1;
        const STATEMENT_SLOT = 1 << 2;
        const EXPRESSION_SLOT = 1 << 3;
        const TYPE_SLOT = 1 << 4;
        const PATTERN_SLOT = 1 << 5;
        const NAME_SLOT = 1 << 6;

        /// Every slot bit.
        const SLOTS = Self::STATEMENT_SLOT.bits()
            | Self::EXPRESSION_SLOT.bits()
            | Self::TYPE_SLOT.bits()
            | Self::PATTERN_SLOT.bits()
            | Self::NAME_SLOT.bits();

        /// Slots whose occupants may be repositioned without a visible move.
        const ORDER_INSENSITIVE = Self::EXPRESSION_SLOT.bits()
            | Self::TYPE_SLOT.bits()
            | Self::PATTERN_SLOT.bits()
            | Self::NAME_SLOT.bits();
    }
}

impl RoleClass {
    /// The slot part of this class.
    pub fn slot(self) -> Self {
        self & Self::SLOTS
    }

    /// Whether the slot is one of the order-insensitive ones.
    pub fn is_order_insensitive(self) -> bool {
        self.intersects(Self::ORDER_INSENSITIVE)
    }
}

/// The node-type catalog of a family of trees.
///
/// Implementors pick the concrete kind, label and role types and classify
/// kinds and roles into the closed [`KindClass`] / [`RoleClass`] sets used by
/// the heuristics. Classification happens once, when a node is created.
pub trait TreeTypes: Debug + Clone {
    /// Node type tag.
    type Kind: Clone + Eq + Hash + Debug + Send + Sync;
    /// Literal text of leaf-like nodes.
    type Label: Clone + Eq + Hash + Debug + Send + Sync;
    /// Role of a node relative to its parent.
    type Role: Clone + Eq + Hash + Debug + Send + Sync;

    /// Categories of a node type.
    fn kind_class(_kind: &Self::Kind) -> KindClass {
        KindClass::empty()
    }

    /// Categories of a role.
    fn role_class(_role: &Self::Role) -> RoleClass {
        RoleClass::empty()
    }
}

/// Data stored in each tree node.
#[derive(Debug, Clone)]
pub struct NodeData<T: TreeTypes> {
    /// The type of this node. Only nodes of the same type are matched.
    pub kind: T::Kind,
    /// Literal value for leaf-like nodes, `None` for structural nodes.
    pub label: Option<T::Label>,
    /// Role of this node inside its parent.
    pub role: Option<T::Role>,
    /// Child count declared by the producer, checked when the tree is built.
    pub arity: Option<usize>,
    kind_class: KindClass,
    role_class: RoleClass,
}

impl<T: TreeTypes> NodeData<T> {
    /// Create a structural node of the given type.
    pub fn new(kind: T::Kind) -> Self {
        let kind_class = T::kind_class(&kind);
        Self {
            kind,
            label: None,
            role: None,
            arity: None,
            kind_class,
            role_class: RoleClass::empty(),
        }
    }

    /// Create a leaf-like node with a label.
    pub fn leaf(kind: T::Kind, label: impl Into<T::Label>) -> Self {
        Self::new(kind).with_label(label)
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<T::Label>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the role this node plays in its parent.
    pub fn with_role(mut self, role: T::Role) -> Self {
        self.role_class = T::role_class(&role);
        self.role = Some(role);
        self
    }

    /// Declare how many children this node must end up with.
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    /// Categories of this node's type.
    pub fn kind_class(&self) -> KindClass {
        self.kind_class
    }

    /// Categories of this node's role.
    pub fn role_class(&self) -> RoleClass {
        self.role_class
    }
}

/// Per-node facts computed at build time.
#[derive(Debug, Clone, Copy, Default)]
struct NodeInfo {
    pre: usize,
    post: usize,
    size: usize,
    height: usize,
    depth: usize,
    position: usize,
    iso_hash: u64,
    shape_hash: u64,
}

/// An immutable ordered tree of typed, labeled nodes.
#[derive(Debug)]
pub struct Tree<T: TreeTypes> {
    arena: Arena<NodeData<T>>,
    root: NodeId,
    info: Vec<NodeInfo>,
    pre_order: Vec<NodeId>,
    post_order: Vec<NodeId>,
}

impl<T: TreeTypes> Tree<T> {
    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.pre_order.len()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.pre_order.is_empty()
    }

    /// Get the data for a node.
    pub fn get(&self, id: NodeId) -> &NodeData<T> {
        self.arena.get(id).expect("invalid node id").get()
    }

    /// The node's type.
    pub fn kind(&self, id: NodeId) -> &T::Kind {
        &self.get(id).kind
    }

    /// The node's label, if any.
    pub fn label(&self, id: NodeId) -> Option<&T::Label> {
        self.get(id).label.as_ref()
    }

    /// The node's role in its parent, if any.
    pub fn role(&self, id: NodeId) -> Option<&T::Role> {
        self.get(id).role.as_ref()
    }

    /// Categories of the node's type.
    pub fn kind_class(&self, id: NodeId) -> KindClass {
        self.get(id).kind_class
    }

    /// Categories of the node's role.
    pub fn role_class(&self, id: NodeId) -> RoleClass {
        self.get(id).role_class
    }

    /// Get the parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|n| n.parent())
    }

    /// Get the children of a node.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Get the number of children of a node.
    pub fn child_count(&self, id: NodeId) -> usize {
        id.children(&self.arena).count()
    }

    /// Whether the node has no children.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.arena
            .get(id)
            .is_none_or(|n| n.first_child().is_none())
    }

    /// Whether the node is the root of this tree.
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    /// Get the position of a node among its siblings (0-indexed).
    pub fn position(&self, id: NodeId) -> usize {
        self.info(id).position
    }

    /// Number of nodes in the subtree rooted at `id`, the node included.
    pub fn size(&self, id: NodeId) -> usize {
        self.info(id).size
    }

    /// Height of the subtree rooted at `id`; a leaf has height 1.
    pub fn height(&self, id: NodeId) -> usize {
        self.info(id).height
    }

    /// Distance from the root; the root has depth 0.
    pub fn depth(&self, id: NodeId) -> usize {
        self.info(id).depth
    }

    /// Index of the node in pre-order.
    pub fn pre_index(&self, id: NodeId) -> usize {
        self.info(id).pre
    }

    /// Index of the node in post-order.
    pub fn post_index(&self, id: NodeId) -> usize {
        self.info(id).post
    }

    /// Hash of the node's type and label and of all its descendants.
    pub fn iso_hash(&self, id: NodeId) -> u64 {
        self.info(id).iso_hash
    }

    /// Hash of the node's type and of the types of all its descendants.
    pub fn shape_hash(&self, id: NodeId) -> u64 {
        self.info(id).shape_hash
    }

    /// All nodes in pre-order.
    pub fn pre_order(&self) -> &[NodeId] {
        &self.pre_order
    }

    /// All nodes in post-order (children before parents).
    pub fn post_order(&self) -> &[NodeId] {
        &self.post_order
    }

    /// The subtree rooted at `id` in pre-order, the node included.
    pub fn subtree(&self, id: NodeId) -> &[NodeId] {
        let info = self.info(id);
        &self.pre_order[info.pre..info.pre + info.size]
    }

    /// All descendants of `id` in pre-order, the node excluded.
    pub fn descendants(&self, id: NodeId) -> &[NodeId] {
        &self.subtree(id)[1..]
    }

    /// Whether `node` is a strict descendant of `ancestor`.
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let a = self.info(ancestor);
        let n = self.info(node).pre;
        a.pre < n && n < a.pre + a.size
    }

    /// Strict ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        core::iter::successors(self.parent(id), |&p| self.parent(p))
    }

    fn info(&self, id: NodeId) -> &NodeInfo {
        &self.info[usize::from(id)]
    }

    /// Build a tree from a flat node table.
    ///
    /// Each entry lists its children as indices into `nodes`. The table must
    /// describe a single tree rooted at `root`: every index in range, at most
    /// one parent per node, no cycles, every node reachable from the root.
    pub fn from_table(nodes: Vec<TableNode<T>>, root: usize) -> Result<Self, TreeError> {
        if nodes.is_empty() {
            return Err(TreeError::EmptyTable);
        }
        if root >= nodes.len() {
            return Err(TreeError::InvalidRoot {
                root,
                len: nodes.len(),
            });
        }

        let mut parent: Vec<Option<usize>> = vec![None; nodes.len()];
        for (idx, node) in nodes.iter().enumerate() {
            if let Some(declared) = node.data.arity
                && declared != node.children.len()
            {
                return Err(TreeError::ChildCountMismatch {
                    node: idx,
                    declared,
                    actual: node.children.len(),
                });
            }
            for &child in &node.children {
                if child >= nodes.len() {
                    return Err(TreeError::DanglingChild { node: idx, child });
                }
                if child == idx {
                    return Err(TreeError::Cycle { node: idx });
                }
                if parent[child].replace(idx).is_some() {
                    return Err(TreeError::MultipleParents { node: child });
                }
            }
        }
        if parent[root].is_some() {
            return Err(TreeError::Cycle { node: root });
        }

        // Single parents and a parentless root: whatever the root cannot reach
        // is either a detached tree or a cycle.
        let mut reached = vec![false; nodes.len()];
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            reached[idx] = true;
            stack.extend(nodes[idx].children.iter().copied());
        }
        if let Some(orphan) = reached.iter().position(|&r| !r) {
            let mut seen = vec![false; nodes.len()];
            let mut cursor = Some(orphan);
            while let Some(idx) = cursor {
                if seen[idx] {
                    return Err(TreeError::Cycle { node: idx });
                }
                seen[idx] = true;
                cursor = parent[idx];
            }
            return Err(TreeError::UnreachableNode { node: orphan });
        }

        let mut slots: Vec<Option<TableNode<T>>> = nodes.into_iter().map(Some).collect();
        let Some(root_node) = slots[root].take() else {
            return Err(TreeError::InvalidRoot {
                root,
                len: slots.len(),
            });
        };
        let mut builder = TreeBuilder::new(root_node.data);
        let mut pending: Vec<(NodeId, Vec<usize>)> = vec![(builder.root(), root_node.children)];
        while let Some((parent_id, children)) = pending.pop() {
            for child in children {
                let Some(node) = slots[child].take() else {
                    return Err(TreeError::MultipleParents { node: child });
                };
                let child_id = builder.add_child(parent_id, node.data);
                pending.push((child_id, node.children));
            }
        }
        builder.build()
    }
}

/// One entry of a flat node table, see [`Tree::from_table`].
#[derive(Debug, Clone)]
pub struct TableNode<T: TreeTypes> {
    /// The node itself.
    pub data: NodeData<T>,
    /// Indices of the children, in order.
    pub children: Vec<usize>,
}

impl<T: TreeTypes> TableNode<T> {
    /// Create a table entry.
    pub fn new(data: NodeData<T>, children: Vec<usize>) -> Self {
        Self { data, children }
    }
}

/// Append-only construction of a [`Tree`].
#[derive(Debug)]
pub struct TreeBuilder<T: TreeTypes> {
    arena: Arena<NodeData<T>>,
    root: NodeId,
}

impl<T: TreeTypes> TreeBuilder<T> {
    /// Create a builder holding a single root node.
    pub fn new(root_data: NodeData<T>) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(root_data);
        Self { arena, root }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Add a child node to a parent.
    pub fn add_child(&mut self, parent: NodeId, data: NodeData<T>) -> NodeId {
        let child = self.arena.new_node(data);
        parent.append(child, &mut self.arena);
        child
    }

    /// Freeze the tree, checking declared arities and computing per-node facts.
    pub fn build(self) -> Result<Tree<T>, TreeError> {
        let Self { arena, root } = self;

        let mut pre_order = Vec::with_capacity(arena.count());
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            pre_order.push(id);
            let children: Vec<NodeId> = id.children(&arena).collect();
            stack.extend(children.into_iter().rev());
        }

        let mut info = vec![NodeInfo::default(); arena.count() + 1];
        for (pre, &id) in pre_order.iter().enumerate() {
            let node = &arena[id];
            let depth = node.parent().map_or(0, |p| info[usize::from(p)].depth + 1);
            let position = id.preceding_siblings(&arena).count() - 1;
            let slot = &mut info[usize::from(id)];
            slot.pre = pre;
            slot.depth = depth;
            slot.position = position;

            let actual = id.children(&arena).count();
            if let Some(declared) = node.get().arity
                && declared != actual
            {
                return Err(TreeError::ChildCountMismatch {
                    node: pre,
                    declared,
                    actual,
                });
            }
        }

        // Reverse pre-order visits children before their parent.
        for &id in pre_order.iter().rev() {
            let data = arena[id].get();
            let mut iso = DefaultHasher::new();
            let mut shape = DefaultHasher::new();
            data.kind.hash(&mut iso);
            data.label.hash(&mut iso);
            data.kind.hash(&mut shape);

            let mut size = 1;
            let mut height = 0;
            let mut arity = 0usize;
            for child in id.children(&arena) {
                let c = &info[usize::from(child)];
                size += c.size;
                height = height.max(c.height);
                arity += 1;
                iso.write_u64(c.iso_hash);
                shape.write_u64(c.shape_hash);
            }
            iso.write_usize(arity);
            shape.write_usize(arity);

            let slot = &mut info[usize::from(id)];
            slot.size = size;
            slot.height = height + 1;
            slot.iso_hash = iso.finish();
            slot.shape_hash = shape.finish();
        }

        let mut post_order = Vec::with_capacity(pre_order.len());
        let mut stack: Vec<(NodeId, bool)> = vec![(root, false)];
        while let Some((id, children_visited)) = stack.pop() {
            if children_visited {
                info[usize::from(id)].post = post_order.len();
                post_order.push(id);
                continue;
            }
            stack.push((id, true));
            let children: Vec<NodeId> = id.children(&arena).collect();
            for child in children.into_iter().rev() {
                stack.push((child, false));
            }
        }

        Ok(Tree {
            arena,
            root,
            info,
            pre_order,
            post_order,
        })
    }
}
