//! The diff result object and the top-level pipeline.

use indextree::NodeId;

use crate::config::MatchingConfig;
use crate::error::DiffError;
use crate::mapping::MappingStore;
use crate::matching::compute_matching;
use crate::script::{Action, EditScript, generate_edit_script};
use crate::suppress::{suppress_overlay_moves, suppress_symmetric_moves};
use crate::tree::{TableNode, Tree, TreeTypes};
use crate::debug;

/// How a node fared in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeChange {
    /// Mapped, same label, same place. Also covers rematched nodes.
    Unchanged,
    /// Mapped, label changed.
    Updated,
    /// Mapped, moved (and possibly relabeled).
    Moved,
    /// Source node without a partner.
    Deleted,
    /// Destination node without a partner.
    Inserted,
}

/// Two trees, their mapping and the post-processed edit script.
///
/// Immutable once computed.
#[derive(Debug)]
pub struct Diff<T: TreeTypes> {
    src: Tree<T>,
    dst: Tree<T>,
    mapping: MappingStore,
    overlay: MappingStore,
    script: EditScript,
}

impl<T: TreeTypes> Diff<T> {
    /// Diff two trees.
    ///
    /// Runs matching, edit script generation and move suppression in order.
    /// The configuration is validated first.
    pub fn compute(src: Tree<T>, dst: Tree<T>, config: &MatchingConfig) -> Result<Self, DiffError> {
        config.validate()?;

        let result = compute_matching(&src, &dst, config);
        let mut script = generate_edit_script(&src, &dst, &result.mapping);
        if config.overlay_suppression {
            suppress_overlay_moves(&mut script, &src, &result.overlay);
        }
        if config.suppress_moves {
            suppress_symmetric_moves(&mut script, &src, &dst, &result.mapping);
        }
        debug!(
            mapped = result.mapping.len(),
            actions = script.len(),
            "diff computed"
        );

        Ok(Self {
            src,
            dst,
            mapping: result.mapping,
            overlay: result.overlay,
            script,
        })
    }

    /// Build both trees from flat node tables, then diff them.
    ///
    /// A malformed table aborts the whole computation.
    pub fn from_tables(
        src: (Vec<TableNode<T>>, usize),
        dst: (Vec<TableNode<T>>, usize),
        config: &MatchingConfig,
    ) -> Result<Self, DiffError> {
        config.validate()?;
        let src = Tree::from_table(src.0, src.1)?;
        let dst = Tree::from_table(dst.0, dst.1)?;
        Self::compute(src, dst, config)
    }

    /// The source tree.
    pub fn src(&self) -> &Tree<T> {
        &self.src
    }

    /// The destination tree.
    pub fn dst(&self) -> &Tree<T> {
        &self.dst
    }

    /// The final node mapping.
    pub fn mapping(&self) -> &MappingStore {
        &self.mapping
    }

    /// Pairs recorded by token recovery.
    pub fn overlay(&self) -> &MappingStore {
        &self.overlay
    }

    /// The post-processed edit script.
    pub fn script(&self) -> &EditScript {
        &self.script
    }

    /// The edit script reduced to subtree roots.
    pub fn simplified(&self) -> EditScript {
        self.script.simplified(&self.src, &self.dst)
    }

    /// Classify a source node.
    pub fn src_class(&self, node: NodeId) -> NodeChange {
        if !self.mapping.is_src_mapped(node) {
            return NodeChange::Deleted;
        }
        self.classify(|action| action.src() == Some(node))
    }

    /// Classify a destination node.
    pub fn dst_class(&self, node: NodeId) -> NodeChange {
        if !self.mapping.is_dst_mapped(node) {
            return NodeChange::Inserted;
        }
        self.classify(|action| action.dst() == Some(node))
    }

    fn classify(&self, addresses: impl Fn(&Action) -> bool) -> NodeChange {
        for action in self.script.iter() {
            if !addresses(action) {
                continue;
            }
            match action {
                Action::Move { .. } => return NodeChange::Moved,
                Action::Update { .. } => return NodeChange::Updated,
                _ => {}
            }
        }
        NodeChange::Unchanged
    }
}
