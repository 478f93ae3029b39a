//! # Eucalypt
//!
//! GumTree-style syntax tree diffing with move suppression.
//!
//! Named after the eucalypts, the gum trees GumTree takes its name from.
//!
//! ## Algorithm Overview
//!
//! Eucalypt computes a mapping between the nodes of two syntax trees and turns
//! it into an edit script:
//!
//! 1. **Top-down matching**: identical subtrees, tallest first
//!    (GumTree, Falleri et al., ASE 2014)
//! 2. **Bottom-up matching**: ancestors of mapped nodes by Dice similarity,
//!    with last-chance recovery of their children (isomorphic LCS,
//!    isostructural LCS, unique-type histogram)
//! 3. **Token recovery**: leaf pairs inside aligned expressions
//! 4. **Edit script generation**: INSERT, DELETE, UPDATE and MOVE actions
//!    (Chawathe et al., 1996)
//! 5. **Move suppression**: moves that only reflect a symmetric rewrite, such
//!    as swapped conditional branches or swapped commutative operands, become
//!    invisible REMATCH actions
//!
//! ## Usage
//!
//! ```
//! use eucalypt::{Action, JavaTypes, MatchingConfig, NodeData, TreeBuilder, diff_trees};
//!
//! let build = |name: &str| {
//!     let mut builder = TreeBuilder::<JavaTypes>::new(NodeData::new("ExpressionStatement"));
//!     let root = builder.root();
//!     builder.add_child(root, NodeData::leaf("SimpleName", name).with_role("expression"));
//!     builder.build()
//! };
//!
//! let diff = diff_trees(build("before")?, build("after")?, &MatchingConfig::default())?;
//! assert!(matches!(diff.script().actions(), [Action::Update { .. }]));
//! # Ok::<(), eucalypt::DiffError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]

extern crate alloc;

pub use indextree;

mod tracing_macros;

/// Node-type catalogs
pub mod catalog;
/// Matcher configuration
pub mod config;
mod diff;
mod error;
/// Node mapping store
pub mod mapping;
/// GumTree matching phases
pub mod matching;
/// Edit actions and script generation
pub mod script;
/// Generalized LCS and subtree equivalence
pub mod sequence;
/// Similarity metrics
pub mod similarity;
/// Move suppression
pub mod suppress;
/// Tree representation
pub mod tree;

pub use catalog::{JavaTypes, SimpleTypes};
pub use config::{MatchingConfig, TokenRecovery};
pub use diff::{Diff, NodeChange};
pub use error::{ConfigError, DiffError, TreeError};
pub use mapping::MappingStore;
pub use matching::{
    BottomUpMatcher, MatchResult, Matcher, TokenMatcher, TopDownMatcher, compute_matching,
};
pub use script::{Action, EditScript, generate_edit_script};
pub use tree::{KindClass, NodeData, RoleClass, TableNode, Tree, TreeBuilder, TreeTypes};

/// Diff two trees.
///
/// This is the main entry point. It:
/// 1. Validates the configuration
/// 2. Computes a matching between nodes (top-down, bottom-up, token recovery)
/// 3. Generates an edit script from the matching
/// 4. Suppresses symmetric moves
///
/// Unmatched nodes are not an error: they show up as inserts and deletes.
pub fn diff_trees<T: TreeTypes>(
    src: Tree<T>,
    dst: Tree<T>,
    config: &MatchingConfig,
) -> Result<Diff<T>, DiffError> {
    Diff::compute(src, dst, config)
}
