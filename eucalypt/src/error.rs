//! Error types.

use alloc::string::String;
use core::fmt;

/// A tree handed to the engine is not a well-formed ordered tree.
///
/// Node positions are indices into the flat table for [`Tree::from_table`],
/// and pre-order indices for [`TreeBuilder::build`].
///
/// [`Tree::from_table`]: crate::Tree::from_table
/// [`TreeBuilder::build`]: crate::TreeBuilder::build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The node table has no entries.
    EmptyTable,
    /// The root index is outside the node table.
    InvalidRoot {
        /// The requested root.
        root: usize,
        /// Size of the table.
        len: usize,
    },
    /// A child index is outside the node table.
    DanglingChild {
        /// The parent listing the child.
        node: usize,
        /// The missing child index.
        child: usize,
    },
    /// A node is listed as the child of more than one parent.
    MultipleParents {
        /// The shared node.
        node: usize,
    },
    /// A node is its own ancestor.
    Cycle {
        /// A node on the cycle.
        node: usize,
    },
    /// A node cannot be reached from the root.
    UnreachableNode {
        /// The detached node.
        node: usize,
    },
    /// A node's declared child count differs from its actual children.
    ChildCountMismatch {
        /// The offending node.
        node: usize,
        /// Declared child count.
        declared: usize,
        /// Actual child count.
        actual: usize,
    },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::EmptyTable => write!(f, "node table is empty"),
            TreeError::InvalidRoot { root, len } => {
                write!(f, "root index {root} is out of range for {len} nodes")
            }
            TreeError::DanglingChild { node, child } => {
                write!(f, "node {node} lists missing child {child}")
            }
            TreeError::MultipleParents { node } => {
                write!(f, "node {node} has more than one parent")
            }
            TreeError::Cycle { node } => write!(f, "node {node} is its own ancestor"),
            TreeError::UnreachableNode { node } => {
                write!(f, "node {node} is not reachable from the root")
            }
            TreeError::ChildCountMismatch {
                node,
                declared,
                actual,
            } => write!(
                f,
                "node {node} declares {declared} children but has {actual}"
            ),
        }
    }
}

impl core::error::Error for TreeError {}

/// An option passed to the matcher configuration is unknown or invalid.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The option key is not recognized.
    UnknownOption {
        /// The key as given.
        key: String,
        /// The closest known key, if one is close enough.
        suggestion: Option<&'static str>,
    },
    /// The value cannot be parsed for this option.
    InvalidValue {
        /// The option key.
        key: &'static str,
        /// The value as given.
        value: String,
        /// What the option accepts.
        expected: &'static str,
    },
    /// The value parses but lies outside the accepted range.
    OutOfRange {
        /// The option key.
        key: &'static str,
        /// The value as given.
        value: String,
        /// The accepted range.
        range: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownOption { key, suggestion } => {
                write!(f, "unknown option `{key}`")?;
                if let Some(suggestion) = suggestion {
                    write!(f, " (did you mean `{suggestion}`?)")?;
                }
                Ok(())
            }
            ConfigError::InvalidValue {
                key,
                value,
                expected,
            } => write!(f, "invalid value `{value}` for `{key}`, expected {expected}"),
            ConfigError::OutOfRange { key, value, range } => {
                write!(f, "value `{value}` for `{key}` is out of range {range}")
            }
        }
    }
}

impl core::error::Error for ConfigError {}

/// Error returned by the top-level diff computation.
///
/// Failing to map a node is not an error: unrelated subtrees simply end up as
/// deletions and insertions.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffError {
    /// One of the input trees is malformed.
    MalformedTree(TreeError),
    /// The configuration was rejected before matching started.
    Config(ConfigError),
}

impl fmt::Display for DiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffError::MalformedTree(err) => write!(f, "malformed tree: {err}"),
            DiffError::Config(err) => write!(f, "invalid configuration: {err}"),
        }
    }
}

impl core::error::Error for DiffError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            DiffError::MalformedTree(err) => Some(err),
            DiffError::Config(err) => Some(err),
        }
    }
}

impl From<TreeError> for DiffError {
    fn from(err: TreeError) -> Self {
        DiffError::MalformedTree(err)
    }
}

impl From<ConfigError> for DiffError {
    fn from(err: ConfigError) -> Self {
        DiffError::Config(err)
    }
}
