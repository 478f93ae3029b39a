//! GumTree node matching.
//!
//! Matching runs in phases that all write into one [`MappingStore`]:
//! 1. The roots are paired.
//! 2. [`TopDownMatcher`]: identical subtrees, largest first.
//! 3. [`BottomUpMatcher`]: ancestors of mapped nodes by Dice similarity, with
//!    last-chance recovery of their children.
//! 4. [`TokenMatcher`]: leaves inside aligned expressions, plus a disposable
//!    overlay used by move suppression.
//!
//! Each phase assumes the previous one has finished.

mod bottom_up;
mod token;
mod top_down;

pub use bottom_up::BottomUpMatcher;
pub use token::TokenMatcher;
pub use top_down::TopDownMatcher;

use crate::config::{MatchingConfig, TokenRecovery};
use crate::debug;
use crate::mapping::MappingStore;
use crate::tree::{Tree, TreeTypes};

/// A matching phase.
///
/// Matchers are composable: [`Matcher::extend_mapping`] only adds pairs to the
/// mapping it is given, so phases can be chained.
pub trait Matcher {
    /// Match two trees from scratch.
    fn match_trees<T: TreeTypes>(&self, src: &Tree<T>, dst: &Tree<T>) -> MappingStore {
        self.extend_mapping(src, dst, MappingStore::for_trees(src, dst))
    }

    /// Extend an existing mapping between two trees.
    fn extend_mapping<T: TreeTypes>(
        &self,
        src: &Tree<T>,
        dst: &Tree<T>,
        mapping: MappingStore,
    ) -> MappingStore;
}

/// Output of [`compute_matching`].
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// The primary node mapping.
    pub mapping: MappingStore,
    /// Pairs recorded by token recovery. Never used for edit script generation.
    pub overlay: MappingStore,
}

/// Compute the matching between two trees.
///
/// The configuration is assumed valid; see [`MatchingConfig::validate`].
pub fn compute_matching<T: TreeTypes>(
    src: &Tree<T>,
    dst: &Tree<T>,
    config: &MatchingConfig,
) -> MatchResult {
    debug!(src_nodes = src.len(), dst_nodes = dst.len(), "compute_matching start");

    let mut mapping = MappingStore::for_trees(src, dst);
    mapping.add(src.root(), dst.root());

    let mapping = TopDownMatcher::new(config.min_height).extend_mapping(src, dst, mapping);
    debug!(matched = mapping.len(), "after top-down");

    let mut mapping =
        BottomUpMatcher::new(config.similarity_threshold).extend_mapping(src, dst, mapping);
    debug!(matched = mapping.len(), "after bottom-up");

    let overlay = match config.token_recovery {
        TokenRecovery::Off => MappingStore::new(),
        mode => TokenMatcher::new(mode).recover(src, dst, &mut mapping),
    };
    debug!(
        matched = mapping.len(),
        overlay = overlay.len(),
        "after token recovery"
    );

    MatchResult { mapping, overlay }
}
