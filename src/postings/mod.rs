//! The posting-list iterator algebra.
//!
//! A query is evaluated by a tree of lazy [`PostList`] nodes over
//! (doc-id, weight) pairs. Every node carries a static upper bound on the
//! weight it can yield, advancement takes the caller's current minimum
//! useful weight so subtrees can prune, and `next`/`skip_to` may hand back
//! a replacement node: an operator that has become degenerate (an OR with
//! an exhausted branch, say) collapses into a cheaper equivalent and the
//! caller re-parents.

pub mod and;
pub mod and_maybe;
pub mod and_not;
pub mod empty;
pub mod filter;
pub mod leaf;
pub mod near;
pub mod or;
pub mod xor;

use std::fmt::Debug;

use crate::document::{DocId, TermPos};
use crate::error::Result;

pub use and::AndPostList;
pub use and_maybe::AndMaybePostList;
pub use and_not::AndNotPostList;
pub use empty::EmptyPostList;
pub use filter::FilterPostList;
pub use leaf::LeafPostList;
pub use near::PositionalPostList;
pub use or::OrPostList;
pub use xor::XorPostList;

/// One node of the posting-list tree.
///
/// A fresh node is not yet positioned; the first `next` or `skip_to` moves
/// it to its first document. Successive documents are strictly increasing
/// and `at_end` is sticky. The `min_weight` argument is a pruning hint:
/// documents whose weight falls below it may be skipped, but callers must
/// still check the weights of what comes back.
pub trait PostList: Send + Debug {
    /// Estimate of the number of documents this node will yield.
    fn termfreq_estimate(&self) -> u64;

    /// Static upper bound on the weight of any yielded posting.
    fn max_weight(&self) -> f64;

    /// Recompute a current (possibly tighter) upper bound. Never increases
    /// across successive calls.
    fn recalc_max_weight(&mut self) -> f64;

    /// Current document id. Only meaningful while positioned.
    fn doc_id(&self) -> DocId;

    /// Weight of the current document.
    fn weight(&self) -> f64;

    /// Whether the node has yielded its last document.
    fn at_end(&self) -> bool;

    /// Advance to the next document. A `Some` return is a replacement node
    /// the caller must adopt in this node's place; it is already positioned.
    fn next(&mut self, min_weight: f64) -> Result<Option<Box<dyn PostList>>>;

    /// Advance to the first document with id >= `target`; a target at or
    /// behind the current position is a no-op. Replacement semantics as
    /// [`next`].
    ///
    /// [`next`]: PostList::next
    fn skip_to(&mut self, target: DocId, min_weight: f64) -> Result<Option<Box<dyn PostList>>>;

    /// Sorted positions of the current document, for positional leaves.
    fn positions(&self) -> Option<&[TermPos]> {
        None
    }
}

/// Advance a node, adopting any replacement it hands back.
pub fn next_or_replace(list: &mut Box<dyn PostList>, min_weight: f64) -> Result<()> {
    if let Some(replacement) = list.next(min_weight)? {
        *list = replacement;
    }
    Ok(())
}

/// Skip a node forward, adopting any replacement it hands back.
pub fn skip_or_replace(
    list: &mut Box<dyn PostList>,
    target: DocId,
    min_weight: f64,
) -> Result<()> {
    if let Some(replacement) = list.skip_to(target, min_weight)? {
        *list = replacement;
    }
    Ok(())
}
