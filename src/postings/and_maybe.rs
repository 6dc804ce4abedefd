//! Opportunistic conjunction: the left side's documents, with the right
//! side's weight added when it happens to match.
//!
//! This node is never built from a query operator. It exists as the decay
//! target of OR under min-weight pressure: once one OR branch can no longer
//! satisfy the threshold on its own, the other branch becomes required and
//! the OR hands itself over to an `AndMaybePostList`.

use crate::document::DocId;
use crate::error::Result;
use crate::postings::{next_or_replace, skip_or_replace, AndPostList, PostList};

/// Left's documents; right contributes weight where it matches.
#[derive(Debug)]
pub struct AndMaybePostList {
    left: Box<dyn PostList>,
    right: Box<dyn PostList>,
    started: bool,
    pending_left: bool,
    ended: bool,
    lmax: f64,
    rmax: f64,
    static_max: f64,
}

impl AndMaybePostList {
    /// Adopt subtrees already positioned mid-stream. `pending_left` marks a
    /// left child sitting on a document the predecessor never emitted.
    pub(crate) fn from_parts(
        left: Box<dyn PostList>,
        right: Box<dyn PostList>,
        pending_left: bool,
    ) -> Self {
        let lmax = left.max_weight();
        let rmax = right.max_weight();
        AndMaybePostList {
            left,
            right,
            started: true,
            pending_left,
            ended: false,
            lmax,
            rmax,
            static_max: lmax + rmax,
        }
    }

    /// Sync the optional side, decaying to the bare left subtree once the
    /// optional side is exhausted.
    fn sync(&mut self) -> Result<Option<Box<dyn PostList>>> {
        if self.left.at_end() {
            self.ended = true;
            return Ok(None);
        }
        let target = self.left.doc_id();
        skip_or_replace(&mut self.right, target, 0.0)?;
        if self.right.at_end() {
            let left = std::mem::replace(&mut self.left, Box::new(super::EmptyPostList::new()));
            return Ok(Some(left));
        }
        Ok(None)
    }

    fn decay_to_and(&mut self, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        let left = std::mem::replace(&mut self.left, Box::new(super::EmptyPostList::new()));
        let right = std::mem::replace(&mut self.right, Box::new(super::EmptyPostList::new()));
        let mut replacement: Box<dyn PostList> =
            Box::new(AndPostList::from_parts(left, right, self.pending_left));
        if let Some(inner) = replacement.next(min_weight)? {
            replacement = inner;
        }
        Ok(Some(replacement))
    }
}

impl PostList for AndMaybePostList {
    fn termfreq_estimate(&self) -> u64 {
        self.left.termfreq_estimate()
    }

    fn max_weight(&self) -> f64 {
        self.static_max
    }

    fn recalc_max_weight(&mut self) -> f64 {
        self.lmax = self.left.recalc_max_weight();
        self.rmax = self.right.recalc_max_weight();
        self.lmax + self.rmax
    }

    fn doc_id(&self) -> DocId {
        self.left.doc_id()
    }

    fn weight(&self) -> f64 {
        let doc = self.left.doc_id();
        let mut weight = self.left.weight();
        if !self.right.at_end() && self.right.doc_id() == doc {
            weight += self.right.weight();
        }
        weight
    }

    fn at_end(&self) -> bool {
        self.ended
    }

    fn next(&mut self, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        if self.ended {
            return Ok(None);
        }
        if self.started && min_weight > self.lmax {
            return self.decay_to_and(min_weight);
        }
        if !self.started {
            self.started = true;
            next_or_replace(&mut self.left, min_weight - self.rmax)?;
        } else if self.pending_left {
            self.pending_left = false;
        } else {
            next_or_replace(&mut self.left, min_weight - self.rmax)?;
        }
        self.sync()
    }

    fn skip_to(&mut self, target: DocId, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        if self.ended {
            return Ok(None);
        }
        if self.started && !self.left.at_end() && self.left.doc_id() >= target {
            return Ok(None);
        }
        self.started = true;
        self.pending_left = false;
        skip_or_replace(&mut self.left, target, min_weight - self.rmax)?;
        self.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postings::testutil::{drain, VecPostList};

    fn positioned(entries: &[(DocId, f64)]) -> Box<dyn PostList> {
        let mut list: Box<dyn PostList> = Box::new(VecPostList::new(entries.to_vec()));
        next_or_replace(&mut list, 0.0).unwrap();
        list
    }

    #[test]
    fn test_left_documents_with_optional_weight() {
        let left = positioned(&[(1, 1.0), (3, 1.0), (5, 1.0)]);
        let right = positioned(&[(3, 2.0), (4, 2.0)]);
        // Both children sit on unemitted documents.
        let list = AndMaybePostList::from_parts(left, right, true);
        assert_eq!(drain(Box::new(list)), vec![(1, 1.0), (3, 3.0), (5, 1.0)]);
    }

    #[test]
    fn test_decays_to_left_when_right_exhausts() {
        let left = positioned(&[(1, 1.0), (9, 1.5)]);
        let right = positioned(&[(1, 2.0)]);
        let mut list: Box<dyn PostList> = Box::new(AndMaybePostList::from_parts(left, right, true));
        next_or_replace(&mut list, 0.0).unwrap();
        assert_eq!((list.doc_id(), list.weight()), (1, 3.0));
        next_or_replace(&mut list, 0.0).unwrap();
        // The replacement is the bare left subtree positioned at 9.
        assert_eq!((list.doc_id(), list.weight()), (9, 1.5));
    }

    #[test]
    fn test_decays_to_and_under_pressure() {
        let left = positioned(&[(1, 1.0), (3, 1.0), (5, 1.0)]);
        let right = positioned(&[(3, 2.0), (5, 2.0)]);
        let mut list: Box<dyn PostList> = Box::new(AndMaybePostList::from_parts(left, right, true));
        next_or_replace(&mut list, 0.0).unwrap();
        assert_eq!(list.doc_id(), 1);
        // A threshold above lmax forces both sides to match.
        next_or_replace(&mut list, 2.5).unwrap();
        assert_eq!((list.doc_id(), list.weight()), (3, 3.0));
        next_or_replace(&mut list, 2.5).unwrap();
        assert_eq!((list.doc_id(), list.weight()), (5, 3.0));
        next_or_replace(&mut list, 2.5).unwrap();
        assert!(list.at_end());
    }
}
