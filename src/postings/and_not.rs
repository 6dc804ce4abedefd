//! Set difference of two posting lists.

use crate::document::DocId;
use crate::error::Result;
use crate::postings::{next_or_replace, skip_or_replace, EmptyPostList, PostList};

/// Yields the left side's documents that the right side does not contain;
/// only the left side's weight counts.
#[derive(Debug)]
pub struct AndNotPostList {
    left: Box<dyn PostList>,
    right: Box<dyn PostList>,
    started: bool,
    ended: bool,
}

impl AndNotPostList {
    /// Combine two fresh subtrees.
    pub fn new(left: Box<dyn PostList>, right: Box<dyn PostList>) -> Self {
        AndNotPostList {
            left,
            right,
            started: false,
            ended: false,
        }
    }

    /// Move the left side to its next document absent from the right side.
    /// Once the right side exhausts, the left subtree is the whole answer
    /// and gets handed back as a replacement.
    fn scan(&mut self, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        loop {
            if self.left.at_end() {
                self.ended = true;
                return Ok(None);
            }
            let candidate = self.left.doc_id();
            skip_or_replace(&mut self.right, candidate, 0.0)?;
            if self.right.at_end() {
                let left = std::mem::replace(&mut self.left, Box::new(EmptyPostList::new()));
                return Ok(Some(left));
            }
            if self.right.doc_id() != candidate {
                return Ok(None);
            }
            next_or_replace(&mut self.left, min_weight)?;
        }
    }
}

impl PostList for AndNotPostList {
    fn termfreq_estimate(&self) -> u64 {
        self.left.termfreq_estimate()
    }

    fn max_weight(&self) -> f64 {
        self.left.max_weight()
    }

    fn recalc_max_weight(&mut self) -> f64 {
        self.left.recalc_max_weight()
    }

    fn doc_id(&self) -> DocId {
        self.left.doc_id()
    }

    fn weight(&self) -> f64 {
        self.left.weight()
    }

    fn at_end(&self) -> bool {
        self.ended
    }

    fn next(&mut self, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        if self.ended {
            return Ok(None);
        }
        self.started = true;
        next_or_replace(&mut self.left, min_weight)?;
        self.scan(min_weight)
    }

    fn skip_to(&mut self, target: DocId, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        if self.ended {
            return Ok(None);
        }
        if self.started && !self.left.at_end() && self.left.doc_id() >= target {
            return Ok(None);
        }
        self.started = true;
        skip_or_replace(&mut self.left, target, min_weight)?;
        self.scan(min_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postings::testutil::{drain, VecPostList};

    fn vec_list(entries: &[(DocId, f64)]) -> Box<dyn PostList> {
        Box::new(VecPostList::new(entries.to_vec()))
    }

    #[test]
    fn test_and_not_subtracts() {
        let list = AndNotPostList::new(
            vec_list(&[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]),
            vec_list(&[(2, 9.0), (4, 9.0), (6, 9.0)]),
        );
        assert_eq!(drain(Box::new(list)), vec![(1, 1.0), (3, 3.0)]);
    }

    #[test]
    fn test_and_not_decays_to_left_when_right_exhausts() {
        let mut list: Box<dyn PostList> = Box::new(AndNotPostList::new(
            vec_list(&[(1, 1.0), (5, 5.0), (9, 9.0)]),
            vec_list(&[(1, 9.0)]),
        ));
        next_or_replace(&mut list, 0.0).unwrap();
        assert_eq!((list.doc_id(), list.weight()), (5, 5.0));
        next_or_replace(&mut list, 0.0).unwrap();
        assert_eq!((list.doc_id(), list.weight()), (9, 9.0));
        next_or_replace(&mut list, 0.0).unwrap();
        assert!(list.at_end());
    }

    #[test]
    fn test_and_not_skip_to() {
        let mut list: Box<dyn PostList> = Box::new(AndNotPostList::new(
            vec_list(&[(1, 1.0), (3, 3.0), (5, 5.0), (7, 7.0)]),
            vec_list(&[(3, 9.0), (8, 9.0)]),
        ));
        skip_or_replace(&mut list, 3, 0.0).unwrap();
        // Doc 3 is excluded, so the skip settles on 5.
        assert_eq!(list.doc_id(), 5);
    }

    #[test]
    fn test_and_not_weight_ignores_right() {
        let list = AndNotPostList::new(vec_list(&[(1, 1.5)]), vec_list(&[(2, 9.0)]));
        assert_eq!(list.max_weight(), 1.5);
    }
}
