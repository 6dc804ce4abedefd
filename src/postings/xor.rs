//! Symmetric difference of two posting lists.

use crate::document::DocId;
use crate::error::Result;
use crate::postings::{next_or_replace, skip_or_replace, EmptyPostList, PostList};

/// Yields documents present in exactly one side, with that side's weight.
#[derive(Debug)]
pub struct XorPostList {
    left: Box<dyn PostList>,
    right: Box<dyn PostList>,
    started: bool,
    ended: bool,
}

impl XorPostList {
    /// Combine two fresh subtrees.
    pub fn new(left: Box<dyn PostList>, right: Box<dyn PostList>) -> Self {
        XorPostList {
            left,
            right,
            started: false,
            ended: false,
        }
    }

    /// Step past any document both sides share, then collapse onto a
    /// surviving side or report the end.
    fn settle(&mut self, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        loop {
            match (self.left.at_end(), self.right.at_end()) {
                (true, true) => {
                    self.ended = true;
                    return Ok(None);
                }
                (true, false) => {
                    let right =
                        std::mem::replace(&mut self.right, Box::new(EmptyPostList::new()));
                    return Ok(Some(right));
                }
                (false, true) => {
                    let left = std::mem::replace(&mut self.left, Box::new(EmptyPostList::new()));
                    return Ok(Some(left));
                }
                (false, false) => {
                    let lhead = self.left.doc_id();
                    let rhead = self.right.doc_id();
                    if lhead != rhead {
                        return Ok(None);
                    }
                    next_or_replace(&mut self.left, min_weight)?;
                    next_or_replace(&mut self.right, min_weight)?;
                }
            }
        }
    }
}

impl PostList for XorPostList {
    fn termfreq_estimate(&self) -> u64 {
        self.left.termfreq_estimate() + self.right.termfreq_estimate()
    }

    fn max_weight(&self) -> f64 {
        self.left.max_weight().max(self.right.max_weight())
    }

    fn recalc_max_weight(&mut self) -> f64 {
        self.left
            .recalc_max_weight()
            .max(self.right.recalc_max_weight())
    }

    fn doc_id(&self) -> DocId {
        self.left.doc_id().min(self.right.doc_id())
    }

    fn weight(&self) -> f64 {
        if self.left.doc_id() < self.right.doc_id() {
            self.left.weight()
        } else {
            self.right.weight()
        }
    }

    fn at_end(&self) -> bool {
        self.ended
    }

    fn next(&mut self, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        if self.ended {
            return Ok(None);
        }
        if !self.started {
            self.started = true;
            next_or_replace(&mut self.left, min_weight)?;
            next_or_replace(&mut self.right, min_weight)?;
        } else if self.left.doc_id() < self.right.doc_id() {
            next_or_replace(&mut self.left, min_weight)?;
        } else {
            next_or_replace(&mut self.right, min_weight)?;
        }
        self.settle(min_weight)
    }

    fn skip_to(&mut self, target: DocId, min_weight: f64) -> Result<Option<Box<dyn PostList>>> {
        if self.ended {
            return Ok(None);
        }
        if self.started && self.doc_id() >= target {
            return Ok(None);
        }
        self.started = true;
        skip_or_replace(&mut self.left, target, min_weight)?;
        skip_or_replace(&mut self.right, target, min_weight)?;
        self.settle(min_weight)
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
    fn test_xor_emits_exclusive_docs() {
        let list = XorPostList::new(
            vec_list(&[(1, 1.0), (2, 2.0), (4, 4.0)]),
            vec_list(&[(2, 0.5), (3, 0.5)]),
        );
        assert_eq!(drain(Box::new(list)), vec![(1, 1.0), (3, 0.5), (4, 4.0)]);
    }

    #[test]
    fn test_xor_of_identical_sides_is_empty() {
        let entries = &[(1, 1.0), (5, 1.0)][..];
        let list = XorPostList::new(vec_list(entries), vec_list(entries));
        assert_eq!(drain(Box::new(list)), vec![]);
    }

    #[test]
    fn test_xor_skip_to_lands_past_shared_doc() {
        let mut list: Box<dyn PostList> = Box::new(XorPostList::new(
            vec_list(&[(3, 1.0), (6, 1.0)]),
            vec_list(&[(3, 0.5), (7, 0.5)]),
        ));
        skip_or_replace(&mut list, 2, 0.0).unwrap();
        // Doc 3 is on both sides, so the first yield is 6.
        assert_eq!(list.doc_id(), 6);
    }
}
