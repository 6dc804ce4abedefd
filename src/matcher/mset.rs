//! Match set types: the ranked result batch and its statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::DocId;
use crate::error::{KopisError, Result};

/// Statistics for one query term, reported alongside the match set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermInfo {
    /// Documents containing the term across the whole collection.
    pub term_freq: u64,
    /// The query-side weight the term contributed with.
    pub term_weight: f64,
}

/// One ranked result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MSetItem {
    /// Document id (remapped when searching a multi-database).
    pub doc_id: DocId,
    /// Relevance weight.
    pub weight: f64,
    /// Value of the collapse key this row was deduplicated on; empty when
    /// collapsing was off or the document carries no such key.
    pub collapse_key: Vec<u8>,
}

/// A ranked batch of matches with evaluation statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MSet {
    /// Result rows in rank order.
    pub items: Vec<MSetItem>,
    /// Rank of `items[0]` within the full ordering.
    pub first: usize,
    /// Lower bound on the number of matching documents: every candidate
    /// the collector considered after the match decider.
    pub mbound: u64,
    /// Greatest weight actually seen during collection.
    pub max_attained: f64,
    /// Greatest weight the query could possibly produce.
    pub max_possible: f64,
    term_info: BTreeMap<String, TermInfo>,
}

impl MSet {
    pub(crate) fn new(
        items: Vec<MSetItem>,
        first: usize,
        mbound: u64,
        max_attained: f64,
        max_possible: f64,
        term_info: BTreeMap<String, TermInfo>,
    ) -> Self {
        MSet {
            items,
            first,
            mbound,
            max_attained,
            max_possible,
            term_info,
        }
    }

    /// Collection frequency of a query term.
    ///
    /// Asking about a term that is not in the evaluated query is a
    /// [`KopisError::Range`] error.
    pub fn term_freq(&self, term: &str) -> Result<u64> {
        self.info(term).map(|i| i.term_freq)
    }

    /// The weight a query term contributed with.
    pub fn term_weight(&self, term: &str) -> Result<f64> {
        self.info(term).map(|i| i.term_weight)
    }

    fn info(&self, term: &str) -> Result<&TermInfo> {
        self.term_info.get(term).ok_or_else(|| {
            KopisError::range(format!("term `{term}` is not in the evaluated query"))
        })
    }

    /// Convert a weight to a percentage of the maximum possible weight.
    ///
    /// When the maximum possible weight is zero (pure-boolean queries)
    /// every weight converts to 100.
    pub fn convert_to_percent(&self, weight: f64) -> i32 {
        if self.max_possible <= 0.0 {
            return 100;
        }
        (weight * 100.0 / self.max_possible).clamp(0.0, 100.0) as i32
    }

    /// Percentage form of one result row's weight.
    pub fn item_percent(&self, item: &MSetItem) -> i32 {
        self.convert_to_percent(item.weight)
    }
}
