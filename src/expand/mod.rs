//! The relevance-feedback expand engine.
//!
//! Given a set of judged-relevant documents, walks their term lists,
//! accumulates per-term relevance statistics, and ranks candidate expansion
//! terms with the Robertson/Sparck Jones weight.

use std::collections::HashSet;

use ahash::AHashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::backend::Database;
use crate::enquire::RSet;
use crate::error::Result;
use crate::query::Query;
use crate::settings::ExpandOptions;
use crate::weight::expand_weight;

/// Filters candidate terms by name before they are scored.
pub trait ExpandDecider: Send + Sync {
    /// Whether the term may appear in the expand set.
    fn accept(&self, term: &str) -> bool;
}

/// One expansion candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ESetItem {
    /// Candidate term name.
    pub term: String,
    /// Expansion weight.
    pub weight: f64,
}

/// Ranked expansion candidates, heaviest first; equal weights order by
/// ascending term name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ESet {
    /// Ranked candidates.
    pub items: Vec<ESetItem>,
}

#[derive(Default)]
struct TermAccumulator {
    /// Relevant documents containing the term (r).
    rel_count: u64,
    /// Sum of component-local term frequencies over the components that
    /// contributed the term through a relevant document.
    approx_term_freq: u64,
    seen_subs: Vec<usize>,
}

/// Produces expand sets for one backend snapshot.
pub struct ExpandEngine<'a> {
    db: &'a dyn Database,
    options: &'a ExpandOptions,
    decider: Option<&'a dyn ExpandDecider>,
}

impl<'a> ExpandEngine<'a> {
    /// Create an engine for one expansion.
    pub fn new(
        db: &'a dyn Database,
        options: &'a ExpandOptions,
        decider: Option<&'a dyn ExpandDecider>,
    ) -> Self {
        ExpandEngine {
            db,
            options,
            decider,
        }
    }

    /// Rank up to `max_items` expansion candidates from the relevance set.
    ///
    /// When `query` is given and `expand_use_query_terms` is off, terms
    /// already in the query are removed from the output.
    pub fn expand(&self, max_items: usize, rset: &RSet, query: Option<&Query>) -> Result<ESet> {
        let excluded: HashSet<String> = if self.options.use_query_terms {
            HashSet::new()
        } else {
            query.map(|q| q.terms().into_iter().collect()).unwrap_or_default()
        };

        let mut accumulators: AHashMap<String, TermAccumulator> = AHashMap::new();
        for doc in rset.iter() {
            let sub = self.db.sub_db_of(doc);
            let mut terms = self.db.term_list(doc)?;
            while terms.advance()? {
                let name = terms.term();
                if excluded.contains(name) {
                    continue;
                }
                if let Some(decider) = self.decider {
                    if !decider.accept(name) {
                        continue;
                    }
                }
                let entry = accumulators.entry(name.to_string()).or_default();
                entry.rel_count += 1;
                if !entry.seen_subs.contains(&sub) {
                    entry.seen_subs.push(sub);
                    entry.approx_term_freq += terms.term_freq();
                }
            }
        }
        debug!("expand accumulated {} candidate terms", accumulators.len());

        let doc_count = self.db.doc_count();
        let rset_size = rset.len() as u64;
        let mut items: Vec<ESetItem> = accumulators
            .into_iter()
            .map(|(term, accum)| {
                let term_freq = if self.options.use_exact_termfreq {
                    self.db.term_freq(&term)
                } else {
                    accum.approx_term_freq
                };
                let weight = expand_weight(accum.rel_count, rset_size, term_freq, doc_count);
                ESetItem { term, weight }
            })
            .collect();

        items.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then_with(|| a.term.cmp(&b.term))
        });
        items.truncate(max_items);
        Ok(ESet { items })
    }
}
