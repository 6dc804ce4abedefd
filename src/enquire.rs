//! The query façade: set a query against a database handle, then ask for
//! match sets, expand sets and documents.

use std::collections::BTreeSet;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backend::Database;
use crate::document::{DocId, Document};
use crate::error::{KopisError, Result};
use crate::expand::{ESet, ExpandDecider, ExpandEngine};
use crate::matcher::{MSet, MSetItem, MatchCollector};
use crate::query::{Query, QueryPlanner};
use crate::settings::{ExpandOptions, MatchOptions, Settings};

/// Relevance judgements: the set of documents the caller marked relevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RSet {
    docs: BTreeSet<DocId>,
}

impl RSet {
    /// Create an empty relevance set.
    pub fn new() -> Self {
        RSet::default()
    }

    /// Mark a document relevant.
    pub fn add_document(&mut self, doc: DocId) {
        self.docs.insert(doc);
    }

    /// Whether a document is marked relevant.
    pub fn contains(&self, doc: DocId) -> bool {
        self.docs.contains(&doc)
    }

    /// Number of judged documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether no documents are judged.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Judged documents in increasing id order.
    pub fn iter(&self) -> impl Iterator<Item = DocId> + '_ {
        self.docs.iter().copied()
    }
}

/// Accepts or rejects candidate documents during match collection.
///
/// Deciders are plain predicates; they cannot fail.
pub trait MatchDecider: Send + Sync {
    /// Whether the document may enter the match set.
    fn accept(&self, doc: &Document) -> bool;
}

/// A prepared query session against one database handle.
pub struct Enquire {
    db: Arc<dyn Database>,
    query: Option<Query>,
}

impl Enquire {
    /// Create a session on a database handle.
    pub fn new(db: Arc<dyn Database>) -> Self {
        Enquire { db, query: None }
    }

    /// Set the query to evaluate. The query is snapshotted: mutating the
    /// caller's tree afterwards does not change what is evaluated.
    pub fn set_query(&mut self, query: &Query) {
        self.query = Some(query.clone());
    }

    /// The query currently set, if any.
    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    fn current_query(&self) -> Result<&Query> {
        match &self.query {
            Some(query) if !query.is_empty() => Ok(query),
            _ => Err(KopisError::invalid_argument(
                "no query set for this evaluation",
            )),
        }
    }

    /// Evaluate the query and return the result window
    /// `[first, first + max_items)`.
    pub fn get_mset(
        &self,
        first: usize,
        max_items: usize,
        rset: Option<&RSet>,
        settings: Option<&Settings>,
        decider: Option<&dyn MatchDecider>,
    ) -> Result<MSet> {
        let query = self.current_query()?;
        let options = match settings {
            Some(settings) => MatchOptions::from_settings(settings)?,
            None => MatchOptions::default(),
        };
        let rset = rset.filter(|r| !r.is_empty());
        let planner = QueryPlanner::new(self.db.as_ref(), rset, options.max_or_terms);
        let planned = planner.plan(query)?;
        MatchCollector::new(self.db.as_ref(), &options, decider).collect(planned, first, max_items)
    }

    /// Rank expansion terms from a relevance set.
    pub fn get_eset(
        &self,
        max_items: usize,
        rset: &RSet,
        settings: Option<&Settings>,
        decider: Option<&dyn ExpandDecider>,
    ) -> Result<ESet> {
        let options = match settings {
            Some(settings) => ExpandOptions::from_settings(settings)?,
            None => ExpandOptions::default(),
        };
        ExpandEngine::new(self.db.as_ref(), &options, decider).expand(
            max_items,
            rset,
            self.query.as_ref(),
        )
    }

    /// Fetch the document behind a result row.
    pub fn document(&self, item: &MSetItem) -> Result<Document> {
        self.db.document(item.doc_id)
    }

    /// The query's leaf terms occurring in a result row's document, in
    /// term-position order.
    pub fn matching_terms(&self, item: &MSetItem) -> Result<Vec<String>> {
        let query = self.current_query()?;
        let mut matching = Vec::new();
        for term in query.terms() {
            if let Some(mut cursor) = self.db.postings(&term)? {
                if cursor.skip_to(item.doc_id)? && cursor.doc_id() == item.doc_id {
                    matching.push(term);
                }
            }
        }
        Ok(matching)
    }
}

/// One query slot of a batch.
#[derive(Debug, Clone)]
pub struct QuerySlot {
    /// The query; an empty query marks the slot invalid without aborting
    /// the batch.
    pub query: Query,
    /// Rank of the first wanted result.
    pub first: usize,
    /// Maximum number of results.
    pub max_items: usize,
    /// Per-slot match options.
    pub settings: Option<Settings>,
}

impl QuerySlot {
    /// A slot with default options.
    pub fn new(query: Query, first: usize, max_items: usize) -> Self {
        QuerySlot {
            query,
            first,
            max_items,
            settings: None,
        }
    }

    /// Attach per-slot match options.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }
}

/// The outcome of one batch slot.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult(Option<MSet>);

impl BatchResult {
    /// Whether the slot's query was well-formed and evaluated.
    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    /// The slot's match set; indexing an invalid slot is a
    /// [`KopisError::InvalidResult`] error.
    pub fn value(&self) -> Result<&MSet> {
        self.0.as_ref().ok_or_else(|| {
            KopisError::invalid_result("this batch slot held a malformed query")
        })
    }
}

/// Evaluates a batch of independent queries over one database handle.
///
/// A malformed slot does not abort the batch; it is marked invalid and
/// only reading it errors. Slots are independent evaluations with their
/// own iterator trees, so the batch fans out across threads.
pub struct BatchEnquire {
    db: Arc<dyn Database>,
    slots: Vec<QuerySlot>,
}

impl BatchEnquire {
    /// Create a batch session on a database handle.
    pub fn new(db: Arc<dyn Database>) -> Self {
        BatchEnquire {
            db,
            slots: Vec::new(),
        }
    }

    /// Set the batch's query slots.
    pub fn set_queries(&mut self, slots: Vec<QuerySlot>) {
        self.slots = slots;
    }

    /// Evaluate every slot. Non-argument errors (I/O, backend faults)
    /// abort the whole batch.
    pub fn get_msets(&self) -> Result<Vec<BatchResult>> {
        self.slots
            .par_iter()
            .map(|slot| {
                if slot.query.is_empty() {
                    return Ok(BatchResult(None));
                }
                let mut enquire = Enquire::new(self.db.clone());
                enquire.set_query(&slot.query);
                match enquire.get_mset(slot.first, slot.max_items, None, slot.settings.as_ref(), None)
                {
                    Ok(mset) => Ok(BatchResult(Some(mset))),
                    Err(KopisError::InvalidArgument(_)) => Ok(BatchResult(None)),
                    Err(error) => Err(error),
                }
            })
            .collect()
    }
}
