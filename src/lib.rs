//! # Kopis
//!
//! A probabilistic information-retrieval library for Rust.
//!
//! Kopis indexes documents and answers ranked queries. Evaluation runs
//! over a tree of lazy posting-list iterators with upper-bound driven
//! pruning, positional phrase and proximity operators, a bounded top-k
//! collector with collapsing and cutoff controls, and a relevance-feedback
//! expand engine. Storage sits behind a backend contract with identical
//! semantics across implementations; an in-memory backend ships in-tree.
//!
//! ```
//! use std::sync::Arc;
//!
//! use kopis::prelude::*;
//!
//! # fn main() -> kopis::error::Result<()> {
//! let db = InMemoryDatabase::new();
//! let mut doc = DocumentContents::new();
//! doc.set_data("an example document");
//! doc.add_posting("example", 1)?;
//! doc.add_posting("document", 2)?;
//! db.add_document(&doc)?;
//!
//! let mut enquire = Enquire::new(Arc::new(db));
//! enquire.set_query(&Query::term("example"));
//! let mset = enquire.get_mset(0, 10, None, None, None)?;
//! assert_eq!(mset.items[0].doc_id, 1);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod document;
pub mod enquire;
pub mod error;
pub mod expand;
pub mod matcher;
pub mod postings;
pub mod query;
pub mod settings;
pub mod weight;

/// The common imports for working with Kopis.
pub mod prelude {
    pub use crate::backend::{
        open_database, Database, InMemoryDatabase, MultiDatabase, WritableDatabase,
    };
    pub use crate::document::{DocId, Document, DocumentContents};
    pub use crate::enquire::{BatchEnquire, Enquire, MatchDecider, QuerySlot, RSet};
    pub use crate::error::{KopisError, Result};
    pub use crate::expand::{ESet, ESetItem, ExpandDecider};
    pub use crate::matcher::{MSet, MSetItem};
    pub use crate::query::{Op, Query};
    pub use crate::settings::Settings;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
