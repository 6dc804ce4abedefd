//! Storage backend contract and the process-wide backend factory.
//!
//! A backend exposes collection statistics, posting traversal, term-list
//! traversal and document access behind the [`Database`] trait. The query
//! engine never sees anything else, so every implementation — in-memory,
//! on-disk, remote — must give identical observable semantics.

pub mod inmemory;
pub mod multi;

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, OnceLock};

use log::debug;

use crate::document::{DocId, Document, DocumentContents, TermPos};
use crate::error::{KopisError, Result};
use crate::settings::Settings;

pub use inmemory::InMemoryDatabase;
pub use multi::MultiDatabase;

/// Read-only view of one document collection.
///
/// All statistics refer to the collection snapshot the handle was opened
/// on. Implementations must be shareable across threads; each query
/// evaluation builds its own cursors.
pub trait Database: Send + Sync + Debug {
    /// Number of documents in the collection.
    fn doc_count(&self) -> u64;

    /// Average document length over the collection (0 when empty).
    fn avg_length(&self) -> f64;

    /// Whether any document contains `term`.
    fn term_exists(&self, term: &str) -> bool {
        self.term_freq(term) > 0
    }

    /// Number of documents containing `term`.
    fn term_freq(&self, term: &str) -> u64;

    /// Open a posting cursor for `term`, without positional data.
    ///
    /// Returns `None` when no document contains the term.
    fn postings(&self, term: &str) -> Result<Option<Box<dyn PostingCursor>>>;

    /// Open a posting cursor for `term` that also carries positions.
    ///
    /// Returns `None` when the term is absent or the backend stores no
    /// positional information.
    fn positional_postings(&self, term: &str) -> Result<Option<Box<dyn PostingCursor>>>;

    /// Open a cursor over the terms of one document.
    fn term_list(&self, doc: DocId) -> Result<Box<dyn TermCursor>>;

    /// Fetch a document's stored form.
    fn document(&self, doc: DocId) -> Result<Document>;

    /// Number of component backends (1 unless this is a multi-database).
    fn sub_db_count(&self) -> usize {
        1
    }

    /// Index of the component backend owning `doc`.
    fn sub_db_of(&self, _doc: DocId) -> usize {
        0
    }
}

/// A backend that also accepts documents.
///
/// Writes happen inside a scoped session. Dropping the database with a
/// session still open must end it; release is guaranteed on every exit
/// path.
pub trait WritableDatabase: Database {
    /// Open a write session, excluding other writers.
    fn begin_session(&self) -> Result<()>;

    /// Flush and close the current session.
    fn end_session(&self) -> Result<()>;

    /// Add a document, opening a session implicitly if none is active.
    /// Returns the new document's id.
    fn add_document(&self, contents: &DocumentContents) -> Result<DocId>;
}

/// Cursor over the postings of one term, in strictly increasing doc-id
/// order.
///
/// A fresh cursor is not yet positioned; the first [`advance`] or
/// [`skip_to`] moves it to a document. A `skip_to` target at or before the
/// current document is a no-op.
///
/// [`advance`]: PostingCursor::advance
/// [`skip_to`]: PostingCursor::skip_to
pub trait PostingCursor: Send + Debug {
    /// Current document id. Only meaningful while positioned.
    fn doc_id(&self) -> DocId;

    /// Within-document frequency at the current document.
    fn wdf(&self) -> u64;

    /// Length of the current document.
    fn doc_length(&self) -> u64;

    /// Sorted positions of the term in the current document, when the
    /// cursor was opened positionally.
    fn positions(&self) -> Option<&[TermPos]>;

    /// Move to the next document. Returns false once exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// Move forward to the first document with id >= `target`.
    fn skip_to(&mut self, target: DocId) -> Result<bool>;

    /// Whether the cursor has moved past the last document.
    fn at_end(&self) -> bool;
}

/// Cursor over the terms of one document, in lexicographic order.
pub trait TermCursor: Send + Debug {
    /// Current term name.
    fn term(&self) -> &str;

    /// Within-document frequency of the current term.
    fn wdf(&self) -> u64;

    /// Document frequency of the current term within the owning backend.
    ///
    /// For a component of a multi-database this is the component-local
    /// count; the expand engine sums these for its approximation mode.
    fn term_freq(&self) -> u64;

    /// Move to the next term. Returns false once exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// Whether the cursor has moved past the last term.
    fn at_end(&self) -> bool;
}

/// Typed backend configuration resolved from a [`Settings`] map.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Filesystem path for disk backends.
    pub path: Option<String>,
    /// Open read-only.
    pub readonly: bool,
    /// Remote host.
    pub host: Option<String>,
    /// Remote port.
    pub port: Option<u16>,
    /// Remote operation timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl BackendConfig {
    /// Resolve from a settings map.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let port = match settings.get("port") {
            None => None,
            Some(raw) => Some(raw.parse::<u16>().map_err(|_| {
                KopisError::invalid_argument(format!("setting `port` is not a port: `{raw}`"))
            })?),
        };
        let timeout_ms = match settings.get("timeout_ms") {
            None => None,
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                KopisError::invalid_argument(format!(
                    "setting `timeout_ms` is not an integer: `{raw}`"
                ))
            })?),
        };
        Ok(BackendConfig {
            path: settings.get("path").map(str::to_string),
            readonly: matches!(settings.get("readonly"), Some("true") | Some("1")),
            host: settings.get("host").map(str::to_string),
            port,
            timeout_ms,
        })
    }
}

type BackendConstructor = fn(&BackendConfig) -> Result<Arc<dyn Database>>;

enum BackendEntry {
    Available(BackendConstructor),
    /// Recognised name whose support was not built into this binary.
    Unavailable,
}

fn registry() -> &'static HashMap<&'static str, BackendEntry> {
    static REGISTRY: OnceLock<HashMap<&'static str, BackendEntry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut table: HashMap<&'static str, BackendEntry> = HashMap::new();
        table.insert("inmemory", BackendEntry::Available(open_inmemory));
        table.insert("quartz", BackendEntry::Unavailable);
        table.insert("sleepycat", BackendEntry::Unavailable);
        table.insert("remote", BackendEntry::Unavailable);
        table.insert("da", BackendEntry::Unavailable);
        table.insert("db", BackendEntry::Unavailable);
        table
    })
}

fn open_inmemory(_config: &BackendConfig) -> Result<Arc<dyn Database>> {
    Ok(Arc::new(InMemoryDatabase::new()))
}

/// Open a database from a settings map.
///
/// The `backend` key selects the implementation. Unknown names report
/// [`KopisError::InvalidArgument`]; recognised names whose support is not
/// built in report [`KopisError::FeatureUnavailable`].
pub fn open_database(settings: &Settings) -> Result<Arc<dyn Database>> {
    let name = settings.get("backend").unwrap_or("");
    let entry = registry()
        .get(name)
        .ok_or_else(|| KopisError::invalid_argument(format!("unknown backend `{name}`")))?;
    match entry {
        BackendEntry::Available(build) => {
            let config = BackendConfig::from_settings(settings)?;
            debug!("opening {name} backend");
            build(&config)
        }
        BackendEntry::Unavailable => Err(KopisError::feature_unavailable(format!(
            "backend `{name}` is not built into this binary"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_backend_is_invalid_argument() {
        let mut settings = Settings::new();
        settings.set("backend", "shorterofbreath");
        match open_database(&settings) {
            Err(KopisError::InvalidArgument(_)) => {}
            other => panic!("expected InvalidArgument, got {other:?}"),
        }

        let settings = Settings::new();
        match open_database(&settings) {
            Err(KopisError::InvalidArgument(_)) => {}
            other => panic!("expected InvalidArgument for empty name, got {other:?}"),
        }
    }

    #[test]
    fn test_unbuilt_backends_are_unavailable() {
        for name in ["quartz", "sleepycat", "remote", "da", "db"] {
            let mut settings = Settings::new();
            settings.set("backend", name);
            match open_database(&settings) {
                Err(KopisError::FeatureUnavailable(_)) => {}
                other => panic!("expected FeatureUnavailable for `{name}`, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_inmemory_opens_empty() {
        let mut settings = Settings::new();
        settings.set("backend", "inmemory");
        let db = open_database(&settings).unwrap();
        assert_eq!(db.doc_count(), 0);
        assert_eq!(db.avg_length(), 0.0);
    }
}
