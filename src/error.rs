//! Error types for the Kopis library.
//!
//! All fallible operations in Kopis report a [`KopisError`]. The variants
//! follow the categories callers need to distinguish: bad input, a backend
//! that cannot be opened, a backend that was recognised but not built in,
//! out-of-range lookups, invalid batch slots, and internal invariant
//! violations. Remote backends surface transport problems as
//! [`KopisError::Network`].

use std::io;

use thiserror::Error;

/// The main error type for Kopis operations.
#[derive(Error, Debug)]
pub enum KopisError {
    /// Malformed input: empty operand, boolean sub-query under a weighted
    /// operator, unknown backend name, negative frequency, and so on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A database, file, or remote endpoint could not be opened.
    #[error("opening error: {0}")]
    Opening(String),

    /// The backend name is recognised but support was not compiled in.
    #[error("feature unavailable: {0}")]
    FeatureUnavailable(String),

    /// A lookup outside the range of the current result set, such as the
    /// term statistics of a term that is not in the evaluated query.
    #[error("range error: {0}")]
    Range(String),

    /// A batch slot whose query was malformed was indexed.
    #[error("invalid result: {0}")]
    InvalidResult(String),

    /// A backend invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),

    /// Transport failure of a remote backend outside of open.
    #[error("network error: {0}")]
    Network(String),

    /// I/O errors (file operations, sockets, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error
    #[error("error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with [`KopisError`].
pub type Result<T> = std::result::Result<T, KopisError>;

impl KopisError {
    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        KopisError::InvalidArgument(msg.into())
    }

    /// Create a new opening error.
    pub fn opening<S: Into<String>>(msg: S) -> Self {
        KopisError::Opening(msg.into())
    }

    /// Create a new feature unavailable error.
    pub fn feature_unavailable<S: Into<String>>(msg: S) -> Self {
        KopisError::FeatureUnavailable(msg.into())
    }

    /// Create a new range error.
    pub fn range<S: Into<String>>(msg: S) -> Self {
        KopisError::Range(msg.into())
    }

    /// Create a new invalid result error.
    pub fn invalid_result<S: Into<String>>(msg: S) -> Self {
        KopisError::InvalidResult(msg.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        KopisError::Internal(msg.into())
    }

    /// Create a new network error.
    pub fn network<S: Into<String>>(msg: S) -> Self {
        KopisError::Network(msg.into())
    }
}
