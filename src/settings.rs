//! Option handling: a loose string map at the API edge, resolved once into
//! typed option structs before evaluation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{KopisError, Result};

/// A string-keyed option map.
///
/// Callers populate a `Settings` with the documented keys; the library
/// resolves it into [`MatchOptions`], [`ExpandOptions`] or a backend
/// configuration exactly once per operation, so the hot path never touches
/// string lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    /// Create an empty settings map.
    pub fn new() -> Self {
        Settings::default()
    }

    /// Set a key to a value. Any value type with a natural string form works.
    pub fn set<K: Into<String>, V: ToString>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), value.to_string());
    }

    /// Get a raw value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") => Ok(false),
            Some(other) => Err(KopisError::invalid_argument(format!(
                "setting `{key}` is not a boolean: `{other}`"
            ))),
        }
    }

    fn get_u32(&self, key: &str) -> Result<Option<u32>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<u32>().map(Some).map_err(|_| {
                KopisError::invalid_argument(format!(
                    "setting `{key}` is not a non-negative integer: `{raw}`"
                ))
            }),
        }
    }
}

/// Typed match options, resolved from [`Settings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Collapse results sharing the value of this document key.
    pub collapse_key: Option<u32>,
    /// Discard items scoring below this percentage of the maximum possible
    /// weight (0 disables the cutoff).
    pub percent_cutoff: u32,
    /// Tie-break direction for equal weights: ascending doc-id when true.
    pub sort_forward: bool,
    /// Cap on the number of OR operands considered (after flattening).
    pub max_or_terms: Option<u32>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            collapse_key: None,
            percent_cutoff: 0,
            sort_forward: true,
            max_or_terms: None,
        }
    }
}

impl MatchOptions {
    /// Resolve from a settings map; unset keys take their defaults.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let percent_cutoff = settings.get_u32("match_percent_cutoff")?.unwrap_or(0);
        if percent_cutoff > 100 {
            return Err(KopisError::invalid_argument(format!(
                "match_percent_cutoff must be 0..=100, got {percent_cutoff}"
            )));
        }
        let collapse_key = match settings.get_u32("match_collapse_key")? {
            Some(0) | None => None,
            Some(k) => Some(k),
        };
        Ok(MatchOptions {
            collapse_key,
            percent_cutoff,
            sort_forward: settings.get_bool("match_sort_forward", true)?,
            max_or_terms: settings.get_u32("match_max_or_terms")?,
        })
    }
}

/// Typed expand options, resolved from [`Settings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandOptions {
    /// Allow terms that already occur in the current query.
    pub use_query_terms: bool,
    /// Demand exact cross-backend term frequencies instead of the
    /// per-backend approximation.
    pub use_exact_termfreq: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        ExpandOptions {
            use_query_terms: true,
            use_exact_termfreq: false,
        }
    }
}

impl ExpandOptions {
    /// Resolve from a settings map; unset keys take their defaults.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(ExpandOptions {
            use_query_terms: settings.get_bool("expand_use_query_terms", true)?,
            use_exact_termfreq: settings.get_bool("expand_use_exact_termfreq", false)?,
        })
    }
}
