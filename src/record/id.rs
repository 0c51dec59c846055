//! Record identity
//!
//! A record is addressed either by a persisted positive integer or, while it
//! only exists on the admin surface, by a transient string starting with
//! `new` (any case). An empty or absent id means the record was never saved.
//!
//! Anything else is rejected at parse time instead of being guessed as new.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error for an id that is neither persisted, transient nor empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed record id: {0:?}")]
pub struct InvalidRecordId(pub String);

/// Identity of a record as seen by the admin surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordId {
    /// No id at all (empty, absent or zero).
    Unsaved,
    /// Stored record with a positive integer id.
    Persisted(u64),
    /// Placeholder id handed out before the first write, e.g. `new-1`.
    Transient(String),
}

impl RecordId {
    /// Parses an optional raw id.
    ///
    /// - absent, empty or `0` → `Unsaved`
    /// - positive integer → `Persisted`
    /// - case-insensitive `new` prefix → `Transient`
    pub fn parse(raw: Option<&str>) -> Result<Self, InvalidRecordId> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(Self::Unsaved),
            Some(raw) => raw,
        };

        if raw.bytes().all(|b| b.is_ascii_digit()) {
            return match raw.parse::<u64>() {
                Ok(0) => Ok(Self::Unsaved),
                Ok(id) => Ok(Self::Persisted(id)),
                Err(_) => Err(InvalidRecordId(raw.to_string())),
            };
        }

        if raw.get(..3).is_some_and(|prefix| prefix.eq_ignore_ascii_case("new")) {
            return Ok(Self::Transient(raw.to_string()));
        }

        Err(InvalidRecordId(raw.to_string()))
    }

    /// Creates a persisted id. Zero maps to `Unsaved`.
    pub fn persisted(id: u64) -> Self {
        if id == 0 {
            Self::Unsaved
        } else {
            Self::Persisted(id)
        }
    }

    /// True if the record has not been written yet.
    #[inline]
    pub fn is_new(&self) -> bool {
        !matches!(self, Self::Persisted(_))
    }

    /// Returns the numeric id if persisted.
    #[inline]
    pub fn as_persisted(&self) -> Option<u64> {
        match self {
            Self::Persisted(id) => Some(*id),
            _ => None,
        }
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::Unsaved
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsaved => write!(f, ""),
            Self::Persisted(id) => write!(f, "{}", id),
            Self::Transient(raw) => write!(f, "{}", raw),
        }
    }
}
