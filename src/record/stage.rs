//! Stages and version numbers
//!
//! A record lives in up to two stages:
//! - `Draft` holds the working copy edited in the admin
//! - `Live` holds the published copy
//!
//! Each stage carries its own version number for the record. The presence of
//! a version number on a stage is the only evidence that the record exists
//! there.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two storage areas of a versioned record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Working copy.
    Draft,
    /// Published copy.
    Live,
}

impl Stage {
    /// Returns the stage name used in links and logs.
    ///
    /// The draft stage is called `Stage` on the published site, so preview
    /// links read `?stage=Stage`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Draft => "Stage",
            Stage::Live => "Live",
        }
    }

    /// Returns the other stage.
    pub fn opposite(&self) -> Stage {
        match self {
            Stage::Draft => Stage::Live,
            Stage::Live => Stage::Draft,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Monotonic version number of a record on a stage.
///
/// Two stages holding the same version number hold the same content.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct VersionNumber(u64);

impl VersionNumber {
    /// Creates a version number.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns the version that follows this one.
    #[inline]
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Draft.as_str(), "Stage");
        assert_eq!(Stage::Live.to_string(), "Live");
    }

    #[test]
    fn test_opposite_stage() {
        assert_eq!(Stage::Draft.opposite(), Stage::Live);
        assert_eq!(Stage::Live.opposite(), Stage::Draft);
    }

    #[test]
    fn test_version_ordering() {
        let v1 = VersionNumber::new(1);
        assert!(v1 < v1.next());
        assert_eq!(v1.next().value(), 2);
    }
}
