//! Lifecycle events
//!
//! Transitions are logged through `ObservationScope`; these cover everything
//! around them.

use std::fmt;

/// Observable lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Admin
    /// Versioned model admin initialized for a request
    AdminInit,
    /// Record type registered with the admin
    RecordTypeRegistered,
    /// Record loaded into an item request
    RecordLoaded,
    /// Request reading stage switched
    ReadingStageChanged,

    // Policy
    /// Transition refused for lack of permission
    PermissionRejected,

    // Store
    /// Placeholder Draft row inserted for a restore
    PlaceholderInserted,
    /// Version history purged on delete
    VersionHistoryPurged,
    /// Journal replayed on open
    JournalReplayed,
    /// Journal corruption detected (FATAL)
    JournalCorruption,

    // Audit
    /// Audit record could not be written
    AuditWriteFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::AdminInit => "ADMIN_INIT",
            Event::RecordTypeRegistered => "RECORD_TYPE_REGISTERED",
            Event::RecordLoaded => "RECORD_LOADED",
            Event::ReadingStageChanged => "READING_STAGE_CHANGED",

            Event::PermissionRejected => "PERMISSION_REJECTED",

            Event::PlaceholderInserted => "PLACEHOLDER_INSERTED",
            Event::VersionHistoryPurged => "VERSION_HISTORY_PURGED",
            Event::JournalReplayed => "JOURNAL_REPLAYED",
            Event::JournalCorruption => "JOURNAL_CORRUPTION",

            Event::AuditWriteFailed => "AUDIT_WRITE_FAILED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::JournalCorruption)
    }

    /// Returns true if this event reports a refused or failed action
    pub fn is_warning(&self) -> bool {
        matches!(self, Event::PermissionRejected | Event::AuditWriteFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_are_upper_snake_case() {
        let events = [
            Event::ConfigLoaded,
            Event::AdminInit,
            Event::RecordTypeRegistered,
            Event::RecordLoaded,
            Event::ReadingStageChanged,
            Event::PermissionRejected,
            Event::PlaceholderInserted,
            Event::VersionHistoryPurged,
            Event::JournalReplayed,
            Event::JournalCorruption,
            Event::AuditWriteFailed,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::JournalCorruption.is_fatal());
        assert!(!Event::JournalReplayed.is_fatal());
        assert!(Event::PermissionRejected.is_warning());
        assert!(!Event::AdminInit.is_warning());
    }
}
