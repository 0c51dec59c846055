//! Observability
//!
//! - Structured JSON logging with a minimum severity
//! - Observation scopes around each transition
//! - Lifecycle events
//! - Append-only audit log of transitions
//!
//! Observability never changes the outcome of an operation: logging is
//! fire-and-forget, and audit failures are reported by the caller.

pub mod audit;
mod events;
mod logger;
mod scope;

pub use audit::{AuditAction, AuditLog, AuditOutcome, AuditRecord, FileAuditLog, MemoryAuditLog};
pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

fn event_severity(event: Event) -> Severity {
    if event.is_fatal() {
        Severity::Fatal
    } else if event.is_warning() {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(event_severity(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event_severity(event), event.as_str(), fields);
}
