//! ObservationScope for transition logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` or `{name}_FAILED` when closed
//! - Logs `{name}_INCOMPLETE` if dropped while open

use std::cell::Cell;
use std::time::Instant;

use super::logger::{Logger, Severity};

/// A scope that logs begin and end events around one operation.
///
/// ```ignore
/// let scope = ObservationScope::with_fields("RECORD_PUBLISH", &[("id", "7")]);
/// store.copy_stage_to_stage(...)?;
/// scope.complete();
/// ```
///
/// Fields given at creation are repeated on every end event, together with
/// `elapsed_ms`.
pub struct ObservationScope<'a> {
    name: &'a str,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
    started: Instant,
}

impl<'a> ObservationScope<'a> {
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        Logger::info(&format!("{}_BEGIN", name), fields);

        Self {
            name,
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started: Instant::now(),
        }
    }

    fn end(&self, suffix: &str, severity: Severity, extra: &[(&str, &str)]) {
        self.completed.set(true);
        let elapsed = self.started.elapsed().as_millis().to_string();

        let mut all: Vec<(&str, &str)> = self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all.extend(extra.iter().copied());
        all.push(("elapsed_ms", &elapsed));

        Logger::log(severity, &format!("{}_{}", self.name, suffix), &all);
    }

    /// Logs `{name}_COMPLETE` at INFO level.
    pub fn complete(self) {
        self.end("COMPLETE", Severity::Info, &[]);
    }

    pub fn complete_with_fields(self, extra: &[(&str, &str)]) {
        self.end("COMPLETE", Severity::Info, extra);
    }

    /// Logs `{name}_FAILED` at WARN level (rejected by policy or permissions).
    pub fn reject(self, reason: &str) {
        self.end("FAILED", Severity::Warn, &[("reason", reason)]);
    }

    /// Logs `{name}_FAILED` at ERROR level.
    pub fn fail(self, reason: &str) {
        self.end("FAILED", Severity::Error, &[("reason", reason)]);
    }

    /// Logs `{name}_FAILED` at FATAL level.
    pub fn fail_fatal(self, reason: &str) {
        self.end("FAILED", Severity::Fatal, &[("reason", reason)]);
    }

    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            let event = format!("{}_INCOMPLETE", self.name);
            Logger::warn(&event, &[("reason", "scope dropped without completion")]);
        }
    }
}
