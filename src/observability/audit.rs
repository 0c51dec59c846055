//! Transition audit log
//!
//! - Every attempted transition is recorded, including refusals
//! - One JSON record per line, append-only
//! - Writes are fsynced before `append` returns

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audited transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Save,
    Publish,
    SilentPublish,
    Unpublish,
    Rollback,
    Delete,
    RestoreToStage,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Save => "SAVE",
            AuditAction::Publish => "PUBLISH",
            AuditAction::SilentPublish => "SILENT_PUBLISH",
            AuditAction::Unpublish => "UNPUBLISH",
            AuditAction::Rollback => "ROLLBACK",
            AuditAction::Delete => "DELETE",
            AuditAction::RestoreToStage => "RESTORE_TO_STAGE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit record outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    /// Transition applied.
    Success,
    /// Refused before any mutation.
    Rejected,
    /// Store or hook failure part way through.
    Failed,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "SUCCESS",
            AuditOutcome::Rejected => "REJECTED",
            AuditOutcome::Failed => "FAILED",
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub outcome: AuditOutcome,
    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "operator", skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<String>,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AuditRecord {
    pub fn new(action: AuditAction, outcome: AuditOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            outcome,
            class_name: None,
            record_id: None,
            title: None,
            operator_id: None,
            error_message: None,
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_record_id(mut self, id: impl fmt::Display) -> Self {
        self.record_id = Some(id.to_string());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_operator(mut self, id: impl Into<String>) -> Self {
        self.operator_id = Some(id.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Serializes to one JSON line (no trailing newline).
    pub fn to_json(&self) -> io::Result<String> {
        serde_json::to_string(self).map_err(io::Error::from)
    }

    pub fn from_json(line: &str) -> io::Result<Self> {
        serde_json::from_str(line).map_err(io::Error::from)
    }
}

/// Audit log sink.
pub trait AuditLog: Send + Sync {
    /// Appends a record; it must be durable when this returns.
    fn append(&self, record: &AuditRecord) -> io::Result<()>;

    fn sync(&self) -> io::Result<()>;
}

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "audit log lock poisoned")
}

/// Append-only JSON-lines audit file.
pub struct FileAuditLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileAuditLog {
    /// Opens or creates the audit file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&self) -> io::Result<MutexGuard<'_, BufWriter<File>>> {
        self.writer.lock().map_err(|_| poisoned())
    }
}

impl AuditLog for FileAuditLog {
    fn append(&self, record: &AuditRecord) -> io::Result<()> {
        let json = record.to_json()?;
        let mut writer = self.writer()?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    }

    fn sync(&self) -> io::Result<()> {
        self.writer()?.get_ref().sync_all()
    }
}

/// In-memory audit log. Clones share the same records.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditLog {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, record: &AuditRecord) -> io::Result<()> {
        self.records
            .lock()
            .map_err(|_| poisoned())?
            .push(record.clone());
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_audit_record_builder() {
        let record = AuditRecord::new(AuditAction::Publish, AuditOutcome::Success)
            .with_class("Article")
            .with_record_id(7)
            .with_operator("editor");

        assert_eq!(record.action, AuditAction::Publish);
        assert_eq!(record.record_id.as_deref(), Some("7"));
        assert_eq!(record.operator_id.as_deref(), Some("editor"));
    }

    #[test]
    fn test_audit_record_json_skips_empty_fields() {
        let record = AuditRecord::new(AuditAction::SilentPublish, AuditOutcome::Rejected)
            .with_error("not supported");

        let json = record.to_json().unwrap();
        assert!(json.contains("\"action\":\"SILENT_PUBLISH\""));
        assert!(json.contains("\"outcome\":\"REJECTED\""));
        assert!(json.contains("\"error\":\"not supported\""));
        assert!(!json.contains("operator"));

        assert_eq!(AuditRecord::from_json(&json).unwrap(), record);
    }

    #[test]
    fn test_memory_audit_log_clones_share_records() {
        let log = MemoryAuditLog::new();
        let shared = log.clone();

        log.append(&AuditRecord::new(AuditAction::Save, AuditOutcome::Success))
            .unwrap();
        shared
            .append(&AuditRecord::new(AuditAction::Delete, AuditOutcome::Rejected))
            .unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[1].action, AuditAction::Delete);
    }

    #[test]
    fn test_file_audit_log_appends_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit").join("transitions.log");

        let log = FileAuditLog::open(&path).unwrap();
        log.append(
            &AuditRecord::new(AuditAction::Unpublish, AuditOutcome::Success).with_title("Home"),
        )
        .unwrap();
        log.append(&AuditRecord::new(AuditAction::Rollback, AuditOutcome::Failed))
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            AuditRecord::from_json(lines[0]).unwrap().title.as_deref(),
            Some("Home")
        );
    }
}
