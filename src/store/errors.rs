//! Stage store error types
//!
//! Error codes:
//! - STORE_IO_ERROR (ERROR severity)
//! - STORE_WRITE_FAILED (ERROR severity)
//! - STORE_READ_FAILED (ERROR severity)
//! - STORE_ROW_NOT_FOUND (ERROR severity)
//! - STORE_PRIMARY_KEY_LOCKED (ERROR severity)
//! - STORE_DATA_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

use crate::observability::Severity;

/// Stage store error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// Disk I/O failure
    IoError,
    /// Row or journal write failed
    WriteFailed,
    /// Row or journal read failed
    ReadFailed,
    /// Required stage row does not exist
    RowNotFound,
    /// Explicit primary key insert without permission
    PrimaryKeyLocked,
    /// Journal checksum or framing failure
    DataCorruption,
}

impl StoreErrorCode {
    /// Returns the string code.
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::IoError => "STORE_IO_ERROR",
            StoreErrorCode::WriteFailed => "STORE_WRITE_FAILED",
            StoreErrorCode::ReadFailed => "STORE_READ_FAILED",
            StoreErrorCode::RowNotFound => "STORE_ROW_NOT_FOUND",
            StoreErrorCode::PrimaryKeyLocked => "STORE_PRIMARY_KEY_LOCKED",
            StoreErrorCode::DataCorruption => "STORE_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error.
    pub fn severity(&self) -> Severity {
        match self {
            StoreErrorCode::DataCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Stage store error with context.
#[derive(Debug)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StoreError {
    fn with_code(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// I/O failure outside of a specific read or write.
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::with_code(StoreErrorCode::IoError, message)
        }
    }

    /// Write failure with an I/O source.
    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::with_code(StoreErrorCode::WriteFailed, message)
        }
    }

    /// Write failure without an I/O source (encoding, lock poisoning).
    pub fn write_failed_no_source(message: impl Into<String>) -> Self {
        Self::with_code(StoreErrorCode::WriteFailed, message)
    }

    /// Read failure with an I/O source.
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::with_code(StoreErrorCode::ReadFailed, message)
        }
    }

    /// A stage row the operation depends on is missing.
    pub fn row_not_found(base_table: &str, stage: impl fmt::Display, id: u64) -> Self {
        Self {
            details: Some(format!("table: {}, stage: {}, id: {}", base_table, stage, id)),
            ..Self::with_code(StoreErrorCode::RowNotFound, "stage row does not exist")
        }
    }

    /// Explicit primary key insert while editing is not allowed.
    pub fn primary_key_locked(base_table: &str, id: u64) -> Self {
        Self {
            details: Some(format!("table: {}, id: {}", base_table, id)),
            ..Self::with_code(
                StoreErrorCode::PrimaryKeyLocked,
                "explicit primary key insert is not allowed",
            )
        }
    }

    /// Journal corruption at a byte offset (FATAL).
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("byte_offset: {}", offset)),
            ..Self::with_code(StoreErrorCode::DataCorruption, reason)
        }
    }

    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether the store must not be used any further.
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for stage store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_corruption_is_fatal() {
        assert!(StoreError::corruption_at_offset(12, "checksum mismatch").is_fatal());
        assert!(!StoreError::row_not_found("Article", "Live", 3).is_fatal());
        assert!(!StoreError::primary_key_locked("Article", 3).is_fatal());
        assert!(!StoreError::write_failed(
            "disk full",
            io::Error::new(io::ErrorKind::Other, "disk full")
        )
        .is_fatal());
    }

    #[test]
    fn test_display_contains_code_and_details() {
        let err = StoreError::row_not_found("Article", "Live", 7);
        let display = err.to_string();
        assert!(display.contains("STORE_ROW_NOT_FOUND"));
        assert!(display.contains("ERROR"));
        assert!(display.contains("id: 7"));

        let err = StoreError::corruption_at_offset(1024, "bad frame");
        let display = err.to_string();
        assert!(display.contains("FATAL"));
        assert!(display.contains("byte_offset: 1024"));
    }

    #[test]
    fn test_io_source_is_exposed() {
        use std::error::Error;

        let err = StoreError::read_failed("open", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());
        assert_eq!(err.code(), StoreErrorCode::ReadFailed);
    }
}
