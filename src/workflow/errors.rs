//! # Workflow Errors
//!
//! Error types for publish workflow transitions.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::policy::Action;
use crate::record::InvalidRecordId;
use crate::store::StoreError;

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Publish workflow errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    // ==================
    // Refusals (no mutation)
    // ==================
    /// Caller lacks the permission the transition needs
    #[error("Permission denied: {0}")]
    PermissionDenied(Action),

    /// Caller may not delete the record
    #[error("No delete permissions")]
    DeletePermissionDenied,

    /// Raw id is neither numeric, transient nor empty
    #[error(transparent)]
    InvalidRecordId(#[from] InvalidRecordId),

    /// Transition needs a record that has been written
    #[error("Record has not been saved: {0}")]
    NotPersisted(Action),

    /// Transition is not available for this record or type
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// No Draft or Live row for the requested record
    #[error("Record not found: {class_name} #{id}")]
    RecordNotFound { class_name: String, id: String },

    // ==================
    // Failures
    // ==================
    /// Stage store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Audit record could not be written
    #[error("Audit error: {0}")]
    Audit(#[from] io::Error),

    /// Admin configuration is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            WorkflowError::PermissionDenied(_) => 403,
            WorkflowError::DeletePermissionDenied => 403,

            WorkflowError::InvalidRecordId(_) => 400,
            WorkflowError::NotPersisted(_) => 400,
            WorkflowError::Unsupported(_) => 400,

            WorkflowError::RecordNotFound { .. } => 404,

            WorkflowError::Store(_) => 500,
            WorkflowError::Audit(_) => 500,
            WorkflowError::Config(_) => 500,
        }
    }

    /// True if the transition was refused before touching the store.
    pub fn is_rejection(&self) -> bool {
        self.status_code() < 500
    }

    /// True if the underlying store can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkflowError::Store(e) if e.is_fatal())
    }
}
