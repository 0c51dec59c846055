//! versioned-admin - Draft/Live publishing for admin-managed records
//!
//! A record of a versioned type lives in two stages, Draft and Live, each
//! with its own version number. This crate provides:
//! - the stage store contract with in-memory and journal-backed stores
//! - status evaluation from stage versions
//! - the save / publish / unpublish / rollback / restore / delete workflow
//! - the policy deciding which of those actions an edit form offers

pub mod admin;
pub mod config;
pub mod observability;
pub mod policy;
pub mod record;
pub mod state;
pub mod store;
pub mod workflow;

pub use admin::VersionedModelAdmin;
pub use config::{AdminConfig, ConfigError};
pub use policy::{Action, AvailableActions, Grants, RecordPermissions};
pub use record::{Record, RecordId, RecordType, Stage, VersionNumber};
pub use state::{VersionStateEvaluator, VersionStatus};
pub use store::{FileStageStore, MemoryStageStore, StageStore};
pub use workflow::{
    AdminSurface, ReadingContext, RecordedSurface, VersionedItemRequest, WorkflowError,
    WorkflowResponse,
};
