//! Versioned record vocabulary
//!
//! This module provides:
//! - `RecordId` - persisted, transient or unsaved identity
//! - `Stage` - Draft or Live storage area
//! - `VersionNumber` - per-record monotonic version
//! - `Record` - the payload held on each stage
//! - `RecordType` - per-class capabilities (custom publish, preview, silent publish)

mod id;
#[allow(clippy::module_inception)]
mod record;
mod record_type;
mod stage;

pub use id::{InvalidRecordId, RecordId};
pub use record::{FormData, Record};
pub use record_type::{CustomPublishable, Previewable, RecordType};
pub use stage::{Stage, VersionNumber};
