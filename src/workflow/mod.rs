//! Publish Workflow
//!
//! Transitions of a versioned record between the Draft and Live stages:
//! - Save: form values → Draft
//! - Publish: form values → Draft → Live
//! - Silent publish: Publish, keeping the Live `last_edited`
//! - Unpublish / delete from live: remove the Live copy
//! - Rollback: Live → Draft
//! - Restore to stage: recreate a Draft copy that was deleted
//! - Delete: remove both copies and all versions

mod context;
mod errors;
mod item_request;
mod surface;

pub use context::{ReadingContext, StageGuard};
pub use errors::{WorkflowError, WorkflowResult};
pub use item_request::{VersionedItemRequest, WorkflowResponse};
pub use surface::{AdminSurface, NoticeLevel, RecordedSurface, RedirectStatus};
