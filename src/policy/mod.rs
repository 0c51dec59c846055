//! Action Availability Policy
//!
//! Decides which transitions the edit form offers for a record, given its
//! version status, its type capabilities and the caller's permissions.
//! Publish is always listed, disabled with a reason when not allowed.

mod availability;
mod permissions;

pub use availability::{Action, ActionGroup, ActionPolicy, AvailableActions, OfferedAction};
pub use permissions::{Grants, RecordPermissions};
