//! Offered actions
//!
//! Rules, evaluated in form order:
//! - Unpublish: published, can publish, not deleted from stage, can delete from live
//! - Cancel draft changes: stages differ, not deleted from stage, published, can edit
//! - Delete: can edit, can delete, not new, not published
//! - Save Draft: can edit
//! - Save & Publish: always listed; enabled when can publish, not deleted from
//!   stage and not new
//! - Publish silently: type opts in, published, can publish
//! - Preview: type can preview, not new, non-empty link

use std::fmt;

use serde::Serialize;

use super::permissions::RecordPermissions;
use crate::record::{Record, RecordType, Stage};
use crate::state::VersionStatus;

/// A transition the edit form can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Unpublish,
    Rollback,
    Delete,
    Save,
    Publish,
    SilentPublish,
    Preview,
    /// Recreates a Draft row for a record that only exists on Live.
    RestoreToStage,
}

impl Action {
    /// Handler name on the edit form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Unpublish => "doUnpublish",
            Action::Rollback => "doRollback",
            Action::Delete => "doDelete",
            Action::Save => "doSave",
            Action::Publish => "doPublish",
            Action::SilentPublish => "doSilentPublish",
            Action::Preview => "preview",
            Action::RestoreToStage => "doRestoreToStage",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Button group on the edit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionGroup {
    /// Secondary button set.
    Minor,
    /// Primary actions.
    Major,
}

/// An action as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfferedAction {
    pub action: Action,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub group: ActionGroup,
    pub destructive: bool,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
    /// Target of link-style actions (preview).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl OfferedAction {
    fn new(action: Action, label: &str, group: ActionGroup) -> Self {
        Self {
            action,
            label: label.to_string(),
            description: None,
            group,
            destructive: false,
            enabled: true,
            disabled_reason: None,
            link: None,
        }
    }

    fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }

    fn disabled(mut self, reason: impl Into<String>) -> Self {
        self.enabled = false;
        self.disabled_reason = Some(reason.into());
        self
    }
}

/// Actions listed for one record, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvailableActions {
    actions: Vec<OfferedAction>,
}

impl AvailableActions {
    /// True if the action is listed and enabled.
    pub fn is_offered(&self, action: Action) -> bool {
        self.get(action).is_some_and(|a| a.enabled)
    }

    /// Returns the listed action, enabled or not.
    pub fn get(&self, action: Action) -> Option<&OfferedAction> {
        self.actions.iter().find(|a| a.action == action)
    }

    pub fn preview_link(&self) -> Option<&str> {
        self.get(Action::Preview).and_then(|a| a.link.as_deref())
    }

    pub fn group(&self, group: ActionGroup) -> impl Iterator<Item = &OfferedAction> {
        self.actions.iter().filter(move |a| a.group == group)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OfferedAction> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Computes the offered actions.
#[derive(Debug, Clone)]
pub struct ActionPolicy {
    preview_stage: String,
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self {
            preview_stage: Stage::Draft.as_str().to_string(),
        }
    }
}

impl ActionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `stage` query value appended to preview links.
    pub fn with_preview_stage(mut self, stage: impl Into<String>) -> Self {
        self.preview_stage = stage.into();
        self
    }

    pub fn preview_link(&self, link: &str) -> String {
        format!("{}?stage={}", link, self.preview_stage)
    }

    pub fn evaluate(
        &self,
        record_type: &RecordType,
        record: &Record,
        status: &VersionStatus,
        permissions: &dyn RecordPermissions,
    ) -> AvailableActions {
        let can_edit = permissions.can_edit(record);
        let can_publish = permissions.can_publish(record);
        let mut actions = Vec::new();

        if status.is_published
            && can_publish
            && !status.is_deleted_from_stage
            && permissions.can_delete_from_live(record)
        {
            actions.push(
                OfferedAction::new(Action::Unpublish, "Unpublish", ActionGroup::Minor)
                    .described(format!(
                        "Remove this {} from the published site",
                        record.class_name
                    ))
                    .destructive(),
            );
        }

        if status.stages_differ && !status.is_deleted_from_stage && status.is_published && can_edit
        {
            actions.push(
                OfferedAction::new(Action::Rollback, "Cancel draft changes", ActionGroup::Minor)
                    .described("Delete your draft and revert to the currently published page"),
            );
        }

        if can_edit {
            if permissions.can_delete(record) && !status.is_new && !status.is_published {
                actions.push(
                    OfferedAction::new(Action::Delete, "Delete", ActionGroup::Minor).destructive(),
                );
            }
            actions.push(OfferedAction::new(Action::Save, "Save Draft", ActionGroup::Minor));
        }

        let publish = OfferedAction::new(Action::Publish, "Save & Publish", ActionGroup::Major);
        actions.push(if !can_publish {
            publish.disabled("No publish permissions")
        } else if status.is_new {
            publish.disabled("Save a draft before publishing")
        } else if status.is_deleted_from_stage {
            publish.disabled("Restore the draft before publishing")
        } else {
            publish
        });

        if record_type.supports_silent_publish() && status.is_published && can_publish {
            actions.push(
                OfferedAction::new(Action::SilentPublish, "Publish silently", ActionGroup::Major)
                    .described("Publish without changing the last edited date"),
            );
        }

        if !status.is_new {
            if let Some(link) = record_type.link(record) {
                let mut preview = OfferedAction::new(Action::Preview, "Preview", ActionGroup::Major);
                preview.link = Some(self.preview_link(&link));
                actions.push(preview);
            }
        }

        AvailableActions { actions }
    }
}
