//! Versioned item request
//!
//! One edit form request for one record. Every transition:
//! - checks the caller's permission before touching the store
//! - runs inside an `ObservationScope`
//! - appends one audit record, whatever the outcome
//!
//! Publish is not transactional: when the Live copy fails, the Draft write
//! that preceded it stays.

use serde::Serialize;

use super::context::ReadingContext;
use super::errors::{WorkflowError, WorkflowResult};
use super::surface::{AdminSurface, NoticeLevel, RedirectStatus};
use crate::observability::{
    log_event_with_fields, AuditAction, AuditLog, AuditOutcome, AuditRecord, Event,
    ObservationScope,
};
use crate::policy::{Action, ActionPolicy, AvailableActions, RecordPermissions};
use crate::record::{FormData, Record, RecordType, Stage};
use crate::state::{VersionStateEvaluator, VersionStatus};
use crate::store::StageStore;

/// What the presentation layer should do after a transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowResponse {
    /// Re-render the edit form for the record.
    EditView(Record),
    Redirect { url: String, status: RedirectStatus },
    RedirectBack,
}

/// Handler for one versioned record on the edit form.
pub struct VersionedItemRequest<'a> {
    store: &'a dyn StageStore,
    record_type: &'a RecordType,
    record: Record,
    permissions: &'a dyn RecordPermissions,
    context: &'a ReadingContext,
    audit: Option<&'a dyn AuditLog>,
    policy: ActionPolicy,
    back_link: String,
    delete_redirect: RedirectStatus,
}

impl<'a> VersionedItemRequest<'a> {
    pub fn new(
        store: &'a dyn StageStore,
        record_type: &'a RecordType,
        record: Record,
        permissions: &'a dyn RecordPermissions,
        context: &'a ReadingContext,
    ) -> Self {
        Self {
            store,
            record_type,
            record,
            permissions,
            context,
            audit: None,
            policy: ActionPolicy::new(),
            back_link: String::from("/"),
            delete_redirect: RedirectStatus::SeeOther,
        }
    }

    pub fn with_audit(mut self, audit: &'a dyn AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_policy(mut self, policy: ActionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Listing URL to return to after a delete.
    pub fn with_back_link(mut self, back_link: impl Into<String>) -> Self {
        self.back_link = back_link.into();
        self
    }

    pub fn with_delete_redirect(mut self, status: RedirectStatus) -> Self {
        self.delete_redirect = status;
        self
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn record_type(&self) -> &RecordType {
        self.record_type
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    fn evaluator(&self) -> VersionStateEvaluator<'_> {
        VersionStateEvaluator::new(self.store, self.record_type.base_table())
    }

    // =========================================================================
    // STATUS & ACTIONS
    // =========================================================================

    pub fn status(&self) -> WorkflowResult<VersionStatus> {
        Ok(self.evaluator().evaluate(&self.record.id)?)
    }

    pub fn available_actions(&self) -> WorkflowResult<AvailableActions> {
        let status = self.status()?;
        Ok(self
            .policy
            .evaluate(self.record_type, &self.record, &status, self.permissions))
    }

    /// True if the caller holds the permission `action` needs.
    ///
    /// Every transition refuses exactly when this is false.
    fn permitted(&self, action: Action) -> bool {
        let p = self.permissions;
        match action {
            Action::Unpublish => {
                p.can_publish(&self.record) && p.can_delete_from_live(&self.record)
            }
            Action::Rollback | Action::Save | Action::RestoreToStage => {
                p.can_edit(&self.record)
            }
            Action::Delete => p.can_edit(&self.record) && p.can_delete(&self.record),
            Action::Publish | Action::SilentPublish => p.can_publish(&self.record),
            Action::Preview => true,
        }
    }

    /// Runs an action submitted from the edit form.
    ///
    /// Actions the record's state does not allow are refused as unsupported
    /// unless the caller lacks the permission, in which case the transition's
    /// own denial path refuses them.
    pub fn execute(
        &mut self,
        action: Action,
        form: &FormData,
        surface: &mut dyn AdminSurface,
    ) -> WorkflowResult<WorkflowResponse> {
        let actions = self.available_actions()?;
        if !actions.is_offered(action) && self.permitted(action) {
            return Err(WorkflowError::Unsupported(format!(
                "{} is not available for {} {}",
                action,
                self.record_type.class_name(),
                self.record.id
            )));
        }

        match action {
            Action::Save => self.do_save(form, surface),
            Action::Publish => self.do_publish(form, surface),
            Action::SilentPublish => self.do_silent_publish(form, surface),
            Action::Unpublish => self.do_unpublish(surface),
            Action::Rollback => self.do_rollback(surface),
            Action::Delete => self.do_delete(surface),
            Action::RestoreToStage => {
                self.do_restore_to_stage().map(WorkflowResponse::EditView)
            }
            Action::Preview => match actions.preview_link() {
                Some(link) => Ok(WorkflowResponse::Redirect {
                    url: link.to_string(),
                    status: RedirectStatus::Found,
                }),
                None => Err(WorkflowError::Unsupported(String::from(
                    "record has no preview link",
                ))),
            },
        }
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Saves form values to the Draft stage.
    pub fn do_save(
        &mut self,
        form: &FormData,
        surface: &mut dyn AdminSurface,
    ) -> WorkflowResult<WorkflowResponse> {
        let scope = self.scope("RECORD_SAVE");
        if !self.permitted(Action::Save) {
            return self.reject(
                scope,
                AuditAction::Save,
                WorkflowError::PermissionDenied(Action::Save),
            );
        }

        let result = self.write_draft(form).map(|()| {
            surface.add_to_listing(&self.record);
            surface.notify(
                &format!(
                    "Saved {} \"{}\"",
                    self.record_type.singular_name(),
                    self.record.title
                ),
                NoticeLevel::Good,
            );
            self.edit_view()
        });
        self.finish(scope, AuditAction::Save, result)
    }

    /// Saves form values to Draft and copies the record to Live.
    pub fn do_publish(
        &mut self,
        form: &FormData,
        surface: &mut dyn AdminSurface,
    ) -> WorkflowResult<WorkflowResponse> {
        let scope = self.scope("RECORD_PUBLISH");
        if !self.permitted(Action::Publish) {
            return self.reject(
                scope,
                AuditAction::Publish,
                WorkflowError::PermissionDenied(Action::Publish),
            );
        }

        let result = self.publish_record(form, surface).map(|()| self.edit_view());
        self.finish(scope, AuditAction::Publish, result)
    }

    /// Publishes while keeping the Live `last_edited` value.
    pub fn do_silent_publish(
        &mut self,
        form: &FormData,
        surface: &mut dyn AdminSurface,
    ) -> WorkflowResult<WorkflowResponse> {
        let scope = self.scope("RECORD_SILENT_PUBLISH");
        if !self.record_type.supports_silent_publish() {
            return self.reject(
                scope,
                AuditAction::SilentPublish,
                WorkflowError::Unsupported(format!(
                    "{} does not support silent publishing",
                    self.record_type.class_name()
                )),
            );
        }
        if !self.permitted(Action::SilentPublish) {
            return self.reject(
                scope,
                AuditAction::SilentPublish,
                WorkflowError::PermissionDenied(Action::SilentPublish),
            );
        }
        let Some(id) = self.record.id.as_persisted() else {
            return self.reject(
                scope,
                AuditAction::SilentPublish,
                WorkflowError::NotPersisted(Action::SilentPublish),
            );
        };

        let result = self.silent_publish_record(id, form, surface).map(|()| self.edit_view());
        self.finish(scope, AuditAction::SilentPublish, result)
    }

    /// Removes the Live copy; the Draft copy is untouched.
    pub fn do_unpublish(
        &mut self,
        surface: &mut dyn AdminSurface,
    ) -> WorkflowResult<WorkflowResponse> {
        let scope = self.scope("RECORD_UNPUBLISH");
        if !self.permitted(Action::Unpublish) {
            return self.reject(
                scope,
                AuditAction::Unpublish,
                WorkflowError::PermissionDenied(Action::Unpublish),
            );
        }
        if self.record.id.is_new() {
            return self.reject(
                scope,
                AuditAction::Unpublish,
                WorkflowError::NotPersisted(Action::Unpublish),
            );
        }

        let result = {
            let _live = self.context.enter(Stage::Live);
            // Borrowed handle: the in-memory record keeps its identity.
            let handle = &self.record;
            self.store.delete_from_stage(handle, Stage::Live)
        };

        let result = result.map_err(WorkflowError::from).map(|()| {
            surface.notify(
                &format!(
                    "Unpublished {} \"{}\"",
                    self.record_type.singular_name(),
                    self.record.title
                ),
                NoticeLevel::Good,
            );
            self.edit_view()
        });
        self.finish(scope, AuditAction::Unpublish, result)
    }

    /// Synonym of `do_unpublish`.
    pub fn do_delete_from_live(
        &mut self,
        surface: &mut dyn AdminSurface,
    ) -> WorkflowResult<WorkflowResponse> {
        self.do_unpublish(surface)
    }

    /// Replaces the Draft copy with the Live copy, keeping the Live version.
    pub fn do_rollback(&mut self, surface: &mut dyn AdminSurface) -> WorkflowResult<WorkflowResponse> {
        let scope = self.scope("RECORD_ROLLBACK");
        if !self.permitted(Action::Rollback) {
            return self.reject(
                scope,
                AuditAction::Rollback,
                WorkflowError::PermissionDenied(Action::Rollback),
            );
        }
        let Some(id) = self.record.id.as_persisted() else {
            return self.reject(
                scope,
                AuditAction::Rollback,
                WorkflowError::NotPersisted(Action::Rollback),
            );
        };

        let result = self.rollback_record(id).map(|()| {
            surface.notify(
                &format!("Cancelled draft changes for \"{}\"", self.record.title),
                NoticeLevel::Good,
            );
            self.edit_view()
        });
        self.finish(scope, AuditAction::Rollback, result)
    }

    /// Deletes the record from both stages and drops its history.
    ///
    /// Without delete permission the caller is sent back with a flash
    /// message and nothing changes.
    pub fn do_delete(&mut self, surface: &mut dyn AdminSurface) -> WorkflowResult<WorkflowResponse> {
        let scope = self.scope("RECORD_DELETE");
        if !self.permitted(Action::Delete) {
            let denied = WorkflowError::DeletePermissionDenied;
            surface.notify(&denied.to_string(), NoticeLevel::Bad);
            surface.redirect_back();
            self.log_rejection(Action::Delete);
            let message = denied.to_string();
            self.audit_quietly(AuditAction::Delete, AuditOutcome::Rejected, Some(&message));
            scope.reject(&message);
            return Ok(WorkflowResponse::RedirectBack);
        }

        let result = self.delete_record().map(|()| {
            surface.notify(
                &format!(
                    "Deleted {} \"{}\"",
                    self.record_type.singular_name(),
                    self.record.title
                ),
                NoticeLevel::Good,
            );
            surface.mark_partial_refresh();
            surface.redirect(&self.back_link, self.delete_redirect);
            WorkflowResponse::Redirect {
                url: self.back_link.clone(),
                status: self.delete_redirect,
            }
        });
        self.finish(scope, AuditAction::Delete, result)
    }

    /// Brings a record deleted from Draft back onto the Draft stage.
    ///
    /// Returns the canonical Draft record, which also replaces the record held
    /// by this request.
    pub fn do_restore_to_stage(&mut self) -> WorkflowResult<Record> {
        let scope = self.scope("RECORD_RESTORE_TO_STAGE");
        if !self.permitted(Action::RestoreToStage) {
            return self.reject(
                scope,
                AuditAction::RestoreToStage,
                WorkflowError::PermissionDenied(Action::RestoreToStage),
            );
        }
        let Some(id) = self.record.id.as_persisted() else {
            return self.reject(
                scope,
                AuditAction::RestoreToStage,
                WorkflowError::NotPersisted(Action::RestoreToStage),
            );
        };

        let result = self.restore_record(id);
        self.finish(scope, AuditAction::RestoreToStage, result)
    }

    // =========================================================================
    // STORE STEPS
    // =========================================================================

    fn write_draft(&mut self, form: &FormData) -> WorkflowResult<()> {
        let _draft = self.context.enter(Stage::Draft);
        self.record.save_from(form);
        self.store.write_to_stage(&mut self.record, Stage::Draft)?;
        Ok(())
    }

    fn publish_record(
        &mut self,
        form: &FormData,
        surface: &mut dyn AdminSurface,
    ) -> WorkflowResult<()> {
        self.record.save_from(form);
        self.store.write_to_stage(&mut self.record, Stage::Draft)?;
        surface.add_to_listing(&self.record);

        let id = self
            .record
            .id
            .as_persisted()
            .ok_or(WorkflowError::NotPersisted(Action::Publish))?;

        match self.record_type.custom_publisher() {
            Some(publisher) => {
                publisher.publish(self.store, &self.record, Stage::Draft, Stage::Live)?
            }
            None => {
                self.store.copy_stage_to_stage(
                    self.record_type.base_table(),
                    id,
                    Stage::Draft,
                    Stage::Live,
                    false,
                )?;
            }
        }

        surface.notify(
            &format!(
                "Published {} \"{}\"",
                self.record_type.singular_name(),
                self.record.title
            ),
            NoticeLevel::Good,
        );
        Ok(())
    }

    fn silent_publish_record(
        &mut self,
        id: u64,
        form: &FormData,
        surface: &mut dyn AdminSurface,
    ) -> WorkflowResult<()> {
        let record_type = self.record_type;
        let base_table = record_type.base_table();
        let Some(live) = self.store.get_by_id(base_table, Stage::Live, id)? else {
            return Err(WorkflowError::Unsupported(String::from(
                "silent publishing needs a published record",
            )));
        };
        let last_edited = live.last_edited;

        self.publish_record(form, surface)?;
        self.store
            .update_last_edited(base_table, Stage::Live, id, last_edited)?;
        Ok(())
    }

    fn rollback_record(&mut self, id: u64) -> WorkflowResult<()> {
        let record_type = self.record_type;
        let base_table = record_type.base_table();
        self.store
            .copy_stage_to_stage(base_table, id, Stage::Live, Stage::Draft, false)?;
        if let Some(draft) = self.store.get_by_id(base_table, Stage::Draft, id)? {
            self.record = draft;
        }
        Ok(())
    }

    fn delete_record(&self) -> WorkflowResult<()> {
        let Some(id) = self.record.id.as_persisted() else {
            return Ok(());
        };
        let handle = &self.record;
        self.store.delete_from_stage(handle, Stage::Draft)?;
        self.store.delete_record_everywhere(handle)?;
        let purged = self
            .store
            .purge_version_history(self.record_type.base_table(), id)?;

        log_event_with_fields(
            Event::VersionHistoryPurged,
            &[
                ("class", self.record_type.class_name()),
                ("id", &id.to_string()),
                ("rows", &purged.to_string()),
            ],
        );
        Ok(())
    }

    fn restore_record(&mut self, id: u64) -> WorkflowResult<Record> {
        let record_type = self.record_type;
        let base_table = record_type.base_table();

        if self.store.get_by_id(base_table, Stage::Draft, id)?.is_none() {
            self.store.allow_primary_key_editing(base_table, true)?;
            let inserted =
                self.store
                    .insert_placeholder(base_table, self.record_type.class_name(), id);
            self.store.allow_primary_key_editing(base_table, false)?;
            inserted?;

            log_event_with_fields(
                Event::PlaceholderInserted,
                &[("class", self.record_type.class_name()), ("id", &id.to_string())],
            );
        }

        let _draft = self.context.enter(Stage::Draft);
        self.record.force_change();
        self.store.write_to_stage(&mut self.record, Stage::Draft)?;

        let restored = self
            .store
            .get_by_id(base_table, Stage::Draft, id)?
            .ok_or_else(|| WorkflowError::RecordNotFound {
                class_name: self.record_type.class_name().to_string(),
                id: id.to_string(),
            })?;
        self.record = restored.clone();
        Ok(restored)
    }

    // =========================================================================
    // OBSERVABILITY
    // =========================================================================

    fn edit_view(&self) -> WorkflowResponse {
        WorkflowResponse::EditView(self.record.clone())
    }

    fn scope(&self, name: &'static str) -> ObservationScope<'static> {
        ObservationScope::with_fields(
            name,
            &[
                ("class", self.record_type.class_name()),
                ("id", &self.record.id.to_string()),
            ],
        )
    }

    fn log_rejection(&self, action: Action) {
        log_event_with_fields(
            Event::PermissionRejected,
            &[
                ("action", action.as_str()),
                ("class", self.record_type.class_name()),
                ("id", &self.record.id.to_string()),
            ],
        );
    }

    fn audit_record(
        &self,
        action: AuditAction,
        outcome: AuditOutcome,
        error: Option<&str>,
    ) -> AuditRecord {
        let mut record = AuditRecord::new(action, outcome)
            .with_class(self.record_type.class_name())
            .with_record_id(&self.record.id)
            .with_title(self.record.title.clone());
        if let Some(operator) = self.permissions.operator() {
            record = record.with_operator(operator);
        }
        if let Some(error) = error {
            record = record.with_error(error);
        }
        record
    }

    fn audit(
        &self,
        action: AuditAction,
        outcome: AuditOutcome,
        error: Option<&str>,
    ) -> std::io::Result<()> {
        match self.audit {
            Some(log) => log.append(&self.audit_record(action, outcome, error)),
            None => Ok(()),
        }
    }

    /// Audits a refusal or failure; a failing audit log must not mask the
    /// original error.
    fn audit_quietly(&self, action: AuditAction, outcome: AuditOutcome, error: Option<&str>) {
        if let Err(e) = self.audit(action, outcome, error) {
            log_event_with_fields(
                Event::AuditWriteFailed,
                &[("action", action.as_str()), ("error", &e.to_string())],
            );
        }
    }

    fn reject<T>(
        &self,
        scope: ObservationScope<'_>,
        action: AuditAction,
        error: WorkflowError,
    ) -> WorkflowResult<T> {
        if let WorkflowError::PermissionDenied(denied) = &error {
            self.log_rejection(*denied);
        }
        let message = error.to_string();
        self.audit_quietly(action, AuditOutcome::Rejected, Some(&message));
        scope.reject(&message);
        Err(error)
    }

    fn finish<T>(
        &self,
        scope: ObservationScope<'_>,
        action: AuditAction,
        result: WorkflowResult<T>,
    ) -> WorkflowResult<T> {
        match result {
            Ok(value) => match self.audit(action, AuditOutcome::Success, None) {
                Ok(()) => {
                    scope.complete();
                    Ok(value)
                }
                Err(e) => {
                    log_event_with_fields(
                        Event::AuditWriteFailed,
                        &[("action", action.as_str()), ("error", &e.to_string())],
                    );
                    scope.fail(&e.to_string());
                    Err(WorkflowError::Audit(e))
                }
            },
            Err(error) => {
                let message = error.to_string();
                let outcome = if error.is_rejection() {
                    AuditOutcome::Rejected
                } else {
                    AuditOutcome::Failed
                };
                self.audit_quietly(action, outcome, Some(&message));
                if error.is_fatal() {
                    scope.fail_fatal(&message);
                } else if error.is_rejection() {
                    scope.reject(&message);
                } else {
                    scope.fail(&message);
                }
                Err(error)
            }
        }
    }
}
