//! Publish Workflow Tests
//!
//! Transitions against an in-memory store:
//! - publish makes the record live without creating a version
//! - unpublish removes only the Live copy
//! - rollback restores Live content onto Draft without a new version
//! - silent publish keeps the Live last-edited value
//! - delete removes both stages and the version history
//! - refusals change nothing and are audited

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use versioned_admin::observability::{AuditAction, AuditOutcome, MemoryAuditLog};
use versioned_admin::policy::{Action, Grants};
use versioned_admin::record::{
    CustomPublishable, FormData, Record, RecordId, RecordType, Stage, VersionNumber,
};
use versioned_admin::store::{
    Effect, Journal, MemoryStageStore, StageStore, StageTables, StoreError, StoreErrorCode,
    StoreResult, TableStageStore,
};
use versioned_admin::workflow::{
    NoticeLevel, ReadingContext, RecordedSurface, RedirectStatus, VersionedItemRequest,
    WorkflowError, WorkflowResponse,
};

// =============================================================================
// Test Utilities
// =============================================================================

fn form(value: Value) -> FormData {
    match value {
        Value::Object(map) => map,
        _ => panic!("form must be an object"),
    }
}

fn article_type() -> RecordType {
    RecordType::new("Article").with_singular_name("Article")
}

/// Writes a draft article and returns its record.
fn draft(store: &impl StageStore, title: &str) -> Record {
    let mut record = Record::new(RecordId::Unsaved, "Article", "Article").with_title(title);
    store.write_to_stage(&mut record, Stage::Draft).unwrap();
    record
}

/// Writes and publishes an article.
fn published(store: &impl StageStore, title: &str) -> Record {
    let record = draft(store, title);
    let id = record.id.as_persisted().unwrap();
    store
        .copy_stage_to_stage("Article", id, Stage::Draft, Stage::Live, false)
        .unwrap();
    record
}

fn request<'a>(
    store: &'a dyn StageStore,
    ty: &'a RecordType,
    record: Record,
    grants: &'a Grants,
    context: &'a ReadingContext,
) -> VersionedItemRequest<'a> {
    VersionedItemRequest::new(store, ty, record, grants, context).with_back_link("/admin/Article")
}

/// Journal that accepts a limited number of batches, then refuses every write.
struct LimitedJournal {
    remaining: Arc<AtomicUsize>,
}

impl Journal for LimitedJournal {
    fn append(&mut self, _effects: &[Effect]) -> StoreResult<()> {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map(|_| ())
            .map_err(|_| StoreError::write_failed_no_source("journal unavailable"))
    }
}

/// Store that accepts writes until the returned budget is lowered.
fn limited_store() -> (TableStageStore<LimitedJournal>, Arc<AtomicUsize>) {
    let remaining = Arc::new(AtomicUsize::new(usize::MAX));
    let journal = LimitedJournal {
        remaining: Arc::clone(&remaining),
    };
    (TableStageStore::with_journal(StageTables::new(), journal), remaining)
}

// =============================================================================
// Publish
// =============================================================================

#[test]
fn test_publish_makes_record_live() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let record = draft(&store, "Launch");
    let id = record.id.as_persisted().unwrap();

    let mut req = request(&store, &ty, record, &grants, &context);
    let mut surface = RecordedSurface::new();
    let response = req
        .do_publish(&form(json!({"Title": "Launch day"})), &mut surface)
        .unwrap();

    assert!(matches!(response, WorkflowResponse::EditView(ref r) if r.title == "Launch day"));
    let status = req.status().unwrap();
    assert!(status.is_published);
    assert!(status.exists_on_live);
    assert!(!status.stages_differ);

    // Draft write creates version 2, the Live copy reuses it.
    assert_eq!(
        store.stage_version("Article", Stage::Live, id).unwrap(),
        Some(VersionNumber::new(2))
    );
    let history = store.version_history("Article", id).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[1].was_published);

    assert_eq!(
        surface.last_notice(),
        Some(("Published Article \"Launch day\"", NoticeLevel::Good))
    );
    assert_eq!(surface.listing, vec![RecordId::Persisted(id)]);
}

#[test]
fn test_publish_transient_record_assigns_id() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let record = ty.blank_record(RecordId::Transient("new-1".into()));

    let mut req = request(&store, &ty, record, &grants, &context);
    req.do_publish(&form(json!({"Title": "Fresh"})), &mut RecordedSurface::new())
        .unwrap();

    assert_eq!(req.record().id, RecordId::Persisted(1));
    assert!(req.status().unwrap().is_published);
}

#[test]
fn test_publish_without_permission_changes_nothing() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::author();
    let context = ReadingContext::default();
    let audit = MemoryAuditLog::new();
    let record = draft(&store, "Draft only");

    let mut req = request(&store, &ty, record, &grants, &context).with_audit(&audit);
    let mut surface = RecordedSurface::new();
    let err = req
        .do_publish(&form(json!({"Title": "Sneaky"})), &mut surface)
        .unwrap_err();

    assert!(matches!(err, WorkflowError::PermissionDenied(Action::Publish)));
    assert_eq!(err.status_code(), 403);
    assert_eq!(store.stage_version("Article", Stage::Live, 1).unwrap(), None);
    assert_eq!(
        store.get_by_id("Article", Stage::Draft, 1).unwrap().unwrap().title,
        "Draft only"
    );
    assert!(surface.notices.is_empty());

    let records = audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, AuditAction::Publish);
    assert_eq!(records[0].outcome, AuditOutcome::Rejected);
}

/// Publish hook that writes Live through the generic copy and counts calls.
struct CountingPublisher {
    calls: Mutex<Vec<(Stage, Stage)>>,
}

impl CustomPublishable for CountingPublisher {
    fn publish(
        &self,
        store: &dyn StageStore,
        record: &Record,
        from: Stage,
        to: Stage,
    ) -> StoreResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((from, to));
        }
        let id = record.id.as_persisted().unwrap_or_default();
        store.copy_stage_to_stage(&record.base_table, id, from, to, true)?;
        Ok(())
    }
}

#[test]
fn test_custom_publisher_replaces_generic_copy() {
    let store = MemoryStageStore::new();
    let publisher = Arc::new(CountingPublisher {
        calls: Mutex::new(Vec::new()),
    });
    let ty = article_type().with_custom_publish(publisher.clone());
    let grants = Grants::all();
    let context = ReadingContext::default();
    let record = draft(&store, "Hooked");

    let mut req = request(&store, &ty, record, &grants, &context);
    req.do_publish(&FormData::new(), &mut RecordedSurface::new())
        .unwrap();

    assert_eq!(
        *publisher.calls.lock().unwrap(),
        vec![(Stage::Draft, Stage::Live)]
    );
    // The hook created a new version instead of reusing the Draft one.
    assert_eq!(
        store.stage_version("Article", Stage::Live, 1).unwrap(),
        Some(VersionNumber::new(2))
    );
}

// =============================================================================
// Unpublish
// =============================================================================

#[test]
fn test_unpublish_keeps_draft_version() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::new(Stage::Draft);
    let record = published(&store, "Retired");
    let draft_before = store.stage_version("Article", Stage::Draft, 1).unwrap();

    let mut req = request(&store, &ty, record, &grants, &context);
    let mut surface = RecordedSurface::new();
    req.do_unpublish(&mut surface).unwrap();

    assert_eq!(store.stage_version("Article", Stage::Live, 1).unwrap(), None);
    assert_eq!(
        store.stage_version("Article", Stage::Draft, 1).unwrap(),
        draft_before
    );
    assert_eq!(req.record().id, RecordId::Persisted(1));
    assert_eq!(context.current(), Stage::Draft);
    assert_eq!(
        surface.last_notice(),
        Some(("Unpublished Article \"Retired\"", NoticeLevel::Good))
    );
}

#[test]
fn test_delete_from_live_is_unpublish() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let record = published(&store, "Gone");

    let mut req = request(&store, &ty, record, &grants, &context);
    req.do_delete_from_live(&mut RecordedSurface::new()).unwrap();

    assert!(!req.status().unwrap().is_published);
}

#[test]
fn test_unpublish_requires_publish_permission() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::author();
    let context = ReadingContext::default();
    let record = published(&store, "Stays");

    let mut req = request(&store, &ty, record, &grants, &context);
    let err = req.do_unpublish(&mut RecordedSurface::new()).unwrap_err();

    assert_eq!(err.status_code(), 403);
    assert!(req.status().unwrap().is_published);
}

#[test]
fn test_failed_unpublish_restores_reading_stage() {
    let (store, remaining) = limited_store();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let audit = MemoryAuditLog::new();
    let record = published(&store, "Sticky");
    remaining.store(0, Ordering::SeqCst);

    let mut req = request(&store, &ty, record, &grants, &context).with_audit(&audit);
    let mut surface = RecordedSurface::new();
    let err = req.do_unpublish(&mut surface).unwrap_err();

    assert!(matches!(err, WorkflowError::Store(_)));
    assert_eq!(err.status_code(), 500);
    assert_eq!(context.current(), Stage::Draft);
    assert!(store.get_by_id("Article", Stage::Live, 1).unwrap().is_some());
    assert!(surface.notices.is_empty());
    assert_eq!(audit.records()[0].outcome, AuditOutcome::Failed);
}

// =============================================================================
// Rollback
// =============================================================================

#[test]
fn test_rollback_restores_live_content_without_new_version() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let mut record = published(&store, "Original");

    record.title = "Edited".into();
    record.fields.insert("body".into(), json!("changed"));
    store.write_to_stage(&mut record, Stage::Draft).unwrap();
    let history_before = store.version_history("Article", 1).unwrap().len();

    let mut req = request(&store, &ty, record, &grants, &context);
    let mut surface = RecordedSurface::new();
    req.do_rollback(&mut surface).unwrap();

    let draft = store.get_by_id("Article", Stage::Draft, 1).unwrap().unwrap();
    let live = store.get_by_id("Article", Stage::Live, 1).unwrap().unwrap();
    assert_eq!(draft, live);
    assert_eq!(req.record().title, "Original");
    assert_eq!(
        store.version_history("Article", 1).unwrap().len(),
        history_before
    );
    assert!(!req.status().unwrap().stages_differ);
    assert_eq!(
        surface.last_notice(),
        Some(("Cancelled draft changes for \"Original\"", NoticeLevel::Good))
    );
}

#[test]
fn test_rollback_of_unsaved_record_is_refused() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::default();

    let mut req = request(&store, &ty, ty.blank_record(RecordId::Unsaved), &grants, &context);
    let err = req.do_rollback(&mut RecordedSurface::new()).unwrap_err();
    assert!(matches!(err, WorkflowError::NotPersisted(Action::Rollback)));
}

// =============================================================================
// Silent publish
// =============================================================================

#[test]
fn test_silent_publish_keeps_live_last_edited() {
    let store = MemoryStageStore::new();
    let ty = article_type().with_silent_publish();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let record = published(&store, "Steady");

    let earlier = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
    store
        .update_last_edited("Article", Stage::Live, 1, Some(earlier))
        .unwrap();

    let mut req = request(&store, &ty, record, &grants, &context);
    req.do_silent_publish(
        &form(json!({"Title": "Steady (typo fixed)", "body": "v2"})),
        &mut RecordedSurface::new(),
    )
    .unwrap();

    let live = store.get_by_id("Article", Stage::Live, 1).unwrap().unwrap();
    assert_eq!(live.last_edited, Some(earlier));
    assert_eq!(live.title, "Steady (typo fixed)");
    assert_eq!(live.field("body"), Some(&json!("v2")));

    let draft = store.get_by_id("Article", Stage::Draft, 1).unwrap().unwrap();
    assert_ne!(draft.last_edited, Some(earlier));
}

#[test]
fn test_silent_publish_requires_opt_in() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let record = published(&store, "Loud");

    let mut req = request(&store, &ty, record, &grants, &context);
    let err = req
        .do_silent_publish(&FormData::new(), &mut RecordedSurface::new())
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Unsupported(_)));
}

#[test]
fn test_silent_publish_requires_published_record() {
    let store = MemoryStageStore::new();
    let ty = article_type().with_silent_publish();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let record = draft(&store, "Never live");

    let mut req = request(&store, &ty, record, &grants, &context);
    let err = req
        .do_silent_publish(&FormData::new(), &mut RecordedSurface::new())
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Unsupported(_)));
    assert!(!req.status().unwrap().is_published);
}

// =============================================================================
// Delete
// =============================================================================

#[test]
fn test_delete_removes_everything() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let mut record = draft(&store, "Temporary");
    record.title = "Temporary v2".into();
    store.write_to_stage(&mut record, Stage::Draft).unwrap();

    let mut req = request(&store, &ty, record, &grants, &context);
    let mut surface = RecordedSurface::new();
    let response = req.do_delete(&mut surface).unwrap();

    assert_eq!(
        response,
        WorkflowResponse::Redirect {
            url: "/admin/Article".into(),
            status: RedirectStatus::SeeOther,
        }
    );
    assert!(store.version_history("Article", 1).unwrap().is_empty());
    assert!(store.get_by_id("Article", Stage::Draft, 1).unwrap().is_none());
    assert!(store.get_by_id("Article", Stage::Live, 1).unwrap().is_none());
    assert!(surface.partial_refresh);
    assert_eq!(
        surface.last_notice(),
        Some(("Deleted Article \"Temporary v2\"", NoticeLevel::Good))
    );
    assert_eq!(
        surface.last_redirect(),
        Some(("/admin/Article", RedirectStatus::SeeOther))
    );
}

#[test]
fn test_delete_also_removes_live_copy() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let record = published(&store, "Everywhere");

    let mut req = request(&store, &ty, record, &grants, &context)
        .with_delete_redirect(RedirectStatus::Found);
    let response = req.do_delete(&mut RecordedSurface::new()).unwrap();

    assert!(matches!(
        response,
        WorkflowResponse::Redirect {
            status: RedirectStatus::Found,
            ..
        }
    ));
    assert!(store.get_by_id("Article", Stage::Live, 1).unwrap().is_none());
    assert!(store.version_history("Article", 1).unwrap().is_empty());
}

#[test]
fn test_failed_delete_sends_no_success_notice() {
    let (store, remaining) = limited_store();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let record = draft(&store, "Stuck");
    remaining.store(0, Ordering::SeqCst);

    let mut req = request(&store, &ty, record, &grants, &context);
    let mut surface = RecordedSurface::new();
    let err = req.do_delete(&mut surface).unwrap_err();

    assert_eq!(err.status_code(), 500);
    assert!(surface.notices.is_empty());
    assert!(!surface.partial_refresh);
    assert!(surface.redirects.is_empty());
    assert!(store.get_by_id("Article", Stage::Draft, 1).unwrap().is_some());
}

#[test]
fn test_delete_without_permission_flashes_and_goes_back() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all().with_delete(false);
    let context = ReadingContext::default();
    let audit = MemoryAuditLog::new();
    let record = draft(&store, "Protected");

    let mut req = request(&store, &ty, record, &grants, &context).with_audit(&audit);
    let mut surface = RecordedSurface::new();
    let response = req.do_delete(&mut surface).unwrap();

    assert_eq!(response, WorkflowResponse::RedirectBack);
    assert_eq!(
        surface.last_notice(),
        Some(("No delete permissions", NoticeLevel::Bad))
    );
    assert_eq!(surface.redirected_back, 1);
    assert!(surface.redirects.is_empty());
    assert!(!surface.partial_refresh);
    assert!(store.get_by_id("Article", Stage::Draft, 1).unwrap().is_some());
    assert_eq!(store.version_history("Article", 1).unwrap().len(), 1);
    assert_eq!(audit.records()[0].outcome, AuditOutcome::Rejected);
}

// =============================================================================
// Restore to stage
// =============================================================================

#[test]
fn test_restore_recreates_deleted_draft() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::new(Stage::Live);
    let record = published(&store, "Comeback");
    store.delete_from_stage(&record, Stage::Draft).unwrap();

    let live = store.get_by_id("Article", Stage::Live, 1).unwrap().unwrap();
    let mut req = request(&store, &ty, live, &grants, &context);
    assert!(req.status().unwrap().is_deleted_from_stage);

    let restored = req.do_restore_to_stage().unwrap();

    assert_eq!(restored.title, "Comeback");
    assert_eq!(restored.id, RecordId::Persisted(1));
    assert!(!restored.force_changed);
    assert_eq!(
        store.stage_version("Article", Stage::Draft, 1).unwrap(),
        Some(VersionNumber::new(2))
    );
    assert!(!req.status().unwrap().is_deleted_from_stage);
    assert_eq!(context.current(), Stage::Live);

    // Primary key editing is switched off again.
    assert!(store.insert_placeholder("Article", "Article", 9).is_err());
}

#[test]
fn test_restore_with_existing_draft_forces_new_version() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let record = draft(&store, "Unchanged");

    let mut req = request(&store, &ty, record, &grants, &context);
    req.do_restore_to_stage().unwrap();

    assert_eq!(
        store.stage_version("Article", Stage::Draft, 1).unwrap(),
        Some(VersionNumber::new(2))
    );
}

#[test]
fn test_failed_restore_restores_reading_stage() {
    let (store, remaining) = limited_store();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::new(Stage::Live);
    let record = published(&store, "Half way");
    store.delete_from_stage(&record, Stage::Draft).unwrap();
    let live = store.get_by_id("Article", Stage::Live, 1).unwrap().unwrap();

    // The placeholder row goes through, the Draft write does not.
    remaining.store(1, Ordering::SeqCst);
    let mut req = request(&store, &ty, live, &grants, &context);
    let err = req.do_restore_to_stage().unwrap_err();

    assert!(matches!(err, WorkflowError::Store(_)));
    assert_eq!(context.current(), Stage::Live);
    assert_eq!(store.stage_version("Article", Stage::Draft, 1).unwrap(), None);

    let locked = store.insert_placeholder("Article", "Article", 9).unwrap_err();
    assert_eq!(locked.code(), StoreErrorCode::PrimaryKeyLocked);
}

#[test]
fn test_restore_refusals_name_the_restore() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let context = ReadingContext::default();
    let audit = MemoryAuditLog::new();
    let record = draft(&store, "Read only");

    let grants = Grants::none();
    let mut req = request(&store, &ty, record, &grants, &context).with_audit(&audit);
    let err = req.do_restore_to_stage().unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::PermissionDenied(Action::RestoreToStage)
    ));
    assert_eq!(audit.records()[0].action, AuditAction::RestoreToStage);
    assert_eq!(audit.records()[0].outcome, AuditOutcome::Rejected);

    let grants = Grants::all();
    let mut req = request(&store, &ty, ty.blank_record(RecordId::Unsaved), &grants, &context);
    let err = req.do_restore_to_stage().unwrap_err();
    assert!(matches!(err, WorkflowError::NotPersisted(Action::RestoreToStage)));
}

// =============================================================================
// Save and reading context
// =============================================================================

#[test]
fn test_save_writes_draft_and_restores_context() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::author();
    let context = ReadingContext::new(Stage::Live);
    let audit = MemoryAuditLog::new();

    let mut req = request(&store, &ty, ty.blank_record(RecordId::Unsaved), &grants, &context)
        .with_audit(&audit);
    let mut surface = RecordedSurface::new();
    req.do_save(&form(json!({"Title": "Notes", "ID": 99})), &mut surface)
        .unwrap();

    assert_eq!(context.current(), Stage::Live);
    assert_eq!(req.record().id, RecordId::Persisted(1));
    assert!(store.get_by_id("Article", Stage::Live, 1).unwrap().is_none());
    assert_eq!(
        surface.last_notice(),
        Some(("Saved Article \"Notes\"", NoticeLevel::Good))
    );
    assert_eq!(audit.records()[0].action, AuditAction::Save);
    assert_eq!(audit.records()[0].outcome, AuditOutcome::Success);
}

#[test]
fn test_save_without_edit_permission_is_refused() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::none();
    let context = ReadingContext::default();

    let mut req = request(&store, &ty, ty.blank_record(RecordId::Unsaved), &grants, &context);
    let err = req
        .do_save(&form(json!({"Title": "Nope"})), &mut RecordedSurface::new())
        .unwrap_err();

    assert!(matches!(err, WorkflowError::PermissionDenied(Action::Save)));
    assert!(store
        .get_by_stage("Article", Stage::Draft, &Default::default())
        .unwrap()
        .is_empty());
}

// =============================================================================
// Execute
// =============================================================================

#[test]
fn test_execute_refuses_actions_the_state_does_not_allow() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let record = draft(&store, "Unpublished");

    let mut req = request(&store, &ty, record, &grants, &context);
    let err = req
        .execute(Action::Rollback, &FormData::new(), &mut RecordedSurface::new())
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Unsupported(_)));

    let response = req
        .execute(Action::Publish, &FormData::new(), &mut RecordedSurface::new())
        .unwrap();
    assert!(matches!(response, WorkflowResponse::EditView(_)));
    assert!(req.status().unwrap().is_published);
}

#[test]
fn test_execute_routes_permission_failures_to_denial_path() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all().with_delete(false);
    let context = ReadingContext::default();
    let record = draft(&store, "Keep me");

    let mut req = request(&store, &ty, record, &grants, &context);
    let mut surface = RecordedSurface::new();
    let response = req
        .execute(Action::Delete, &FormData::new(), &mut surface)
        .unwrap();

    assert_eq!(response, WorkflowResponse::RedirectBack);
    assert_eq!(surface.redirected_back, 1);
}

#[test]
fn test_execute_delete_needs_edit_permission_too() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::none().with_delete(true);
    let context = ReadingContext::default();
    let record = published(&store, "Still live");

    let mut req = request(&store, &ty, record, &grants, &context);
    assert!(!req.available_actions().unwrap().is_offered(Action::Delete));

    let mut surface = RecordedSurface::new();
    let response = req
        .execute(Action::Delete, &FormData::new(), &mut surface)
        .unwrap();

    assert_eq!(response, WorkflowResponse::RedirectBack);
    assert_eq!(
        surface.last_notice(),
        Some(("No delete permissions", NoticeLevel::Bad))
    );
    assert!(store.get_by_id("Article", Stage::Draft, 1).unwrap().is_some());
    assert!(store.get_by_id("Article", Stage::Live, 1).unwrap().is_some());
    assert_eq!(store.version_history("Article", 1).unwrap().len(), 1);
}

#[test]
fn test_execute_refuses_delete_of_published_record() {
    let store = MemoryStageStore::new();
    let ty = article_type();
    let grants = Grants::all();
    let context = ReadingContext::default();
    let record = published(&store, "Published");

    let mut req = request(&store, &ty, record, &grants, &context);
    let err = req
        .execute(Action::Delete, &FormData::new(), &mut RecordedSurface::new())
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Unsupported(_)));
    assert!(store.get_by_id("Article", Stage::Live, 1).unwrap().is_some());
}
