//! Action Availability Tests
//!
//! Offered actions for records in every stage combination, driven through
//! the admin registry and a shared in-memory store.

use std::sync::Arc;

use versioned_admin::observability::MemoryAuditLog;
use versioned_admin::policy::{Action, ActionGroup, Grants, RecordPermissions};
use versioned_admin::record::{Previewable, Record, RecordId, RecordType, Stage};
use versioned_admin::store::{MemoryStageStore, StageStore};
use versioned_admin::workflow::RecordedSurface;
use versioned_admin::{AdminConfig, VersionedModelAdmin};

// =============================================================================
// Test Utilities
// =============================================================================

struct SlugLink;

impl Previewable for SlugLink {
    fn link(&self, record: &Record) -> Option<String> {
        record
            .field("slug")
            .and_then(|v| v.as_str())
            .map(|slug| format!("/news/{}", slug))
    }
}

fn admin() -> VersionedModelAdmin {
    let mut admin =
        VersionedModelAdmin::new(Arc::new(MemoryStageStore::new()), AdminConfig::default());
    admin
        .register(
            RecordType::new("NewsItem")
                .with_singular_name("News Item")
                .with_silent_publish()
                .with_preview(Arc::new(SlugLink)),
        )
        .unwrap();
    admin
}

fn write(admin: &VersionedModelAdmin, title: &str, slug: &str) -> u64 {
    let mut record = Record::new(RecordId::Unsaved, "NewsItem", "NewsItem")
        .with_title(title)
        .with_field("slug", slug);
    admin.store().write_to_stage(&mut record, Stage::Draft).unwrap();
    record.id.as_persisted().unwrap()
}

fn publish(admin: &VersionedModelAdmin, id: u64) {
    admin
        .store()
        .copy_stage_to_stage("NewsItem", id, Stage::Draft, Stage::Live, false)
        .unwrap();
}

fn offered(admin: &VersionedModelAdmin, id: &str, grants: &Grants) -> Vec<Action> {
    let context = admin.init_request();
    let request = admin.item_request("NewsItem", Some(id), grants, &context).unwrap();
    request
        .available_actions()
        .unwrap()
        .iter()
        .filter(|a| a.enabled)
        .map(|a| a.action)
        .collect()
}

// =============================================================================
// Stage combinations
// =============================================================================

#[test]
fn test_draft_only_record() {
    let admin = admin();
    let id = write(&admin, "Draft", "draft");

    assert_eq!(
        offered(&admin, &id.to_string(), &Grants::all()),
        vec![Action::Delete, Action::Save, Action::Publish, Action::Preview]
    );
}

#[test]
fn test_published_unchanged_record() {
    let admin = admin();
    let id = write(&admin, "Live", "live");
    publish(&admin, id);

    assert_eq!(
        offered(&admin, &id.to_string(), &Grants::all()),
        vec![
            Action::Unpublish,
            Action::Save,
            Action::Publish,
            Action::SilentPublish,
            Action::Preview
        ]
    );
}

#[test]
fn test_published_modified_record() {
    let admin = admin();
    let id = write(&admin, "Live", "live");
    publish(&admin, id);
    let mut record = admin.load("NewsItem", Some(&id.to_string())).unwrap();
    record.title = "Live, edited".into();
    admin.store().write_to_stage(&mut record, Stage::Draft).unwrap();

    let actions = offered(&admin, &id.to_string(), &Grants::all());
    assert!(actions.contains(&Action::Rollback));
    assert!(actions.contains(&Action::Unpublish));
    assert!(!actions.contains(&Action::Delete));
}

#[test]
fn test_deleted_from_stage_record() {
    let admin = admin();
    let id = write(&admin, "Orphan", "orphan");
    publish(&admin, id);
    let record = admin.load("NewsItem", Some(&id.to_string())).unwrap();
    admin.store().delete_from_stage(&record, Stage::Draft).unwrap();

    let grants = Grants::all();
    let context = admin.init_request();
    let request = admin
        .item_request("NewsItem", Some(&id.to_string()), &grants, &context)
        .unwrap();
    let actions = request.available_actions().unwrap();

    assert!(!actions.is_offered(Action::Unpublish));
    assert!(!actions.is_offered(Action::Rollback));
    assert!(!actions.is_offered(Action::Delete));
    assert!(actions.is_offered(Action::Save));

    let save_and_publish = actions.get(Action::Publish).unwrap();
    assert!(!save_and_publish.enabled);
    assert_eq!(
        save_and_publish.disabled_reason.as_deref(),
        Some("Restore the draft before publishing")
    );
}

// =============================================================================
// Permissions
// =============================================================================

#[test]
fn test_read_only_caller_sees_disabled_publish_only() {
    let admin = admin();
    let id = write(&admin, "Draft", "draft");

    let grants = Grants::none();
    let context = admin.init_request();
    let request = admin
        .item_request("NewsItem", Some(&id.to_string()), &grants, &context)
        .unwrap();
    let actions = request.available_actions().unwrap();

    let listed: Vec<_> = actions.iter().map(|a| a.action).collect();
    assert_eq!(listed, vec![Action::Publish, Action::Preview]);
    assert!(!actions.is_offered(Action::Publish));
    assert_eq!(
        actions.get(Action::Publish).unwrap().disabled_reason.as_deref(),
        Some("No publish permissions")
    );
}

/// Publishing allowed, but removing Live copies is not.
struct NoTakedown;

impl RecordPermissions for NoTakedown {
    fn can_edit(&self, _record: &Record) -> bool {
        true
    }

    fn can_delete(&self, _record: &Record) -> bool {
        true
    }

    fn can_publish(&self, _record: &Record) -> bool {
        true
    }

    fn can_delete_from_live(&self, _record: &Record) -> bool {
        false
    }
}

#[test]
fn test_unpublish_needs_delete_from_live() {
    let admin = admin();
    let id = write(&admin, "Live", "live");
    publish(&admin, id);

    let context = admin.init_request();
    let mut request = admin
        .item_request("NewsItem", Some(&id.to_string()), &NoTakedown, &context)
        .unwrap();
    assert!(!request.available_actions().unwrap().is_offered(Action::Unpublish));

    let err = request.do_unpublish(&mut RecordedSurface::new()).unwrap_err();
    assert_eq!(err.status_code(), 403);
}

// =============================================================================
// Metadata
// =============================================================================

#[test]
fn test_action_metadata() {
    let admin = admin();
    let id = write(&admin, "Live", "launch");
    publish(&admin, id);

    let grants = Grants::all();
    let context = admin.init_request();
    let request = admin
        .item_request("NewsItem", Some(&id.to_string()), &grants, &context)
        .unwrap();
    let actions = request.available_actions().unwrap();

    let unpublish = actions.get(Action::Unpublish).unwrap();
    assert_eq!(unpublish.label, "Unpublish");
    assert_eq!(
        unpublish.description.as_deref(),
        Some("Remove this NewsItem from the published site")
    );
    assert_eq!(unpublish.group, ActionGroup::Minor);
    assert!(unpublish.destructive);

    let save_and_publish = actions.get(Action::Publish).unwrap();
    assert_eq!(save_and_publish.label, "Save & Publish");
    assert_eq!(save_and_publish.group, ActionGroup::Major);

    assert_eq!(actions.preview_link(), Some("/news/launch?stage=Stage"));
}

#[test]
fn test_preview_hidden_without_link() {
    let admin = admin();
    let mut record = Record::new(RecordId::Unsaved, "NewsItem", "NewsItem").with_title("No slug");
    admin.store().write_to_stage(&mut record, Stage::Draft).unwrap();
    let id = record.id.to_string();

    assert!(!offered(&admin, &id, &Grants::all()).contains(&Action::Preview));
}

#[test]
fn test_preview_stage_comes_from_config() {
    let config = AdminConfig {
        preview_stage_param: "Draft".into(),
        ..AdminConfig::default()
    };
    let mut admin = VersionedModelAdmin::new(Arc::new(MemoryStageStore::new()), config)
        .with_audit(Arc::new(MemoryAuditLog::new()));
    admin
        .register(RecordType::new("NewsItem").with_preview(Arc::new(SlugLink)))
        .unwrap();
    let id = write(&admin, "Item", "item");

    let grants = Grants::all();
    let context = admin.init_request();
    let request = admin
        .item_request("NewsItem", Some(&id.to_string()), &grants, &context)
        .unwrap();
    assert_eq!(
        request.available_actions().unwrap().preview_link(),
        Some("/news/item?stage=Draft")
    );
}
