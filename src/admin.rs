//! Versioned model admin
//!
//! Registry of the record types an admin section manages. Each request gets
//! its own `ReadingContext`, starting on the Draft stage, and records are
//! loaded into a `VersionedItemRequest` for the edit form.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::AdminConfig;
use crate::observability::{log_event_with_fields, AuditLog, Event, FileAuditLog};
use crate::policy::{ActionPolicy, RecordPermissions};
use crate::record::{Record, RecordId, RecordType, Stage};
use crate::store::{FileStageStore, RecordFilter, StageStore};
use crate::workflow::{ReadingContext, VersionedItemRequest, WorkflowError, WorkflowResult};

/// Admin section for versioned record types.
pub struct VersionedModelAdmin {
    store: Arc<dyn StageStore>,
    audit: Option<Arc<dyn AuditLog>>,
    types: BTreeMap<String, RecordType>,
    config: AdminConfig,
}

impl VersionedModelAdmin {
    pub fn new(store: Arc<dyn StageStore>, config: AdminConfig) -> Self {
        Self {
            store,
            audit: None,
            types: BTreeMap::new(),
            config,
        }
    }

    /// Opens the journal-backed store and the audit log named by `config`.
    pub fn open(config: AdminConfig) -> WorkflowResult<Self> {
        config.validate()?;
        config.apply_logging();

        let store = FileStageStore::open(&config.data_dir)?;
        let audit = match config.audit_log {
            Some(ref path) => Some(Arc::new(FileAuditLog::open(path)?) as Arc<dyn AuditLog>),
            None => None,
        };

        let mut admin = Self::new(Arc::new(store), config);
        admin.audit = audit;
        Ok(admin)
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn StageStore {
        self.store.as_ref()
    }

    /// Registers a versioned record type.
    pub fn register(&mut self, record_type: RecordType) -> WorkflowResult<()> {
        if !record_type.is_versioned() {
            return Err(WorkflowError::Unsupported(format!(
                "{} is not versioned",
                record_type.class_name()
            )));
        }

        log_event_with_fields(
            Event::RecordTypeRegistered,
            &[
                ("base_table", record_type.base_table()),
                ("class", record_type.class_name()),
            ],
        );
        self.types
            .insert(record_type.class_name().to_string(), record_type);
        Ok(())
    }

    pub fn record_type(&self, class_name: &str) -> Option<&RecordType> {
        self.types.get(class_name)
    }

    pub fn record_types(&self) -> impl Iterator<Item = &RecordType> {
        self.types.values()
    }

    fn managed(&self, class_name: &str) -> WorkflowResult<&RecordType> {
        self.record_type(class_name).ok_or_else(|| {
            WorkflowError::Unsupported(format!("{} is not managed here", class_name))
        })
    }

    /// Starts a request on the Draft stage.
    pub fn init_request(&self) -> ReadingContext {
        let context = ReadingContext::default();
        context.set(Stage::Draft);
        log_event_with_fields(Event::AdminInit, &[("stage", context.current().as_str())]);
        context
    }

    /// Listing URL of a managed class.
    pub fn listing_link(&self, class_name: &str) -> String {
        format!("/admin/{}", class_name)
    }

    /// Records of a class as they exist on `stage`.
    pub fn listing(&self, class_name: &str, stage: Stage) -> WorkflowResult<Vec<Record>> {
        let record_type = self.managed(class_name)?;
        Ok(self.store.get_by_stage(
            record_type.base_table(),
            stage,
            &RecordFilter::all().class(class_name),
        )?)
    }

    /// Loads a record for editing.
    ///
    /// New ids yield a blank record. Persisted ids are read from Draft, then
    /// from Live for records deleted from the draft site.
    pub fn load(&self, class_name: &str, raw_id: Option<&str>) -> WorkflowResult<Record> {
        let record_type = self.managed(class_name)?;
        let id = RecordId::parse(raw_id)?;

        let Some(numeric) = id.as_persisted() else {
            return Ok(record_type.blank_record(id));
        };

        for stage in [Stage::Draft, Stage::Live] {
            if let Some(record) = self
                .store
                .get_by_id(record_type.base_table(), stage, numeric)?
                .filter(|r| r.class_name == class_name)
            {
                log_event_with_fields(
                    Event::RecordLoaded,
                    &[
                        ("class", class_name),
                        ("id", &numeric.to_string()),
                        ("stage", stage.as_str()),
                    ],
                );
                return Ok(record);
            }
        }

        Err(WorkflowError::RecordNotFound {
            class_name: class_name.to_string(),
            id: numeric.to_string(),
        })
    }

    /// Builds the edit form handler for a record.
    pub fn item_request<'a>(
        &'a self,
        class_name: &str,
        raw_id: Option<&str>,
        permissions: &'a dyn RecordPermissions,
        context: &'a ReadingContext,
    ) -> WorkflowResult<VersionedItemRequest<'a>> {
        let record = self.load(class_name, raw_id)?;
        let record_type = self.managed(class_name)?;

        let mut request = VersionedItemRequest::new(
            self.store.as_ref(),
            record_type,
            record,
            permissions,
            context,
        )
        .with_policy(ActionPolicy::new().with_preview_stage(&self.config.preview_stage_param))
        .with_back_link(self.listing_link(class_name))
        .with_delete_redirect(self.config.delete_redirect_status);

        if let Some(ref audit) = self.audit {
            request = request.with_audit(audit.as_ref());
        }
        Ok(request)
    }
}
