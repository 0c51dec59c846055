//! Record type descriptors and capabilities
//!
//! A record type names a concrete class, the base table its stages are keyed
//! by, and the optional capabilities the publish workflow checks for:
//! - `CustomPublishable`: replaces the generic stage-to-stage copy on publish
//! - `Previewable`: resolves a link to the draft rendering of a record
//! - silent publish: opt-in flag, publish without bumping `last_edited` on Live

use std::fmt;
use std::sync::Arc;

use super::{Record, RecordId, Stage};
use crate::store::{StageStore, StoreResult};

/// Type-specific publish hook.
///
/// When a record type provides one, Publish calls it instead of the generic
/// `copy_stage_to_stage`.
pub trait CustomPublishable: Send + Sync {
    /// Copies `record` from stage `from` to stage `to`.
    fn publish(
        &self,
        store: &dyn StageStore,
        record: &Record,
        from: Stage,
        to: Stage,
    ) -> StoreResult<()>;
}

/// Preview capability.
pub trait Previewable: Send + Sync {
    /// Returns the public link of the record, if it has one.
    fn link(&self, record: &Record) -> Option<String>;
}

/// Descriptor of a managed record class.
#[derive(Clone)]
pub struct RecordType {
    class_name: String,
    base_table: String,
    singular_name: String,
    versioned: bool,
    silent_publish: bool,
    publisher: Option<Arc<dyn CustomPublishable>>,
    preview: Option<Arc<dyn Previewable>>,
}

impl RecordType {
    /// Creates a versioned type that is its own base table.
    pub fn new(class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        Self {
            base_table: class_name.clone(),
            singular_name: class_name.clone(),
            class_name,
            versioned: true,
            silent_publish: false,
            publisher: None,
            preview: None,
        }
    }

    /// Sets the root table of the class hierarchy.
    pub fn with_base_table(mut self, base_table: impl Into<String>) -> Self {
        self.base_table = base_table.into();
        self
    }

    /// Sets the human readable singular name used in notifications.
    pub fn with_singular_name(mut self, name: impl Into<String>) -> Self {
        self.singular_name = name.into();
        self
    }

    /// Marks the type as not versioned.
    pub fn unversioned(mut self) -> Self {
        self.versioned = false;
        self
    }

    /// Opts the type in to silent publishing.
    pub fn with_silent_publish(mut self) -> Self {
        self.silent_publish = true;
        self
    }

    /// Installs a custom publish hook.
    pub fn with_custom_publish(mut self, publisher: Arc<dyn CustomPublishable>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Installs the preview capability.
    pub fn with_preview(mut self, preview: Arc<dyn Previewable>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn base_table(&self) -> &str {
        &self.base_table
    }

    pub fn singular_name(&self) -> &str {
        &self.singular_name
    }

    pub fn is_versioned(&self) -> bool {
        self.versioned
    }

    pub fn supports_silent_publish(&self) -> bool {
        self.silent_publish
    }

    pub fn supports_preview(&self) -> bool {
        self.preview.is_some()
    }

    /// Returns the custom publish hook, if any.
    pub fn custom_publisher(&self) -> Option<&dyn CustomPublishable> {
        self.publisher.as_deref()
    }

    /// Resolves the record link through the preview capability.
    ///
    /// Empty links count as no link.
    pub fn link(&self, record: &Record) -> Option<String> {
        self.preview
            .as_ref()
            .and_then(|preview| preview.link(record))
            .filter(|link| !link.is_empty())
    }

    /// Creates an empty record of this type.
    pub fn blank_record(&self, id: RecordId) -> Record {
        Record::new(id, self.class_name.clone(), self.base_table.clone())
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("class_name", &self.class_name)
            .field("base_table", &self.base_table)
            .field("singular_name", &self.singular_name)
            .field("versioned", &self.versioned)
            .field("silent_publish", &self.silent_publish)
            .field("custom_publish", &self.publisher.is_some())
            .field("preview", &self.preview.is_some())
            .finish()
    }
}
