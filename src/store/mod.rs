//! Stage Store
//!
//! The store persists the Draft copy and the Live copy of each record
//! separately, each with its own version number, plus a version-history
//! table per base table.
//!
//! The publish workflow only depends on the `StageStore` trait. Two
//! implementations are provided:
//! - `MemoryStageStore` - volatile tables, for tests and embedding
//! - `FileStageStore` - tables rebuilt from an append-only, checksummed journal
//!
//! Every operation takes the stage explicitly; there is no ambient reading
//! stage inside the store.

mod engine;
mod errors;
mod journal;
mod tables;

pub use engine::{Journal, MemoryStageStore, TableStageStore, Volatile};
pub use errors::{StoreError, StoreErrorCode, StoreResult};
pub use journal::{FileJournal, FileStageStore, JOURNAL_FILE};
pub use tables::{Effect, StageRow, StageTables};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{Record, Stage, VersionNumber};

/// Query filter for `get_by_stage`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    class_name: Option<String>,
    ids: Option<Vec<u64>>,
}

impl RecordFilter {
    /// Matches every record of the base table.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts to one concrete class.
    pub fn class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Restricts to a set of ids.
    pub fn ids(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some(ref class_name) = self.class_name {
            if &record.class_name != class_name {
                return false;
            }
        }
        if let Some(ref ids) = self.ids {
            match record.id.as_persisted() {
                Some(id) if ids.contains(&id) => {}
                _ => return false,
            }
        }
        true
    }
}

/// A row of the version-history table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRow {
    pub record_id: u64,
    pub version: VersionNumber,
    /// Whether this version has been copied to Live.
    pub was_published: bool,
    pub created: DateTime<Utc>,
    pub snapshot: Record,
}

/// Contract between the publish workflow and record storage.
///
/// Ids passed here are always persisted ids; the workflow resolves transient
/// ids by writing first.
pub trait StageStore: Send + Sync {
    /// Current version of `id` on `stage`, or `None` if the record has no
    /// written row there.
    fn stage_version(
        &self,
        base_table: &str,
        stage: Stage,
        id: u64,
    ) -> StoreResult<Option<VersionNumber>>;

    /// Loads the row of `id` on `stage`, including bare placeholder rows.
    fn get_by_id(&self, base_table: &str, stage: Stage, id: u64) -> StoreResult<Option<Record>>;

    /// Lists records of a base table as they exist on `stage`, ordered by id.
    fn get_by_stage(
        &self,
        base_table: &str,
        stage: Stage,
        filter: &RecordFilter,
    ) -> StoreResult<Vec<Record>>;

    /// Writes `record` to `stage`.
    ///
    /// Unsaved and transient records receive an id. On return `record`
    /// reflects the stored row (id, `last_edited`) and its force-change flag
    /// is cleared.
    fn write_to_stage(&self, record: &mut Record, stage: Stage) -> StoreResult<VersionNumber>;

    /// Copies the row of `id` from one stage to another.
    fn copy_stage_to_stage(
        &self,
        base_table: &str,
        id: u64,
        from: Stage,
        to: Stage,
        create_new_version: bool,
    ) -> StoreResult<VersionNumber>;

    /// Removes the record from one stage only.
    fn delete_from_stage(&self, record: &Record, stage: Stage) -> StoreResult<()>;

    /// Removes the record from both stages.
    fn delete_record_everywhere(&self, record: &Record) -> StoreResult<()>;

    /// Removes every version-history row of `id`. Returns the number removed.
    fn purge_version_history(&self, base_table: &str, id: u64) -> StoreResult<usize>;

    /// Returns the version-history rows of `id` in creation order.
    fn version_history(&self, base_table: &str, id: u64) -> StoreResult<Vec<VersionRow>>;

    /// Inserts a bare Draft row carrying only the id.
    ///
    /// Fails with `STORE_PRIMARY_KEY_LOCKED` unless primary key editing was
    /// enabled for the base table.
    fn insert_placeholder(&self, base_table: &str, class_name: &str, id: u64) -> StoreResult<()>;

    /// Enables or disables explicit primary key inserts for a base table.
    fn allow_primary_key_editing(&self, base_table: &str, allowed: bool) -> StoreResult<()>;

    /// Targeted update of `last_edited` on an existing row.
    fn update_last_edited(
        &self,
        base_table: &str,
        stage: Stage,
        id: u64,
        value: Option<DateTime<Utc>>,
    ) -> StoreResult<()>;
}
