//! Stage version comparisons
//!
//! All predicates except `stages_differ` report `false` for ids that were
//! never written.

use serde::Serialize;

use crate::record::{RecordId, Stage, VersionNumber};
use crate::store::{StageStore, StoreResult};

/// Snapshot of every status predicate for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VersionStatus {
    pub is_new: bool,
    pub is_published: bool,
    pub is_deleted_from_stage: bool,
    pub exists_on_live: bool,
    pub is_modified_on_stage: bool,
    pub is_added_to_stage: bool,
    pub stages_differ: bool,
    pub draft_version: Option<VersionNumber>,
    pub live_version: Option<VersionNumber>,
}

/// Status queries for records of one base table.
pub struct VersionStateEvaluator<'a> {
    store: &'a dyn StageStore,
    base_table: &'a str,
}

impl<'a> VersionStateEvaluator<'a> {
    pub fn new(store: &'a dyn StageStore, base_table: &'a str) -> Self {
        Self { store, base_table }
    }

    pub fn base_table(&self) -> &str {
        self.base_table
    }

    fn version(&self, id: u64, stage: Stage) -> StoreResult<Option<VersionNumber>> {
        self.store.stage_version(self.base_table, stage, id)
    }

    /// Draft and Live versions, or `None` for ids that were never written.
    fn versions(
        &self,
        id: &RecordId,
    ) -> StoreResult<Option<(Option<VersionNumber>, Option<VersionNumber>)>> {
        match id.as_persisted() {
            Some(id) => Ok(Some((
                self.version(id, Stage::Draft)?,
                self.version(id, Stage::Live)?,
            ))),
            None => Ok(None),
        }
    }

    /// True for unsaved and transient ids.
    pub fn is_new(&self, id: &RecordId) -> bool {
        id.is_new()
    }

    /// A Live row exists.
    pub fn is_published(&self, id: &RecordId) -> StoreResult<bool> {
        match id.as_persisted() {
            Some(id) => Ok(self.version(id, Stage::Live)?.is_some()),
            None => Ok(false),
        }
    }

    /// The Draft row was removed (the record may still be live).
    pub fn is_deleted_from_stage(&self, id: &RecordId) -> StoreResult<bool> {
        match id.as_persisted() {
            Some(id) => Ok(self.version(id, Stage::Draft)?.is_none()),
            None => Ok(false),
        }
    }

    pub fn exists_on_live(&self, id: &RecordId) -> StoreResult<bool> {
        self.is_published(id)
    }

    /// Draft exists and its version differs from Live, or Live is absent.
    pub fn is_modified_on_stage(&self, id: &RecordId) -> StoreResult<bool> {
        Ok(match self.versions(id)? {
            Some((Some(draft), live)) => live != Some(draft),
            _ => false,
        })
    }

    /// Draft exists and Live does not.
    pub fn is_added_to_stage(&self, id: &RecordId) -> StoreResult<bool> {
        Ok(matches!(self.versions(id)?, Some((Some(_), None))))
    }

    /// Draft and Live carry different versions.
    ///
    /// Ids that were never written always differ.
    pub fn stages_differ(&self, id: &RecordId) -> StoreResult<bool> {
        Ok(match self.versions(id)? {
            Some((draft, live)) => draft != live,
            None => true,
        })
    }

    /// Evaluates every predicate from a single pair of version reads.
    pub fn evaluate(&self, id: &RecordId) -> StoreResult<VersionStatus> {
        let Some((draft, live)) = self.versions(id)? else {
            return Ok(VersionStatus {
                is_new: true,
                stages_differ: true,
                ..VersionStatus::default()
            });
        };

        Ok(VersionStatus {
            is_new: false,
            is_published: live.is_some(),
            is_deleted_from_stage: draft.is_none(),
            exists_on_live: live.is_some(),
            is_modified_on_stage: draft.is_some() && draft != live,
            is_added_to_stage: draft.is_some() && live.is_none(),
            stages_differ: draft != live,
            draft_version: draft,
            live_version: live,
        })
    }
}
