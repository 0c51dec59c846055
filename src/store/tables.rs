//! In-memory stage tables
//!
//! Holds the Draft rows, Live rows and version history of every base table.
//! Mutations are planned against an immutable view and produce `Effect`s;
//! effects are the only way the tables change. The journal-backed store
//! persists the same effects and replays them on open.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use super::{RecordFilter, VersionRow};
use crate::record::{Record, RecordId, Stage, VersionNumber};

/// Row key: (base table, record id).
type RowKey = (String, u64);

fn key(base_table: &str, id: u64) -> RowKey {
    (base_table.to_string(), id)
}

/// A record as held on one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRow {
    /// `None` for bare placeholder rows that were never written.
    pub version: Option<VersionNumber>,
    pub record: Record,
}

/// A single state change of the tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Claims an id in a base table's id sequence.
    ReserveId { base_table: String, id: u64 },
    /// Inserts or replaces the row of a record on a stage.
    PutRow { stage: Stage, row: StageRow },
    /// Removes the row of a record from a stage.
    RemoveRow {
        base_table: String,
        stage: Stage,
        id: u64,
    },
    /// Appends a version-history row.
    AppendHistory { row: VersionRow },
    /// Flags an existing history row as published.
    MarkPublished {
        base_table: String,
        id: u64,
        version: VersionNumber,
    },
    /// Drops every history row of a record.
    PurgeHistory { base_table: String, id: u64 },
    /// Overwrites `last_edited` of a stage row.
    SetLastEdited {
        base_table: String,
        stage: Stage,
        id: u64,
        value: Option<DateTime<Utc>>,
    },
}

/// Planned effects plus the value the operation returns.
pub type Plan<T> = (Vec<Effect>, T);

/// Draft rows, Live rows and version history.
#[derive(Debug, Default)]
pub struct StageTables {
    draft: BTreeMap<RowKey, StageRow>,
    live: BTreeMap<RowKey, StageRow>,
    history: BTreeMap<RowKey, Vec<VersionRow>>,
    last_ids: HashMap<String, u64>,
    primary_key_editable: HashSet<String>,
}

impl StageTables {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self, stage: Stage) -> &BTreeMap<RowKey, StageRow> {
        match stage {
            Stage::Draft => &self.draft,
            Stage::Live => &self.live,
        }
    }

    fn rows_mut(&mut self, stage: Stage) -> &mut BTreeMap<RowKey, StageRow> {
        match stage {
            Stage::Draft => &mut self.draft,
            Stage::Live => &mut self.live,
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn row(&self, base_table: &str, stage: Stage, id: u64) -> Option<&StageRow> {
        self.rows(stage).get(&key(base_table, id))
    }

    pub fn stage_version(&self, base_table: &str, stage: Stage, id: u64) -> Option<VersionNumber> {
        self.row(base_table, stage, id).and_then(|row| row.version)
    }

    pub fn select(&self, base_table: &str, stage: Stage, filter: &RecordFilter) -> Vec<Record> {
        self.rows(stage)
            .iter()
            .filter(|((table, _), _)| table == base_table)
            .map(|(_, row)| &row.record)
            .filter(|record| filter.matches(record))
            .cloned()
            .collect()
    }

    pub fn history(&self, base_table: &str, id: u64) -> Vec<VersionRow> {
        self.history
            .get(&key(base_table, id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_primary_key_editable(&self, base_table: &str) -> bool {
        self.primary_key_editable.contains(base_table)
    }

    /// Highest version ever assigned to the record, on any stage or in history.
    fn latest_version(&self, base_table: &str, id: u64) -> Option<VersionNumber> {
        let k = key(base_table, id);
        let from_history = self
            .history
            .get(&k)
            .and_then(|rows| rows.iter().map(|r| r.version).max());
        let from_stages = [Stage::Draft, Stage::Live]
            .into_iter()
            .filter_map(|stage| self.rows(stage).get(&k).and_then(|row| row.version))
            .max();
        from_history.max(from_stages)
    }

    fn next_version(&self, base_table: &str, id: u64) -> VersionNumber {
        self.latest_version(base_table, id)
            .map(|v| v.next())
            .unwrap_or_else(|| VersionNumber::new(1))
    }

    fn next_id(&self, base_table: &str) -> u64 {
        let from_seq = self.last_ids.get(base_table).copied().unwrap_or(0);
        let from_rows = [Stage::Draft, Stage::Live]
            .into_iter()
            .flat_map(|stage| self.rows(stage).keys())
            .filter(|(table, _)| table == base_table)
            .map(|(_, id)| *id)
            .max()
            .unwrap_or(0);
        from_seq.max(from_rows) + 1
    }

    // =========================================================================
    // PLANNING
    // =========================================================================

    /// Plans a write of `record` to `stage`.
    ///
    /// Assigns an id to unsaved and transient records. A new version is only
    /// created when content changed, the existing row is a placeholder, or
    /// the record was force-changed. Returns the record as stored.
    pub fn plan_write(
        &self,
        record: &Record,
        stage: Stage,
        now: DateTime<Utc>,
    ) -> StoreResult<Plan<(Record, VersionNumber)>> {
        let mut effects = Vec::new();
        let mut stored = record.clone();
        stored.force_changed = false;

        let id = match record.id.as_persisted() {
            Some(id) => id,
            None => {
                let id = self.next_id(&record.base_table);
                effects.push(Effect::ReserveId {
                    base_table: record.base_table.clone(),
                    id,
                });
                stored.id = RecordId::Persisted(id);
                id
            }
        };

        if let Some(existing) = self.row(&record.base_table, stage, id) {
            if let Some(version) = existing.version {
                if !record.force_changed && existing.record.same_content(record) {
                    return Ok((effects, (existing.record.clone(), version)));
                }
            }
        }

        let version = self.next_version(&record.base_table, id);
        stored.last_edited = Some(now);

        effects.push(Effect::AppendHistory {
            row: VersionRow {
                record_id: id,
                version,
                was_published: stage == Stage::Live,
                created: now,
                snapshot: stored.clone(),
            },
        });
        effects.push(Effect::PutRow {
            stage,
            row: StageRow {
                version: Some(version),
                record: stored.clone(),
            },
        });

        Ok((effects, (stored, version)))
    }

    /// Plans a copy of a stage row onto another stage.
    ///
    /// Without `create_new_version` the target receives the source version
    /// number and content unchanged; no history row is added.
    pub fn plan_copy(
        &self,
        base_table: &str,
        id: u64,
        from: Stage,
        to: Stage,
        create_new_version: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<Plan<VersionNumber>> {
        let source = self
            .row(base_table, from, id)
            .filter(|row| row.version.is_some())
            .ok_or_else(|| StoreError::row_not_found(base_table, from, id))?;

        let mut effects = Vec::new();
        let mut record = source.record.clone();

        let version = if create_new_version {
            let version = self.next_version(base_table, id);
            record.last_edited = Some(now);
            effects.push(Effect::AppendHistory {
                row: VersionRow {
                    record_id: id,
                    version,
                    was_published: to == Stage::Live,
                    created: now,
                    snapshot: record.clone(),
                },
            });
            version
        } else {
            let version = source.version.unwrap_or_else(|| VersionNumber::new(0));
            if to == Stage::Live {
                effects.push(Effect::MarkPublished {
                    base_table: base_table.to_string(),
                    id,
                    version,
                });
            }
            version
        };

        effects.push(Effect::PutRow {
            stage: to,
            row: StageRow {
                version: Some(version),
                record,
            },
        });

        Ok((effects, version))
    }

    /// Plans removal of a record from one stage. Missing rows are a no-op.
    pub fn plan_remove(&self, base_table: &str, stage: Stage, id: u64) -> Plan<bool> {
        if self.row(base_table, stage, id).is_none() {
            return (Vec::new(), false);
        }
        (
            vec![Effect::RemoveRow {
                base_table: base_table.to_string(),
                stage,
                id,
            }],
            true,
        )
    }

    /// Plans removal of every history row of a record.
    pub fn plan_purge_history(&self, base_table: &str, id: u64) -> Plan<usize> {
        let count = self
            .history
            .get(&key(base_table, id))
            .map_or(0, |rows| rows.len());
        if count == 0 {
            return (Vec::new(), 0);
        }
        (
            vec![Effect::PurgeHistory {
                base_table: base_table.to_string(),
                id,
            }],
            count,
        )
    }

    /// Plans insertion of a bare Draft row carrying only the id.
    ///
    /// Requires primary key editing to be enabled for the base table.
    pub fn plan_placeholder(
        &self,
        base_table: &str,
        class_name: &str,
        id: u64,
    ) -> StoreResult<Plan<()>> {
        if !self.is_primary_key_editable(base_table) {
            return Err(StoreError::primary_key_locked(base_table, id));
        }
        if self.row(base_table, Stage::Draft, id).is_some() {
            return Ok((Vec::new(), ()));
        }
        let record = Record::new(RecordId::Persisted(id), class_name, base_table);
        Ok((
            vec![
                Effect::ReserveId {
                    base_table: base_table.to_string(),
                    id,
                },
                Effect::PutRow {
                    stage: Stage::Draft,
                    row: StageRow {
                        version: None,
                        record,
                    },
                },
            ],
            (),
        ))
    }

    /// Plans a targeted `last_edited` update of an existing row.
    pub fn plan_set_last_edited(
        &self,
        base_table: &str,
        stage: Stage,
        id: u64,
        value: Option<DateTime<Utc>>,
    ) -> StoreResult<Plan<()>> {
        if self.row(base_table, stage, id).is_none() {
            return Err(StoreError::row_not_found(base_table, stage, id));
        }
        Ok((
            vec![Effect::SetLastEdited {
                base_table: base_table.to_string(),
                stage,
                id,
                value,
            }],
            (),
        ))
    }

    // =========================================================================
    // APPLY
    // =========================================================================

    /// Applies a single effect.
    pub fn apply(&mut self, effect: &Effect) {
        match effect {
            Effect::ReserveId { base_table, id } => {
                let last = self.last_ids.entry(base_table.clone()).or_insert(0);
                *last = (*last).max(*id);
            }
            Effect::PutRow { stage, row } => {
                if let Some(id) = row.record.id.as_persisted() {
                    self.rows_mut(*stage)
                        .insert(key(&row.record.base_table, id), row.clone());
                }
            }
            Effect::RemoveRow {
                base_table,
                stage,
                id,
            } => {
                self.rows_mut(*stage).remove(&key(base_table, *id));
            }
            Effect::AppendHistory { row } => {
                self.history
                    .entry(key(&row.snapshot.base_table, row.record_id))
                    .or_default()
                    .push(row.clone());
            }
            Effect::MarkPublished {
                base_table,
                id,
                version,
            } => {
                if let Some(rows) = self.history.get_mut(&key(base_table, *id)) {
                    for row in rows.iter_mut().filter(|r| r.version == *version) {
                        row.was_published = true;
                    }
                }
            }
            Effect::PurgeHistory { base_table, id } => {
                self.history.remove(&key(base_table, *id));
            }
            Effect::SetLastEdited {
                base_table,
                stage,
                id,
                value,
            } => {
                if let Some(row) = self.rows_mut(*stage).get_mut(&key(base_table, *id)) {
                    row.record.last_edited = *value;
                }
            }
        }
    }

    /// Enables or disables explicit primary key inserts for a base table.
    pub fn set_primary_key_editable(&mut self, base_table: &str, allowed: bool) {
        if allowed {
            self.primary_key_editable.insert(base_table.to_string());
        } else {
            self.primary_key_editable.remove(base_table);
        }
    }
}
