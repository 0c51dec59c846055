//! Table-backed stage store
//!
//! `TableStageStore` implements `StageStore` over `StageTables`. Each
//! mutation is planned, handed to the journal, then applied, all under one
//! lock. The journal decides durability:
//! - `Volatile` keeps nothing (`MemoryStageStore`)
//! - `FileJournal` appends fsynced frames (`FileStageStore`)

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::errors::{StoreError, StoreResult};
use super::tables::{Effect, Plan, StageTables};
use super::{RecordFilter, StageStore, VersionRow};
use crate::record::{Record, Stage, VersionNumber};

/// Sink for planned effects, called before they are applied.
pub trait Journal: Send {
    /// Persists one batch of effects. A failure aborts the mutation.
    fn append(&mut self, effects: &[Effect]) -> StoreResult<()>;
}

/// Journal that persists nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Volatile;

impl Journal for Volatile {
    fn append(&mut self, _effects: &[Effect]) -> StoreResult<()> {
        Ok(())
    }
}

struct State<J> {
    tables: StageTables,
    journal: J,
}

/// Stage store over in-memory tables and a journal.
pub struct TableStageStore<J: Journal> {
    state: Mutex<State<J>>,
}

/// Volatile stage store.
pub type MemoryStageStore = TableStageStore<Volatile>;

impl MemoryStageStore {
    /// Creates an empty volatile store.
    pub fn new() -> Self {
        Self::with_journal(StageTables::new(), Volatile)
    }
}

impl Default for MemoryStageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<J: Journal> TableStageStore<J> {
    /// Creates a store from existing tables and a journal.
    pub fn with_journal(tables: StageTables, journal: J) -> Self {
        Self {
            state: Mutex::new(State { tables, journal }),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State<J>>> {
        self.state
            .lock()
            .map_err(|_| StoreError::write_failed_no_source("stage tables lock poisoned"))
    }

    fn read<T>(&self, f: impl FnOnce(&StageTables) -> T) -> StoreResult<T> {
        let state = self.lock()?;
        Ok(f(&state.tables))
    }

    fn mutate<T>(
        &self,
        plan: impl FnOnce(&StageTables) -> StoreResult<Plan<T>>,
    ) -> StoreResult<T> {
        let mut state = self.lock()?;
        let (effects, out) = plan(&state.tables)?;
        if !effects.is_empty() {
            state.journal.append(&effects)?;
            for effect in &effects {
                state.tables.apply(effect);
            }
        }
        Ok(out)
    }
}

impl<J: Journal> StageStore for TableStageStore<J> {
    fn stage_version(
        &self,
        base_table: &str,
        stage: Stage,
        id: u64,
    ) -> StoreResult<Option<VersionNumber>> {
        self.read(|t| t.stage_version(base_table, stage, id))
    }

    fn get_by_id(&self, base_table: &str, stage: Stage, id: u64) -> StoreResult<Option<Record>> {
        self.read(|t| t.row(base_table, stage, id).map(|row| row.record.clone()))
    }

    fn get_by_stage(
        &self,
        base_table: &str,
        stage: Stage,
        filter: &RecordFilter,
    ) -> StoreResult<Vec<Record>> {
        self.read(|t| t.select(base_table, stage, filter))
    }

    fn write_to_stage(&self, record: &mut Record, stage: Stage) -> StoreResult<VersionNumber> {
        let now = Utc::now();
        let (stored, version) = self.mutate(|t| t.plan_write(record, stage, now))?;
        *record = stored;
        Ok(version)
    }

    fn copy_stage_to_stage(
        &self,
        base_table: &str,
        id: u64,
        from: Stage,
        to: Stage,
        create_new_version: bool,
    ) -> StoreResult<VersionNumber> {
        let now = Utc::now();
        self.mutate(|t| t.plan_copy(base_table, id, from, to, create_new_version, now))
    }

    fn delete_from_stage(&self, record: &Record, stage: Stage) -> StoreResult<()> {
        let Some(id) = record.id.as_persisted() else {
            return Ok(());
        };
        self.mutate(|t| Ok(t.plan_remove(&record.base_table, stage, id)))
            .map(|_| ())
    }

    fn delete_record_everywhere(&self, record: &Record) -> StoreResult<()> {
        let Some(id) = record.id.as_persisted() else {
            return Ok(());
        };
        self.mutate(|t| {
            let (mut effects, _) = t.plan_remove(&record.base_table, Stage::Draft, id);
            let (live, _) = t.plan_remove(&record.base_table, Stage::Live, id);
            effects.extend(live);
            Ok((effects, ()))
        })
    }

    fn purge_version_history(&self, base_table: &str, id: u64) -> StoreResult<usize> {
        self.mutate(|t| Ok(t.plan_purge_history(base_table, id)))
    }

    fn version_history(&self, base_table: &str, id: u64) -> StoreResult<Vec<VersionRow>> {
        self.read(|t| t.history(base_table, id))
    }

    fn insert_placeholder(&self, base_table: &str, class_name: &str, id: u64) -> StoreResult<()> {
        self.mutate(|t| t.plan_placeholder(base_table, class_name, id))
    }

    fn allow_primary_key_editing(&self, base_table: &str, allowed: bool) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.tables.set_primary_key_editable(base_table, allowed);
        Ok(())
    }

    fn update_last_edited(
        &self,
        base_table: &str,
        stage: Stage,
        id: u64,
        value: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        self.mutate(|t| t.plan_set_last_edited(base_table, stage, id, value))
    }
}
