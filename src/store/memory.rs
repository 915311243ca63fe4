//! In-memory storage backend.
//!
//! All tables live behind one [`tokio::sync::RwLock`]. Every mutation
//! validates first and applies second while holding the write lock, which
//! makes batch inserts and replace-day atomic and serialized.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ChildStore, EventRow, EventStore, RecordRow, RecordStore, Upserted};
use crate::domain::event::EventLog;
use crate::domain::record::RecordKind;
use crate::domain::{Child, ChildId, EntryId};
use crate::error::TrackerError;

#[derive(Debug, Default)]
struct Tables {
    children: HashMap<ChildId, Child>,
    records: HashMap<EntryId, RecordRow>,
    events: HashMap<EntryId, EventRow>,
}

/// Volatile store used by tests and `PERSISTENCE_ENABLED=false`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate_id(id: EntryId) -> TrackerError {
    TrackerError::PersistenceError(format!("duplicate entry id {id}"))
}

/// Rejects a batch whose IDs repeat or collide with `existing`.
fn check_new_ids(
    rows: &[EventRow],
    mut existing: impl FnMut(&EntryId) -> bool,
) -> Result<(), TrackerError> {
    let mut seen: HashSet<&EntryId> = HashSet::with_capacity(rows.len());
    for row in rows {
        if !seen.insert(&row.id) || existing(&row.id) {
            return Err(duplicate_id(row.id));
        }
    }
    Ok(())
}

impl Tables {
    /// Another record of the same child and kind holding `row`'s key.
    fn key_holder(&self, row: &RecordRow) -> Option<&RecordRow> {
        let key = row.upsert_key.as_deref()?;
        self.records.values().find(|r| {
            r.id != row.id
                && r.kind == row.kind
                && r.child_id == row.child_id
                && r.upsert_key.as_deref() == Some(key)
        })
    }
}

#[async_trait]
impl ChildStore for MemoryStore {
    async fn insert_child(&self, child: &Child) -> Result<(), TrackerError> {
        let mut tables = self.tables.write().await;
        if tables.children.contains_key(&child.id) {
            return Err(TrackerError::PersistenceError(format!(
                "child {} already exists",
                child.id
            )));
        }
        tables.children.insert(child.id, child.clone());
        Ok(())
    }

    async fn get_child(&self, id: ChildId) -> Result<Option<Child>, TrackerError> {
        Ok(self.tables.read().await.children.get(&id).cloned())
    }

    async fn list_children(&self) -> Result<Vec<Child>, TrackerError> {
        let tables = self.tables.read().await;
        let mut children: Vec<Child> = tables.children.values().cloned().collect();
        children.sort_by(|a, b| {
            a.profile
                .name
                .cmp(&b.profile.name)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(children)
    }

    async fn update_child(&self, child: &Child) -> Result<bool, TrackerError> {
        let mut tables = self.tables.write().await;
        match tables.children.get_mut(&child.id) {
            Some(existing) => {
                existing.profile = child.profile.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_child(&self, id: ChildId) -> Result<bool, TrackerError> {
        let mut tables = self.tables.write().await;
        if tables.children.remove(&id).is_none() {
            return Ok(false);
        }
        tables.records.retain(|_, row| row.child_id != id);
        tables.events.retain(|_, row| row.child_id != id);
        Ok(true)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_record(&self, row: &RecordRow) -> Result<(), TrackerError> {
        let mut tables = self.tables.write().await;
        if tables.records.contains_key(&row.id) {
            return Err(duplicate_id(row.id));
        }
        if tables.key_holder(row).is_some() {
            return Err(row.key_conflict());
        }
        tables.records.insert(row.id, row.clone());
        Ok(())
    }

    async fn upsert_record(&self, row: &RecordRow) -> Result<Upserted, TrackerError> {
        let mut tables = self.tables.write().await;
        let existing = tables.key_holder(row).map(|r| (r.id, r.created_at));
        let (stored, created) = match existing {
            Some((id, created_at)) => (
                RecordRow {
                    id,
                    created_at,
                    ..row.clone()
                },
                false,
            ),
            None if tables.records.contains_key(&row.id) => return Err(duplicate_id(row.id)),
            None => (row.clone(), true),
        };
        tables.records.insert(stored.id, stored.clone());
        Ok(Upserted {
            row: stored,
            created,
        })
    }

    async fn get_record(
        &self,
        kind: RecordKind,
        id: EntryId,
    ) -> Result<Option<RecordRow>, TrackerError> {
        let tables = self.tables.read().await;
        Ok(tables.records.get(&id).filter(|r| r.kind == kind).cloned())
    }

    async fn list_records(
        &self,
        kind: RecordKind,
        child_id: ChildId,
        date: Option<&str>,
    ) -> Result<Vec<RecordRow>, TrackerError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<RecordRow> = tables
            .records
            .values()
            .filter(|r| r.kind == kind && r.child_id == child_id)
            .filter(|r| date.is_none_or(|d| r.date == d))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.created_at.cmp(&b.created_at)));
        Ok(rows)
    }

    async fn update_record(&self, row: &RecordRow) -> Result<bool, TrackerError> {
        let mut tables = self.tables.write().await;
        if tables.key_holder(row).is_some() {
            return Err(row.key_conflict());
        }
        match tables.records.get_mut(&row.id) {
            Some(existing) if existing.kind == row.kind => {
                *existing = row.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_record(&self, kind: RecordKind, id: EntryId) -> Result<bool, TrackerError> {
        let mut tables = self.tables.write().await;
        if tables.records.get(&id).is_some_and(|r| r.kind == kind) {
            tables.records.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_events(&self, rows: &[EventRow]) -> Result<(), TrackerError> {
        let mut tables = self.tables.write().await;
        check_new_ids(rows, |id| tables.events.contains_key(id))?;
        for row in rows {
            tables.events.insert(row.id, row.clone());
        }
        Ok(())
    }

    async fn get_event(
        &self,
        log: EventLog,
        id: EntryId,
    ) -> Result<Option<EventRow>, TrackerError> {
        let tables = self.tables.read().await;
        Ok(tables.events.get(&id).filter(|e| e.log == log).cloned())
    }

    async fn list_events(
        &self,
        log: EventLog,
        child_id: ChildId,
        date: Option<&str>,
    ) -> Result<Vec<EventRow>, TrackerError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<EventRow> = tables
            .events
            .values()
            .filter(|e| e.log == log && e.child_id == child_id)
            .filter(|e| date.is_none_or(|d| e.date == d))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (a.date.as_str(), a.time.as_str(), a.created_at)
                .cmp(&(b.date.as_str(), b.time.as_str(), b.created_at))
        });
        Ok(rows)
    }

    async fn update_event(&self, row: &EventRow) -> Result<bool, TrackerError> {
        let mut tables = self.tables.write().await;
        match tables.events.get_mut(&row.id) {
            Some(existing) if existing.log == row.log => {
                *existing = row.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_event(&self, log: EventLog, id: EntryId) -> Result<bool, TrackerError> {
        let mut tables = self.tables.write().await;
        if tables.events.get(&id).is_some_and(|e| e.log == log) {
            tables.events.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn replace_day(
        &self,
        log: EventLog,
        child_id: ChildId,
        date: &str,
        rows: &[EventRow],
    ) -> Result<u64, TrackerError> {
        let mut tables = self.tables.write().await;
        let in_day =
            |e: &EventRow| e.log == log && e.child_id == child_id && e.date == date;

        check_new_ids(rows, |id| {
            tables.events.get(id).is_some_and(|existing| !in_day(existing))
        })?;

        let before = tables.events.len();
        tables.events.retain(|_, e| !in_day(e));
        let deleted = (before - tables.events.len()) as u64;
        for row in rows {
            tables.events.insert(row.id, row.clone());
        }
        Ok(deleted)
    }
}
