//! Storage layer: children, observation records and timeline events.
//!
//! The service layer talks to [`Storage`], the union of three async
//! traits. Two implementations exist: [`memory::MemoryStore`] for tests and
//! ephemeral runs, and [`postgres::PostgresStore`] backed by `sqlx::PgPool`.
//!
//! Records are stored schemaless as a JSON payload next to their kind and
//! date; events are stored as typed rows with a log discriminator.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::event::{Event, EventLog, EventState};
use crate::domain::record::{Record, RecordKind, Stored};
use crate::domain::{Child, ChildId, EntryId};
use crate::error::TrackerError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// A stored observation record in storage form.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    /// Entry identifier.
    pub id: EntryId,
    /// Owning child.
    pub child_id: ChildId,
    /// Record kind.
    pub kind: RecordKind,
    /// Observation date, duplicated out of the payload for filtering.
    pub date: String,
    /// Record fields as JSON.
    pub payload: serde_json::Value,
    /// Tooth id or food name for kinds that keep one record per key.
    pub upsert_key: Option<String>,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl RecordRow {
    /// Converts a typed record into storage form.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Internal`] if the record cannot be encoded.
    pub fn encode<R: Record>(stored: &Stored<R>) -> Result<Self, TrackerError> {
        let payload = serde_json::to_value(&stored.record)
            .map_err(|e| TrackerError::Internal(format!("encoding {} record: {e}", R::KIND)))?;
        Ok(Self {
            id: stored.id,
            child_id: stored.child_id,
            kind: R::KIND,
            date: stored.record.date().to_string(),
            payload,
            upsert_key: stored.record.upsert_key().map(str::to_string),
            created_at: stored.created_at,
        })
    }

    /// Converts the row back into a typed record.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Internal`] if the payload does not decode as
    /// `R` or the row holds a different kind.
    pub fn decode<R: Record>(self) -> Result<Stored<R>, TrackerError> {
        if self.kind != R::KIND {
            return Err(TrackerError::Internal(format!(
                "expected {} row, found {}",
                R::KIND,
                self.kind
            )));
        }
        let record = serde_json::from_value(self.payload).map_err(|e| {
            TrackerError::Internal(format!("decoding {} record {}: {e}", R::KIND, self.id))
        })?;
        Ok(Stored {
            id: self.id,
            child_id: self.child_id,
            record,
            created_at: self.created_at,
        })
    }

    /// The conflict error for this row's key.
    pub(crate) fn key_conflict(&self) -> TrackerError {
        TrackerError::KeyConflict {
            kind: self.kind.as_str(),
            key: self.upsert_key.clone().unwrap_or_default(),
        }
    }
}

/// Result of [`RecordStore::upsert_record`].
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted {
    /// The row as stored. Keeps the existing id and `created_at` when a
    /// record with the same key was replaced.
    pub row: RecordRow,
    /// `true` when a new row was inserted.
    pub created: bool,
}

/// A timeline event in storage form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    /// Entry identifier.
    pub id: EntryId,
    /// Owning child.
    pub child_id: ChildId,
    /// Timeline the event belongs to.
    pub log: EventLog,
    /// Calendar date.
    pub date: String,
    /// Wall-clock time.
    pub time: String,
    /// State name.
    pub state: String,
    /// Optional client label.
    pub label: Option<String>,
    /// Optional extra data.
    pub extra: Option<String>,
    /// Server-side insertion timestamp.
    pub created_at: DateTime<Utc>,
}

impl EventRow {
    /// Converts a typed event into storage form.
    #[must_use]
    pub fn encode<S: EventState>(event: &Event<S>) -> Self {
        Self {
            id: event.id,
            child_id: event.child_id,
            log: S::LOG,
            date: event.date.clone(),
            time: event.time.clone(),
            state: event.state.as_str().to_string(),
            label: event.label.clone(),
            extra: event.extra.clone(),
            created_at: event.created_at,
        }
    }

    /// Converts the row back into a typed event.
    ///
    /// Returns `None` for a row from another log or with an unknown state.
    #[must_use]
    pub fn decode<S: EventState>(self) -> Option<Event<S>> {
        if self.log != S::LOG {
            return None;
        }
        let Some(state) = S::parse(&self.state) else {
            tracing::warn!(
                id = %self.id,
                log = %self.log,
                state = %self.state,
                "skipping stored event with unknown state"
            );
            return None;
        };
        Some(Event {
            id: self.id,
            child_id: self.child_id,
            date: self.date,
            time: self.time,
            state,
            label: self.label,
            extra: self.extra,
            created_at: self.created_at,
        })
    }
}

/// Child persistence.
#[async_trait]
pub trait ChildStore: Send + Sync + fmt::Debug {
    /// Inserts a new child.
    async fn insert_child(&self, child: &Child) -> Result<(), TrackerError>;

    /// Fetches a child by ID.
    async fn get_child(&self, id: ChildId) -> Result<Option<Child>, TrackerError>;

    /// Lists all children ordered by name.
    async fn list_children(&self) -> Result<Vec<Child>, TrackerError>;

    /// Replaces a child's profile. Returns `false` if the child is unknown.
    async fn update_child(&self, child: &Child) -> Result<bool, TrackerError>;

    /// Deletes a child together with all of its records and events.
    /// Returns `false` if the child is unknown.
    async fn delete_child(&self, id: ChildId) -> Result<bool, TrackerError>;
}

/// Observation record persistence.
#[async_trait]
pub trait RecordStore: Send + Sync + fmt::Debug {
    /// Inserts a new record row.
    async fn insert_record(&self, row: &RecordRow) -> Result<(), TrackerError>;

    /// Fetches a record of `kind` by ID.
    async fn get_record(&self, kind: RecordKind, id: EntryId)
    -> Result<Option<RecordRow>, TrackerError>;

    /// Lists a child's records of `kind`, optionally on one date, ordered by
    /// `(date, created_at)`.
    async fn list_records(
        &self,
        kind: RecordKind,
        child_id: ChildId,
        date: Option<&str>,
    ) -> Result<Vec<RecordRow>, TrackerError>;

    /// Inserts `row`, or overwrites the date and payload of the child's
    /// record of the same kind and [`RecordRow::upsert_key`]. The lookup and
    /// the write are one atomic step.
    async fn upsert_record(&self, row: &RecordRow) -> Result<Upserted, TrackerError>;

    /// Overwrites a record row. Returns `false` if it does not exist.
    ///
    /// Fails with [`TrackerError::KeyConflict`] when another record of the
    /// same child and kind already holds the row's upsert key.
    async fn update_record(&self, row: &RecordRow) -> Result<bool, TrackerError>;

    /// Deletes a record. Returns `false` if it does not exist.
    async fn delete_record(&self, kind: RecordKind, id: EntryId) -> Result<bool, TrackerError>;
}

/// Timeline event persistence.
#[async_trait]
pub trait EventStore: Send + Sync + fmt::Debug {
    /// Inserts a batch of events; either all rows land or none do.
    async fn insert_events(&self, rows: &[EventRow]) -> Result<(), TrackerError>;

    /// Fetches an event of `log` by ID.
    async fn get_event(&self, log: EventLog, id: EntryId)
    -> Result<Option<EventRow>, TrackerError>;

    /// Lists a child's events of `log`, optionally on one date, ordered by
    /// `(date, time)`.
    async fn list_events(
        &self,
        log: EventLog,
        child_id: ChildId,
        date: Option<&str>,
    ) -> Result<Vec<EventRow>, TrackerError>;

    /// Overwrites an event row. Returns `false` if it does not exist.
    async fn update_event(&self, row: &EventRow) -> Result<bool, TrackerError>;

    /// Deletes an event. Returns `false` if it does not exist.
    async fn delete_event(&self, log: EventLog, id: EntryId) -> Result<bool, TrackerError>;

    /// Atomically deletes every `log` event of `child_id` on `date` and
    /// inserts `rows` in their place. Concurrent calls for the same
    /// `(log, child_id, date)` are serialized. Returns the number of
    /// deleted rows.
    async fn replace_day(
        &self,
        log: EventLog,
        child_id: ChildId,
        date: &str,
        rows: &[EventRow],
    ) -> Result<u64, TrackerError>;
}

/// Everything the services need from a backend.
pub trait Storage: ChildStore + RecordStore + EventStore {}

impl<T: ChildStore + RecordStore + EventStore> Storage for T {}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::SleepState;
    use crate::domain::record::Word;
    use crate::domain::{EventDraft, FeedingState};

    #[test]
    fn record_row_round_trip_keeps_metadata() {
        let stored = Stored::new(
            ChildId::new(),
            Word {
                name: "pes".to_string(),
                date: "2025-04-01".to_string(),
                note: None,
            },
        );
        let Ok(row) = RecordRow::encode(&stored) else {
            panic!("encode failed");
        };
        assert_eq!(row.kind, RecordKind::Word);
        assert_eq!(row.date, "2025-04-01");
        assert_eq!(row.upsert_key, None);
        let Ok(back) = row.decode::<Word>() else {
            panic!("decode failed");
        };
        assert_eq!(back, stored);
    }

    #[test]
    fn record_row_refuses_other_kind() {
        let stored = Stored::new(
            ChildId::new(),
            Word {
                name: "pes".to_string(),
                date: "2025-04-01".to_string(),
                note: None,
            },
        );
        let Ok(row) = RecordRow::encode(&stored) else {
            panic!("encode failed");
        };
        assert!(row.decode::<crate::domain::record::Tooth>().is_err());
    }

    #[test]
    fn event_row_decode_checks_log_and_state() {
        let draft = EventDraft {
            date: Some("2025-04-01".to_string()),
            time: "21:00".to_string(),
            state: SleepState::Sleep,
            label: Some("night".to_string()),
            extra: None,
        };
        let Ok(event) = draft.into_event(ChildId::new(), None) else {
            panic!("draft should be valid");
        };
        let row = EventRow::encode(&event);
        assert_eq!(row.log, EventLog::Sleep);
        assert_eq!(row.state, "sleep");
        assert!(row.clone().decode::<FeedingState>().is_none());
        assert_eq!(row.clone().decode::<SleepState>(), Some(event));

        let garbled = EventRow {
            state: "dozing".to_string(),
            ..row
        };
        assert!(garbled.decode::<SleepState>().is_none());
    }
}
