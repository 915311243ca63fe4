//! PostgreSQL storage backend.
//!
//! Schema lives in `migrations/` and is applied by [`PostgresStore::migrate`]
//! on startup. Children own their records and events through
//! `ON DELETE CASCADE`, so deleting a child is a single statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::{ChildStore, EventRow, EventStore, RecordRow, RecordStore, Upserted};
use crate::domain::event::EventLog;
use crate::domain::record::RecordKind;
use crate::domain::{Child, ChildId, ChildProfile, EntryId};
use crate::error::TrackerError;

type ChildTuple = (Uuid, String, String, String, Option<String>, DateTime<Utc>);
type RecordTuple = (
    Uuid,
    Uuid,
    String,
    serde_json::Value,
    Option<String>,
    DateTime<Utc>,
);
type EventTuple = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
);

const RECORD_COLUMNS: &str = "id, child_id, date, payload, upsert_key, created_at";
const EVENT_COLUMNS: &str = "id, child_id, date, time, state, label, extra, created_at";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`TrackerError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), TrackerError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| TrackerError::PersistenceError(e.to_string()))
    }
}

fn child_from_tuple((id, name, birth_date, sex, photo, created_at): ChildTuple) -> Child {
    Child {
        id: ChildId::from_uuid(id),
        profile: ChildProfile {
            name,
            birth_date,
            sex,
            photo,
        },
        created_at,
    }
}

fn record_from_tuple(
    kind: RecordKind,
    (id, child_id, date, payload, upsert_key, created_at): RecordTuple,
) -> RecordRow {
    RecordRow {
        id: EntryId::from_uuid(id),
        child_id: ChildId::from_uuid(child_id),
        kind,
        date,
        payload,
        upsert_key,
        created_at,
    }
}

/// Maps a violation of the record key index to [`TrackerError::KeyConflict`].
fn key_violation(row: &RecordRow) -> impl Fn(sqlx::Error) -> TrackerError + '_ {
    move |e| {
        if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
            row.key_conflict()
        } else {
            e.into()
        }
    }
}

fn event_from_tuple(
    log: EventLog,
    (id, child_id, date, time, state, label, extra, created_at): EventTuple,
) -> EventRow {
    EventRow {
        id: EntryId::from_uuid(id),
        child_id: ChildId::from_uuid(child_id),
        log,
        date,
        time,
        state,
        label,
        extra,
        created_at,
    }
}

async fn insert_event<'e>(
    executor: impl PgExecutor<'e>,
    row: &EventRow,
) -> Result<(), TrackerError> {
    sqlx::query(
        "INSERT INTO events (id, child_id, log, date, time, state, label, extra, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(Uuid::from(row.id))
    .bind(Uuid::from(row.child_id))
    .bind(row.log.as_str())
    .bind(&row.date)
    .bind(&row.time)
    .bind(&row.state)
    .bind(&row.label)
    .bind(&row.extra)
    .bind(row.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl ChildStore for PostgresStore {
    async fn insert_child(&self, child: &Child) -> Result<(), TrackerError> {
        sqlx::query(
            "INSERT INTO children (id, name, birth_date, sex, photo, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::from(child.id))
        .bind(&child.profile.name)
        .bind(&child.profile.birth_date)
        .bind(&child.profile.sex)
        .bind(&child.profile.photo)
        .bind(child.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_child(&self, id: ChildId) -> Result<Option<Child>, TrackerError> {
        let row = sqlx::query_as::<_, ChildTuple>(
            "SELECT id, name, birth_date, sex, photo, created_at FROM children WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(child_from_tuple))
    }

    async fn list_children(&self) -> Result<Vec<Child>, TrackerError> {
        let rows = sqlx::query_as::<_, ChildTuple>(
            "SELECT id, name, birth_date, sex, photo, created_at FROM children \
             ORDER BY name ASC, created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(child_from_tuple).collect())
    }

    async fn update_child(&self, child: &Child) -> Result<bool, TrackerError> {
        let result = sqlx::query(
            "UPDATE children SET name = $2, birth_date = $3, sex = $4, photo = $5 WHERE id = $1",
        )
        .bind(Uuid::from(child.id))
        .bind(&child.profile.name)
        .bind(&child.profile.birth_date)
        .bind(&child.profile.sex)
        .bind(&child.profile.photo)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_child(&self, id: ChildId) -> Result<bool, TrackerError> {
        let result = sqlx::query("DELETE FROM children WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RecordStore for PostgresStore {
    async fn insert_record(&self, row: &RecordRow) -> Result<(), TrackerError> {
        sqlx::query(
            "INSERT INTO records (id, child_id, kind, date, payload, upsert_key, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::from(row.id))
        .bind(Uuid::from(row.child_id))
        .bind(row.kind.as_str())
        .bind(&row.date)
        .bind(&row.payload)
        .bind(&row.upsert_key)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(key_violation(row))?;
        Ok(())
    }

    async fn upsert_record(&self, row: &RecordRow) -> Result<Upserted, TrackerError> {
        // xmax is zero only for a freshly inserted tuple.
        let (id, created_at, created) = sqlx::query_as::<_, (Uuid, DateTime<Utc>, bool)>(
            "INSERT INTO records (id, child_id, kind, date, payload, upsert_key, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (child_id, kind, upsert_key) WHERE upsert_key IS NOT NULL \
             DO UPDATE SET date = EXCLUDED.date, payload = EXCLUDED.payload \
             RETURNING id, created_at, (xmax = 0) AS created",
        )
        .bind(Uuid::from(row.id))
        .bind(Uuid::from(row.child_id))
        .bind(row.kind.as_str())
        .bind(&row.date)
        .bind(&row.payload)
        .bind(&row.upsert_key)
        .bind(row.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(Upserted {
            row: RecordRow {
                id: EntryId::from_uuid(id),
                created_at,
                ..row.clone()
            },
            created,
        })
    }

    async fn get_record(
        &self,
        kind: RecordKind,
        id: EntryId,
    ) -> Result<Option<RecordRow>, TrackerError> {
        let row = sqlx::query_as::<_, RecordTuple>(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE id = $1 AND kind = $2"
        ))
        .bind(Uuid::from(id))
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| record_from_tuple(kind, r)))
    }

    async fn list_records(
        &self,
        kind: RecordKind,
        child_id: ChildId,
        date: Option<&str>,
    ) -> Result<Vec<RecordRow>, TrackerError> {
        let rows = sqlx::query_as::<_, RecordTuple>(&format!(
            "SELECT {RECORD_COLUMNS} FROM records \
             WHERE child_id = $1 AND kind = $2 AND ($3::TEXT IS NULL OR date = $3) \
             ORDER BY date ASC, created_at ASC"
        ))
        .bind(Uuid::from(child_id))
        .bind(kind.as_str())
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| record_from_tuple(kind, r))
            .collect())
    }

    async fn update_record(&self, row: &RecordRow) -> Result<bool, TrackerError> {
        let result = sqlx::query(
            "UPDATE records SET date = $3, payload = $4, upsert_key = $5 \
             WHERE id = $1 AND kind = $2",
        )
        .bind(Uuid::from(row.id))
        .bind(row.kind.as_str())
        .bind(&row.date)
        .bind(&row.payload)
        .bind(&row.upsert_key)
        .execute(&self.pool)
        .await
        .map_err(key_violation(row))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_record(&self, kind: RecordKind, id: EntryId) -> Result<bool, TrackerError> {
        let result = sqlx::query("DELETE FROM records WHERE id = $1 AND kind = $2")
            .bind(Uuid::from(id))
            .bind(kind.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn insert_events(&self, rows: &[EventRow]) -> Result<(), TrackerError> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            insert_event(&mut *tx, row).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_event(
        &self,
        log: EventLog,
        id: EntryId,
    ) -> Result<Option<EventRow>, TrackerError> {
        let row = sqlx::query_as::<_, EventTuple>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 AND log = $2"
        ))
        .bind(Uuid::from(id))
        .bind(log.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| event_from_tuple(log, r)))
    }

    async fn list_events(
        &self,
        log: EventLog,
        child_id: ChildId,
        date: Option<&str>,
    ) -> Result<Vec<EventRow>, TrackerError> {
        let rows = sqlx::query_as::<_, EventTuple>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE child_id = $1 AND log = $2 AND ($3::TEXT IS NULL OR date = $3) \
             ORDER BY date ASC, time ASC, created_at ASC"
        ))
        .bind(Uuid::from(child_id))
        .bind(log.as_str())
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| event_from_tuple(log, r)).collect())
    }

    async fn update_event(&self, row: &EventRow) -> Result<bool, TrackerError> {
        let result = sqlx::query(
            "UPDATE events SET time = $3, state = $4, label = $5, extra = $6 \
             WHERE id = $1 AND log = $2",
        )
        .bind(Uuid::from(row.id))
        .bind(row.log.as_str())
        .bind(&row.time)
        .bind(&row.state)
        .bind(&row.label)
        .bind(&row.extra)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_event(&self, log: EventLog, id: EntryId) -> Result<bool, TrackerError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND log = $2")
            .bind(Uuid::from(id))
            .bind(log.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_day(
        &self,
        log: EventLog,
        child_id: ChildId,
        date: &str,
        rows: &[EventRow],
    ) -> Result<u64, TrackerError> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent replacements of the same day until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{log}:{child_id}:{date}"))
            .execute(&mut *tx)
            .await?;

        let deleted =
            sqlx::query("DELETE FROM events WHERE log = $1 AND child_id = $2 AND date = $3")
                .bind(log.as_str())
                .bind(Uuid::from(child_id))
                .bind(date)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        for row in rows {
            insert_event(&mut *tx, row).await?;
        }

        tx.commit().await?;
        Ok(deleted)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::record::{Record, Stored, Tooth};

    async fn connect() -> PostgresStore {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            panic!("DATABASE_URL must point at a scratch database");
        };
        let Ok(pool) = PgPool::connect(&url).await else {
            panic!("cannot connect to {url}");
        };
        let store = PostgresStore::new(pool);
        let Ok(()) = store.migrate().await else {
            panic!("migrations failed");
        };
        store
    }

    async fn seeded_child(store: &PostgresStore) -> Child {
        let child = Child::new(ChildProfile {
            name: "Ema".to_string(),
            birth_date: "2024-01-15".to_string(),
            sex: "girl".to_string(),
            photo: None,
        });
        let Ok(()) = store.insert_child(&child).await else {
            panic!("child insert failed");
        };
        child
    }

    fn sleep_row(child_id: ChildId, time: &str, state: &str, tag: &str) -> EventRow {
        EventRow {
            id: EntryId::new(),
            child_id,
            log: EventLog::Sleep,
            date: "2024-02-01".to_string(),
            time: time.to_string(),
            state: state.to_string(),
            label: Some(tag.to_string()),
            extra: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "needs a PostgreSQL database in DATABASE_URL"]
    async fn concurrent_replace_day_keeps_one_payload() {
        let store = connect().await;
        let child = seeded_child(&store).await;
        let child_id = child.id;

        let mut tasks = Vec::new();
        for n in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let tag = format!("payload-{n}");
                let rows = [
                    sleep_row(child_id, "13:00", "sleep", &tag),
                    sleep_row(child_id, "15:00", "awake", &tag),
                ];
                store
                    .replace_day(EventLog::Sleep, child_id, "2024-02-01", &rows)
                    .await
            }));
        }
        for task in tasks {
            let Ok(Ok(_)) = task.await else {
                panic!("replace_day failed");
            };
        }

        let Ok(rows) = store
            .list_events(EventLog::Sleep, child.id, Some("2024-02-01"))
            .await
        else {
            panic!("list failed");
        };
        assert_eq!(rows.len(), 2);
        let first = rows.first().and_then(|r| r.label.clone());
        assert!(rows.iter().all(|r| r.label == first));

        let Ok(true) = store.delete_child(child.id).await else {
            panic!("cleanup failed");
        };
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "needs a PostgreSQL database in DATABASE_URL"]
    async fn concurrent_tooth_upserts_keep_one_row() {
        let store = connect().await;
        let child = seeded_child(&store).await;
        let child_id = child.id;

        let mut tasks = Vec::new();
        for day in 1..=16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let tooth = Stored::new(
                    child_id,
                    Tooth {
                        tooth_id: "51".to_string(),
                        date: format!("2025-02-{day:02}"),
                    },
                );
                match RecordRow::encode(&tooth) {
                    Ok(row) => store.upsert_record(&row).await,
                    Err(e) => Err(e),
                }
            }));
        }
        let mut created = 0;
        for task in tasks {
            let Ok(Ok(upserted)) = task.await else {
                panic!("upsert failed");
            };
            created += usize::from(upserted.created);
        }
        assert_eq!(created, 1);

        let Ok(rows) = store.list_records(Tooth::KIND, child.id, None).await else {
            panic!("list failed");
        };
        assert_eq!(rows.len(), 1);

        let Ok(true) = store.delete_child(child.id).await else {
            panic!("cleanup failed");
        };
    }
}
