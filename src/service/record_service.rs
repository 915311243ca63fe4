//! Generic repository for observation records.
//!
//! One implementation serves every [`Record`] kind. Kinds with an
//! [`Record::upsert_key`] keep a single record per key and child; the store
//! enforces that atomically.

use std::sync::Arc;

use crate::domain::clock;
use crate::domain::{ChildId, EntryId, Record, RecordQuery, Stored};
use crate::error::TrackerError;
use crate::store::{RecordRow, Storage};

/// Outcome of a create call on an upserting kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Saved<R> {
    /// The stored record.
    pub stored: Stored<R>,
    /// `false` when an existing record with the same key was replaced.
    pub created: bool,
}

/// CRUD for growth, milestone, word, tooth and food records.
#[derive(Debug, Clone)]
pub struct RecordService {
    store: Arc<dyn Storage>,
}

fn not_found<R: Record>(id: EntryId) -> TrackerError {
    TrackerError::EntryNotFound {
        kind: R::KIND.as_str(),
        id: id.into(),
    }
}

impl RecordService {
    /// Creates a new `RecordService`.
    #[must_use]
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    /// Stores a new record, or replaces the record with the same upsert key.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`] for an unknown child or
    /// [`TrackerError::InvalidRequest`] for an invalid record.
    pub async fn create<R: Record>(
        &self,
        child_id: ChildId,
        record: R,
    ) -> Result<Saved<R>, TrackerError> {
        super::require_child(self.store.as_ref(), child_id).await?;
        let stored = Stored::new(child_id, record.validated()?);
        let row = RecordRow::encode(&stored)?;

        if row.upsert_key.is_none() {
            self.store.insert_record(&row).await?;
            tracing::info!(%child_id, id = %stored.id, kind = %R::KIND, "record created");
            return Ok(Saved {
                stored,
                created: true,
            });
        }

        let upserted = self.store.upsert_record(&row).await?;
        let stored = Stored {
            id: upserted.row.id,
            created_at: upserted.row.created_at,
            ..stored
        };
        if upserted.created {
            tracing::info!(%child_id, id = %stored.id, kind = %R::KIND, "record created");
        } else {
            tracing::info!(%child_id, id = %stored.id, kind = %R::KIND, "record replaced");
        }
        Ok(Saved {
            stored,
            created: upserted.created,
        })
    }

    /// Lists a child's records matching `query`, ordered by date.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`] for an unknown child or
    /// [`TrackerError::InvalidRequest`] for a malformed date filter.
    pub async fn list<R: Record>(
        &self,
        child_id: ChildId,
        query: RecordQuery,
    ) -> Result<Vec<Stored<R>>, TrackerError> {
        super::require_child(self.store.as_ref(), child_id).await?;
        let query = RecordQuery {
            date: query.date.as_deref().map(clock::validate_date).transpose()?,
            ..query
        };
        Ok(self
            .all::<R>(child_id, query.date.as_deref())
            .await?
            .into_iter()
            .filter(|s| s.record.matches(&query))
            .collect())
    }

    /// Fetches one record.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`] or
    /// [`TrackerError::EntryNotFound`].
    pub async fn get<R: Record>(
        &self,
        child_id: ChildId,
        id: EntryId,
    ) -> Result<Stored<R>, TrackerError> {
        super::require_child(self.store.as_ref(), child_id).await?;
        self.owned::<R>(child_id, id).await
    }

    /// Applies a partial update and re-validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`], [`TrackerError::EntryNotFound`],
    /// [`TrackerError::InvalidRequest`] if the patched record is invalid, or
    /// [`TrackerError::KeyConflict`] if it would take another record's key.
    pub async fn update<R: Record>(
        &self,
        child_id: ChildId,
        id: EntryId,
        patch: R::Patch,
    ) -> Result<Stored<R>, TrackerError> {
        super::require_child(self.store.as_ref(), child_id).await?;
        let mut stored = self.owned::<R>(child_id, id).await?;
        stored.record.apply(patch);
        stored.record = stored.record.validated()?;
        if !self.store.update_record(&RecordRow::encode(&stored)?).await? {
            return Err(not_found::<R>(id));
        }
        tracing::info!(%child_id, %id, kind = %R::KIND, "record updated");
        Ok(stored)
    }

    /// Deletes one record.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`] or
    /// [`TrackerError::EntryNotFound`].
    pub async fn delete<R: Record>(
        &self,
        child_id: ChildId,
        id: EntryId,
    ) -> Result<(), TrackerError> {
        super::require_child(self.store.as_ref(), child_id).await?;
        self.owned::<R>(child_id, id).await?;
        if !self.store.delete_record(R::KIND, id).await? {
            return Err(not_found::<R>(id));
        }
        tracing::info!(%child_id, %id, kind = %R::KIND, "record deleted");
        Ok(())
    }

    /// Loads an entry, treating one owned by another child as missing.
    async fn owned<R: Record>(
        &self,
        child_id: ChildId,
        id: EntryId,
    ) -> Result<Stored<R>, TrackerError> {
        match self.store.get_record(R::KIND, id).await? {
            Some(row) if row.child_id == child_id => row.decode(),
            _ => Err(not_found::<R>(id)),
        }
    }

    /// Decodes every stored row, skipping ones that no longer parse.
    async fn all<R: Record>(
        &self,
        child_id: ChildId,
        date: Option<&str>,
    ) -> Result<Vec<Stored<R>>, TrackerError> {
        let rows = self.store.list_records(R::KIND, child_id, date).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match row.decode::<R>() {
                Ok(stored) => Some(stored),
                Err(e) => {
                    tracing::warn!(
                        %child_id,
                        kind = %R::KIND,
                        error = %e,
                        "skipping undecodable record"
                    );
                    None
                }
            })
            .collect())
    }
}
