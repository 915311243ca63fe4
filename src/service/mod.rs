//! Service layer: business rules between the HTTP handlers and storage.
//!
//! Every service holds an `Arc<dyn Storage>` and is cheap to clone. Writes
//! against a child that does not exist fail with
//! [`TrackerError::ChildNotFound`], and entries owned by another child are
//! reported as missing.

pub mod child_service;
pub mod record_service;
pub mod timeline_service;

pub use child_service::ChildService;
pub use record_service::RecordService;
pub use timeline_service::{DayReplacement, TimelineService};

use crate::domain::{Child, ChildId};
use crate::error::TrackerError;
use crate::store::Storage;

/// Loads a child or fails with [`TrackerError::ChildNotFound`].
async fn require_child(store: &dyn Storage, id: ChildId) -> Result<Child, TrackerError> {
    store
        .get_child(id)
        .await?
        .ok_or_else(|| TrackerError::ChildNotFound(id.into()))
}
