//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::{ChildService, RecordService, TimelineService};
use crate::store::Storage;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Child profiles.
    pub children: Arc<ChildService>,
    /// Growth, milestone, word, tooth and food records.
    pub records: Arc<RecordService>,
    /// Feeding and sleep timelines.
    pub timeline: Arc<TimelineService>,
}

impl AppState {
    /// Builds every service on top of one storage backend.
    #[must_use]
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self {
            children: Arc::new(ChildService::new(Arc::clone(&store))),
            records: Arc::new(RecordService::new(Arc::clone(&store))),
            timeline: Arc::new(TimelineService::new(store)),
        }
    }
}
