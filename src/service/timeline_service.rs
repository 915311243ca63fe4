//! Feeding and sleep timelines.
//!
//! Every method is generic over the log's [`EventState`], so one service
//! instance serves both logs. Stats always aggregate the complete history
//! and only then apply the requested date range.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::clock;
use crate::domain::{
    ChildId, EntryId, Event, EventDraft, EventPatch, EventState, FeedingState, SleepState,
};
use crate::error::TrackerError;
use crate::stats::{self, FeedingDay, SleepDay, StatsRange};
use crate::store::{EventRow, Storage};

/// Result of a replace-day call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayReplacement<S> {
    /// Day that was replaced.
    pub date: String,
    /// Number of events removed.
    pub deleted: u64,
    /// Number of events inserted.
    pub inserted: usize,
    /// The day's events after replacement, in chronological order.
    pub events: Vec<Event<S>>,
}

/// Event CRUD, replace-day and daily stats for both timelines.
#[derive(Debug, Clone)]
pub struct TimelineService {
    store: Arc<dyn Storage>,
}

fn not_found<S: EventState>(id: EntryId) -> TrackerError {
    TrackerError::EntryNotFound {
        kind: S::LOG.as_str(),
        id: id.into(),
    }
}

impl TimelineService {
    /// Creates a new `TimelineService`.
    #[must_use]
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    /// Stores one event.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`] for an unknown child or
    /// [`TrackerError::InvalidRequest`] for a missing date or malformed
    /// date or time.
    pub async fn create<S: EventState>(
        &self,
        child_id: ChildId,
        draft: EventDraft<S>,
    ) -> Result<Event<S>, TrackerError> {
        super::require_child(self.store.as_ref(), child_id).await?;
        let event = draft.into_event(child_id, None)?;
        self.store.insert_events(&[EventRow::encode(&event)]).await?;
        tracing::info!(
            %child_id,
            log = %S::LOG,
            date = %event.date,
            time = %event.time,
            state = event.state.as_str(),
            "event recorded"
        );
        Ok(event)
    }

    /// Stores a batch of events; nothing is stored if any draft is invalid.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`], for the first offending draft.
    pub async fn create_bulk<S: EventState>(
        &self,
        child_id: ChildId,
        drafts: Vec<EventDraft<S>>,
    ) -> Result<Vec<Event<S>>, TrackerError> {
        super::require_child(self.store.as_ref(), child_id).await?;
        let events = drafts
            .into_iter()
            .map(|d| d.into_event(child_id, None))
            .collect::<Result<Vec<_>, _>>()?;
        let events = stats::sorted(events);
        let rows: Vec<EventRow> = events.iter().map(EventRow::encode).collect();
        self.store.insert_events(&rows).await?;
        tracing::info!(%child_id, log = %S::LOG, count = events.len(), "events recorded in bulk");
        Ok(events)
    }

    /// Lists events, optionally for one date, in chronological order.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`] for an unknown child or
    /// [`TrackerError::InvalidRequest`] for a malformed date filter.
    pub async fn list<S: EventState>(
        &self,
        child_id: ChildId,
        date: Option<&str>,
    ) -> Result<Vec<Event<S>>, TrackerError> {
        super::require_child(self.store.as_ref(), child_id).await?;
        let date = date.map(clock::validate_date).transpose()?;
        self.history(child_id, date.as_deref()).await
    }

    /// Fetches one event.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`] or
    /// [`TrackerError::EntryNotFound`].
    pub async fn get<S: EventState>(
        &self,
        child_id: ChildId,
        id: EntryId,
    ) -> Result<Event<S>, TrackerError> {
        super::require_child(self.store.as_ref(), child_id).await?;
        self.owned(child_id, id).await
    }

    /// Applies a partial update to one event.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`], [`TrackerError::EntryNotFound`]
    /// or [`TrackerError::InvalidRequest`] for a malformed time.
    pub async fn update<S: EventState>(
        &self,
        child_id: ChildId,
        id: EntryId,
        patch: EventPatch<S>,
    ) -> Result<Event<S>, TrackerError> {
        super::require_child(self.store.as_ref(), child_id).await?;
        let mut event: Event<S> = self.owned(child_id, id).await?;
        patch.apply_to(&mut event)?;
        if !self.store.update_event(&EventRow::encode(&event)).await? {
            return Err(not_found::<S>(id));
        }
        tracing::info!(%child_id, %id, log = %S::LOG, "event updated");
        Ok(event)
    }

    /// Deletes one event.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`] or
    /// [`TrackerError::EntryNotFound`].
    pub async fn delete<S: EventState>(
        &self,
        child_id: ChildId,
        id: EntryId,
    ) -> Result<(), TrackerError> {
        super::require_child(self.store.as_ref(), child_id).await?;
        let _: Event<S> = self.owned(child_id, id).await?;
        if !self.store.delete_event(S::LOG, id).await? {
            return Err(not_found::<S>(id));
        }
        tracing::info!(%child_id, %id, log = %S::LOG, "event deleted");
        Ok(())
    }

    /// Replaces every event of one day with `drafts`.
    ///
    /// The drafts are validated up front and sorted by time before the
    /// store swaps the day atomically. Repeating the call with the same
    /// body leaves the same events behind.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`], or
    /// [`TrackerError::InvalidRequest`] for a malformed date or time or a
    /// draft dated on another day. Storage failures leave the day as it was.
    pub async fn replace_day<S: EventState>(
        &self,
        child_id: ChildId,
        date: &str,
        drafts: Vec<EventDraft<S>>,
    ) -> Result<DayReplacement<S>, TrackerError> {
        super::require_child(self.store.as_ref(), child_id).await?;
        let date = clock::validate_date(date)?;
        let events = drafts
            .into_iter()
            .map(|d| d.into_event(child_id, Some(&date)))
            .collect::<Result<Vec<_>, _>>()?;
        let events = stats::sorted(events);
        let rows: Vec<EventRow> = events.iter().map(EventRow::encode).collect();

        let deleted = self
            .store
            .replace_day(S::LOG, child_id, &date, &rows)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    %child_id,
                    log = %S::LOG,
                    %date,
                    error = %e,
                    "day replacement rolled back"
                );
            })?;
        tracing::info!(
            %child_id,
            log = %S::LOG,
            %date,
            deleted,
            inserted = events.len(),
            "day replaced"
        );

        Ok(DayReplacement {
            date,
            deleted,
            inserted: events.len(),
            events,
        })
    }

    /// Daily breastfeeding totals within `range`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`] or
    /// [`TrackerError::InvalidRequest`] for malformed bounds.
    pub async fn feeding_stats(
        &self,
        child_id: ChildId,
        range: StatsRange,
    ) -> Result<Vec<FeedingDay>, TrackerError> {
        let range = range.validated()?;
        super::require_child(self.store.as_ref(), child_id).await?;
        let history = self.history::<FeedingState>(child_id, None).await?;
        Ok(stats::daily_feeding_totals(&history)
            .into_iter()
            .filter(|day| range.contains(&day.date))
            .collect())
    }

    /// Daily sleep and night-sleep totals within `range`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`] or
    /// [`TrackerError::InvalidRequest`] for malformed bounds.
    pub async fn sleep_stats(
        &self,
        child_id: ChildId,
        range: StatsRange,
    ) -> Result<Vec<SleepDay>, TrackerError> {
        let range = range.validated()?;
        super::require_child(self.store.as_ref(), child_id).await?;
        let history = self.history::<SleepState>(child_id, None).await?;
        Ok(stats::daily_sleep_totals(&history)
            .into_iter()
            .filter(|day| range.contains(&day.date))
            .collect())
    }

    async fn owned<S: EventState>(
        &self,
        child_id: ChildId,
        id: EntryId,
    ) -> Result<Event<S>, TrackerError> {
        self.store
            .get_event(S::LOG, id)
            .await?
            .filter(|row| row.child_id == child_id)
            .and_then(EventRow::decode::<S>)
            .ok_or_else(|| not_found::<S>(id))
    }

    /// Loads and sorts stored events; rows with unknown states are skipped.
    async fn history<S: EventState>(
        &self,
        child_id: ChildId,
        date: Option<&str>,
    ) -> Result<Vec<Event<S>>, TrackerError> {
        let rows = self.store.list_events(S::LOG, child_id, date).await?;
        Ok(stats::sorted(
            rows.into_iter().filter_map(EventRow::decode::<S>).collect(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::ChildProfile;
    use crate::service::ChildService;
    use crate::store::MemoryStore;

    async fn setup() -> (TimelineService, ChildId) {
        let store: Arc<dyn Storage> = Arc::new(MemoryStore::new());
        let Ok(child) = ChildService::new(Arc::clone(&store))
            .create(ChildProfile {
                name: "Ema".to_string(),
                birth_date: "2024-01-15".to_string(),
                sex: "girl".to_string(),
                photo: None,
            })
            .await
        else {
            panic!("child create failed");
        };
        (TimelineService::new(store), child.id)
    }

    fn draft<S: EventState>(date: Option<&str>, time: &str, state: S) -> EventDraft<S> {
        EventDraft {
            date: date.map(str::to_string),
            time: time.to_string(),
            state,
            label: None,
            extra: None,
        }
    }

    fn times<S: EventState>(events: &[Event<S>]) -> Vec<&str> {
        events.iter().map(|e| e.time.as_str()).collect()
    }

    #[tokio::test]
    async fn create_normalizes_time() {
        let (svc, child) = setup().await;
        let Ok(event) = svc
            .create(child, draft(Some("2024-06-01"), "7:05", FeedingState::Start))
            .await
        else {
            panic!("create failed");
        };
        assert_eq!(event.time, "07:05");
    }

    #[tokio::test]
    async fn bulk_rejects_whole_batch_on_one_bad_item() {
        let (svc, child) = setup().await;
        let drafts = vec![
            draft(Some("2024-06-01"), "08:00", FeedingState::Start),
            draft(Some("2024-06-01"), "25:00", FeedingState::Stop),
        ];
        assert!(svc.create_bulk(child, drafts).await.is_err());
        let Ok(events) = svc.list::<FeedingState>(child, None).await else {
            panic!("list failed");
        };
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn list_is_chronological() {
        let (svc, child) = setup().await;
        let drafts = vec![
            draft(Some("2024-06-02"), "06:00", SleepState::Awake),
            draft(Some("2024-06-01"), "21:00", SleepState::Sleep),
            draft(Some("2024-06-01"), "9:30", SleepState::Sleep),
        ];
        let Ok(_) = svc.create_bulk(child, drafts).await else {
            panic!("bulk failed");
        };
        let Ok(events) = svc.list::<SleepState>(child, None).await else {
            panic!("list failed");
        };
        assert_eq!(times(&events), vec!["09:30", "21:00", "06:00"]);
    }

    #[tokio::test]
    async fn replace_day_sorts_and_is_idempotent() {
        let (svc, child) = setup().await;
        let body = || {
            vec![
                draft(None, "22:00", SleepState::Sleep),
                draft(None, "13:00", SleepState::Sleep),
                draft(None, "15:00", SleepState::Awake),
            ]
        };
        let Ok(first) = svc.replace_day(child, "2024-06-01", body()).await else {
            panic!("first replace failed");
        };
        assert_eq!(first.deleted, 0);
        assert_eq!(first.inserted, 3);
        assert_eq!(times(&first.events), vec!["13:00", "15:00", "22:00"]);

        let Ok(second) = svc.replace_day(child, "2024-06-01", body()).await else {
            panic!("second replace failed");
        };
        assert_eq!(second.deleted, 3);

        let Ok(day) = svc.list::<SleepState>(child, Some("2024-06-01")).await else {
            panic!("list failed");
        };
        assert_eq!(times(&day), vec!["13:00", "15:00", "22:00"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_replace_day_keeps_one_payload() {
        let (svc, child) = setup().await;
        let mut tasks = Vec::new();
        for n in 0..32 {
            let svc = svc.clone();
            tasks.push(tokio::spawn(async move {
                let tag = format!("payload-{n}");
                let body = vec![
                    EventDraft {
                        label: Some(tag.clone()),
                        ..draft(None, "13:00", SleepState::Sleep)
                    },
                    EventDraft {
                        label: Some(tag),
                        ..draft(None, "15:00", SleepState::Awake)
                    },
                ];
                svc.replace_day(child, "2024-06-01", body).await
            }));
        }
        for task in tasks {
            let Ok(Ok(_)) = task.await else {
                panic!("replace failed");
            };
        }

        let Ok(day) = svc.list::<SleepState>(child, Some("2024-06-01")).await else {
            panic!("list failed");
        };
        assert_eq!(times(&day), vec!["13:00", "15:00"]);
        let first = day.first().and_then(|e| e.label.clone());
        assert!(first.is_some());
        assert!(day.iter().all(|e| e.label == first));
    }

    #[tokio::test]
    async fn replace_day_rejects_foreign_date_and_keeps_day() {
        let (svc, child) = setup().await;
        let Ok(_) = svc
            .replace_day(child, "2024-06-01", vec![draft(None, "13:00", SleepState::Sleep)])
            .await
        else {
            panic!("seed failed");
        };
        let body = vec![draft(Some("2024-06-02"), "14:00", SleepState::Awake)];
        assert!(matches!(
            svc.replace_day(child, "2024-06-01", body).await,
            Err(TrackerError::InvalidRequest(_))
        ));
        let Ok(day) = svc.list::<SleepState>(child, Some("2024-06-01")).await else {
            panic!("list failed");
        };
        assert_eq!(times(&day), vec!["13:00"]);
    }

    #[tokio::test]
    async fn stats_range_filters_output_not_input() {
        let (svc, child) = setup().await;
        let drafts = vec![
            draft(Some("2024-06-01"), "22:00", SleepState::Sleep),
            draft(Some("2024-06-02"), "06:30", SleepState::Awake),
        ];
        let Ok(_) = svc.create_bulk(child, drafts).await else {
            panic!("bulk failed");
        };
        let range = StatsRange {
            from: Some("2024-06-01".to_string()),
            to: Some("2024-06-01".to_string()),
        };
        let Ok(days) = svc.sleep_stats(child, range).await else {
            panic!("stats failed");
        };
        assert_eq!(
            days,
            vec![SleepDay {
                date: "2024-06-01".to_string(),
                total_minutes: 510,
                night_minutes: 510,
            }]
        );
    }

    #[tokio::test]
    async fn feeding_stats_for_unknown_child_is_not_found() {
        let (svc, _) = setup().await;
        assert!(matches!(
            svc.feeding_stats(ChildId::new(), StatsRange::default()).await,
            Err(TrackerError::ChildNotFound(_))
        ));
    }

    #[tokio::test]
    async fn events_are_scoped_to_their_log() {
        let (svc, child) = setup().await;
        let Ok(feed) = svc
            .create(child, draft(Some("2024-06-01"), "08:00", FeedingState::Start))
            .await
        else {
            panic!("create failed");
        };
        assert!(matches!(
            svc.get::<SleepState>(child, feed.id).await,
            Err(TrackerError::EntryNotFound { kind: "sleep", .. })
        ));
        assert!(svc.delete::<FeedingState>(child, feed.id).await.is_ok());
        assert!(svc.get::<FeedingState>(child, feed.id).await.is_err());
    }
}
