//! Breastfeeding interval pairing.
//!
//! Walks a child's `start`/`stop` events in chronological order and pairs
//! each `stop` with the pending `start` of the same date. Intervals are
//! same-day wall-clock differences; there is no cross-midnight handling.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveTime;
use serde::Serialize;
use utoipa::ToSchema;

use super::chronological;
use crate::domain::clock;
use crate::domain::{FeedingEvent, FeedingState};

/// Intervals at or above this many minutes are treated as a forgotten stop.
pub const MAX_PLAUSIBLE_FEED_MINUTES: i64 = 120;

/// Minutes credited for an interval outside `(0, MAX_PLAUSIBLE_FEED_MINUTES)`.
pub const FALLBACK_FEED_MINUTES: i64 = 15;

/// Total breastfeeding time on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FeedingDay {
    /// Calendar date of the opening `start` events.
    pub date: String,
    /// Sum of credited interval minutes.
    pub total_minutes: i64,
}

/// Computes per-date breastfeeding minutes, ascending by date.
///
/// Every date with at least one event appears, with 0 if nothing paired.
/// A second `start` on a date replaces the pending one; a `stop` without a
/// pending `start` on its date is ignored.
#[must_use]
pub fn daily_feeding_totals(events: &[FeedingEvent]) -> Vec<FeedingDay> {
    let mut totals: BTreeMap<&str, i64> = BTreeMap::new();
    let mut open: HashMap<&str, NaiveTime> = HashMap::new();

    for event in chronological(events) {
        let date = event.date.as_str();
        let total = totals.entry(date).or_insert(0);
        let time = clock::parse_time(&event.time);

        match event.state {
            FeedingState::Start => match time {
                Some(t) => {
                    open.insert(date, t);
                }
                None => {
                    tracing::warn!(
                        child_id = %event.child_id,
                        date,
                        time = %event.time,
                        "skipping feeding start with malformed time"
                    );
                    open.remove(date);
                }
            },
            FeedingState::Stop => {
                let Some(started) = open.remove(date) else {
                    continue;
                };
                let Some(stopped) = time else {
                    tracing::warn!(
                        child_id = %event.child_id,
                        date,
                        time = %event.time,
                        "skipping feeding stop with malformed time"
                    );
                    continue;
                };
                *total += credited_minutes((stopped - started).num_minutes());
            }
        }
    }

    totals
        .into_iter()
        .map(|(date, total_minutes)| FeedingDay {
            date: date.to_string(),
            total_minutes,
        })
        .collect()
}

/// Applies the plausibility window to one paired interval.
#[must_use]
pub const fn credited_minutes(elapsed: i64) -> i64 {
    if elapsed > 0 && elapsed < MAX_PLAUSIBLE_FEED_MINUTES {
        elapsed
    } else {
        FALLBACK_FEED_MINUTES
    }
}
