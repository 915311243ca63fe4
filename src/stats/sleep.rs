//! Day/night sleep aggregation.
//!
//! Two passes over a child's chronologically grouped sleep events:
//!
//! 1. **Within-day**: every consecutive pair on the same date that starts
//!    with `sleep` contributes its positive elapsed minutes to that date.
//! 2. **Night carry-over**: for each pair of adjacent dates in the history,
//!    the last `sleep` of the earlier date and the first `awake` of the
//!    later one form the night. Its minutes are added to the earlier date
//!    and recorded as that date's night sleep.
//!
//! Only one night per date is representable; the carry-over overwrites
//! rather than accumulates.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use super::chronological;
use crate::domain::clock;
use crate::domain::{SleepEvent, SleepState};

/// Sleep totals for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SleepDay {
    /// Calendar date the sleep spans were opened on.
    pub date: String,
    /// All sleep minutes opened on this date, night included.
    pub total_minutes: i64,
    /// Minutes of the overnight span started on this date.
    pub night_minutes: i64,
}

/// Computes per-date sleep and night-sleep minutes, ascending by date.
///
/// Every date with at least one event appears. Pairs whose date or time
/// does not parse are skipped.
#[must_use]
pub fn daily_sleep_totals(events: &[SleepEvent]) -> Vec<SleepDay> {
    let mut by_date: BTreeMap<&str, Vec<&SleepEvent>> = BTreeMap::new();
    for event in chronological(events) {
        by_date.entry(event.date.as_str()).or_default().push(event);
    }
    let groups: Vec<(&str, Vec<&SleepEvent>)> = by_date.into_iter().collect();

    let mut days: Vec<SleepDay> = groups
        .iter()
        .map(|(date, day_events)| SleepDay {
            date: (*date).to_string(),
            total_minutes: within_day_minutes(day_events),
            night_minutes: 0,
        })
        .collect();

    for (day, pair) in days.iter_mut().zip(groups.windows(2)) {
        let [(_, today), (_, tomorrow)] = pair else {
            continue;
        };
        let fell_asleep = today.iter().rev().find(|e| e.state == SleepState::Sleep);
        let woke_up = tomorrow.iter().find(|e| e.state == SleepState::Awake);
        let (Some(fell_asleep), Some(woke_up)) = (fell_asleep, woke_up) else {
            continue;
        };
        if let Some(night) = elapsed_minutes(fell_asleep, woke_up)
            && night > 0
        {
            day.total_minutes += night;
            day.night_minutes = night;
        }
    }

    days
}

/// Sums the `sleep → next` spans within one date's events.
fn within_day_minutes(day_events: &[&SleepEvent]) -> i64 {
    day_events
        .windows(2)
        .filter_map(|pair| match pair {
            [curr, next] if curr.state == SleepState::Sleep => elapsed_minutes(curr, next),
            _ => None,
        })
        .filter(|minutes| *minutes > 0)
        .sum()
}

/// Full date-time difference between two events, `None` if either does
/// not parse.
fn elapsed_minutes(from: &SleepEvent, to: &SleepEvent) -> Option<i64> {
    let start = clock::parse_date_time(&from.date, &from.time);
    let end = clock::parse_date_time(&to.date, &to.time);
    match (start, end) {
        (Some(start), Some(end)) => Some(clock::minutes_between(start, end)),
        _ => {
            tracing::warn!(
                child_id = %from.child_id,
                from_date = %from.date,
                from_time = %from.time,
                to_date = %to.date,
                to_time = %to.time,
                "skipping sleep span with malformed date or time"
            );
            None
        }
    }
}
