//! Day-bucketed summaries derived from timeline events.
//!
//! Both aggregators are pure functions over one child's complete event
//! history. They sort their input themselves, never fail, and skip
//! (with a `warn` log) any event whose date or time does not parse.

pub mod feeding;
pub mod sleep;

use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::clock;
use crate::domain::event::{Event, EventState, sort_chronologically};
use crate::error::TrackerError;

pub use feeding::{FeedingDay, daily_feeding_totals};
pub use sleep::{SleepDay, daily_sleep_totals};

/// Optional inclusive date bounds applied to aggregated output.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatsRange {
    /// First date to include (`YYYY-MM-DD`).
    #[serde(default)]
    pub from: Option<String>,
    /// Last date to include (`YYYY-MM-DD`).
    #[serde(default)]
    pub to: Option<String>,
}

impl StatsRange {
    /// Validates both bounds and returns them in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidRequest`] for a malformed bound or
    /// `from` after `to`.
    pub fn validated(self) -> Result<Self, TrackerError> {
        let from = self.from.as_deref().map(clock::validate_date).transpose()?;
        let to = self.to.as_deref().map(clock::validate_date).transpose()?;
        if let (Some(f), Some(t)) = (&from, &to)
            && f > t
        {
            return Err(TrackerError::invalid(format!(
                "range start {f} is after range end {t}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Returns `true` when `date` lies within the bounds.
    #[must_use]
    pub fn contains(&self, date: &str) -> bool {
        self.from.as_deref().is_none_or(|f| date >= f)
            && self.to.as_deref().is_none_or(|t| date <= t)
    }
}

/// Returns the events ordered by `(date, time)` without mutating the input.
fn chronological<S: EventState>(events: &[Event<S>]) -> Vec<&Event<S>> {
    let mut sorted: Vec<&Event<S>> = events.iter().collect();
    sorted.sort_by(|a, b| a.chronological_cmp(b));
    sorted
}

/// Sorts an owned batch chronologically; used before persisting.
pub fn sorted<S: EventState>(mut events: Vec<Event<S>>) -> Vec<Event<S>> {
    sort_chronologically(&mut events);
    events
}
