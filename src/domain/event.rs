//! Timeline events: breastfeeding start/stop and sleep/awake transitions.
//!
//! Both logs share one shape, [`Event<S>`], parameterised by the state
//! enum. Nothing about the order of states is enforced when writing; the
//! aggregators in [`crate::stats`] tolerate any sequence.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::clock;
use super::{ChildId, EntryId};
use crate::error::TrackerError;

/// Which timeline an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLog {
    /// Breastfeeding sessions.
    Feeding,
    /// Sleep and wake-ups.
    Sleep,
}

impl EventLog {
    /// Stable storage name of the log.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Feeding => "feeding",
            Self::Sleep => "sleep",
        }
    }
}

impl fmt::Display for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State tag of a timeline. Each implementor owns exactly one [`EventLog`].
pub trait EventState:
    Copy + Eq + Serialize + DeserializeOwned + Send + Sync + fmt::Debug + 'static
{
    /// Log this state belongs to.
    const LOG: EventLog;

    /// Storage name of the state.
    fn as_str(&self) -> &'static str;

    /// Parses a stored state name.
    fn parse(s: &str) -> Option<Self>;
}

/// Breastfeeding transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FeedingState {
    /// Feeding began.
    Start,
    /// Feeding ended.
    Stop,
}

impl EventState for FeedingState {
    const LOG: EventLog = EventLog::Feeding;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// Sleep transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SleepState {
    /// Child fell asleep.
    Sleep,
    /// Child woke up.
    Awake,
}

impl EventState for SleepState {
    const LOG: EventLog = EventLog::Sleep;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Awake => "awake",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "sleep" => Some(Self::Sleep),
            "awake" => Some(Self::Awake),
            _ => None,
        }
    }
}

/// A stored timeline event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "S: EventState"))]
pub struct Event<S> {
    /// Entry identifier.
    pub id: EntryId,
    /// Owning child.
    pub child_id: ChildId,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Wall-clock time, `HH:MM`.
    pub time: String,
    /// Transition tag.
    pub state: S,
    /// Optional client label (e.g. which breast, nap vs. night).
    #[serde(default)]
    pub label: Option<String>,
    /// Optional free-form extra data.
    #[serde(default)]
    pub extra: Option<String>,
    /// Server-side insertion timestamp; informational only.
    pub created_at: DateTime<Utc>,
}

/// Breastfeeding event.
pub type FeedingEvent = Event<FeedingState>;

/// Sleep event.
pub type SleepEvent = Event<SleepState>;

impl<S: EventState> Event<S> {
    /// Chronological ordering by `(date, time)`.
    ///
    /// Times that do not parse sort before valid ones on the same date;
    /// exact ties compare equal, so stable sorts keep input order.
    #[must_use]
    pub fn chronological_cmp(&self, other: &Self) -> Ordering {
        self.date.cmp(&other.date).then_with(|| {
            clock::parse_time(&self.time)
                .cmp(&clock::parse_time(&other.time))
                .then_with(|| self.time.cmp(&other.time))
        })
    }
}

/// Sorts events in place by `(date, time)`, keeping ties in input order.
pub fn sort_chronologically<S: EventState>(events: &mut [Event<S>]) {
    events.sort_by(Event::chronological_cmp);
}

/// Client-submitted event before it is stored.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(bound(deserialize = "S: EventState"))]
pub struct EventDraft<S> {
    /// Calendar date. Required for single and bulk creation; optional
    /// for replace-day, where it must match the day being replaced.
    #[serde(default)]
    pub date: Option<String>,
    /// Wall-clock time, `H:MM` or `HH:MM`.
    pub time: String,
    /// Transition tag.
    pub state: S,
    /// Optional client label.
    #[serde(default)]
    pub label: Option<String>,
    /// Optional free-form extra data.
    #[serde(default)]
    pub extra: Option<String>,
}

impl<S: EventState> EventDraft<S> {
    /// Validates the draft and turns it into an event for `child_id`.
    ///
    /// `day` is the date fixed by the caller (replace-day); when given,
    /// a differing draft date is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidRequest`] for a missing or malformed
    /// date, a malformed time, or a date that contradicts `day`.
    pub fn into_event(
        self,
        child_id: ChildId,
        day: Option<&str>,
    ) -> Result<Event<S>, TrackerError> {
        let date = match (self.date.as_deref(), day) {
            (Some(own), Some(day)) => {
                let own = clock::validate_date(own)?;
                if own != day {
                    return Err(TrackerError::invalid(format!(
                        "event date {own} does not match day {day}"
                    )));
                }
                own
            }
            (Some(own), None) => clock::validate_date(own)?,
            (None, Some(day)) => day.to_string(),
            (None, None) => return Err(TrackerError::invalid("event date is required")),
        };
        Ok(Event {
            id: EntryId::new(),
            child_id,
            date,
            time: clock::normalize_time(&self.time)?,
            state: self.state,
            label: self.label,
            extra: self.extra,
            created_at: Utc::now(),
        })
    }
}

/// Partial update of a stored event. The date is fixed; move an event
/// between days with replace-day instead.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(bound(deserialize = "S: EventState"))]
pub struct EventPatch<S> {
    /// New time.
    #[serde(default)]
    pub time: Option<String>,
    /// New state.
    #[serde(default)]
    pub state: Option<S>,
    /// New label.
    #[serde(default)]
    pub label: Option<String>,
    /// New extra data.
    #[serde(default)]
    pub extra: Option<String>,
}

impl<S: EventState> EventPatch<S> {
    /// Applies the patch to `event`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidRequest`] for a malformed time; the
    /// event is left untouched in that case.
    pub fn apply_to(self, event: &mut Event<S>) -> Result<(), TrackerError> {
        let time = self.time.as_deref().map(clock::normalize_time).transpose()?;
        if let Some(time) = time {
            event.time = time;
        }
        if let Some(state) = self.state {
            event.state = state;
        }
        if self.label.is_some() {
            event.label = self.label;
        }
        if self.extra.is_some() {
            event.extra = self.extra;
        }
        Ok(())
    }
}
