//! Calendar date and wall-clock time handling.
//!
//! Dates travel as `YYYY-MM-DD` strings and times as `HH:MM` strings so
//! that lexicographic order equals chronological order. Writes go through
//! [`validate_date`] and [`normalize_time`]; aggregation uses the lenient
//! [`parse_date`] / [`parse_time`] and skips whatever does not parse.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::TrackerError;

/// Parses a `YYYY-MM-DD` date, returning `None` when malformed.
#[must_use]
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()
}

/// Parses an `H:MM` / `HH:MM` wall-clock time, returning `None` when
/// malformed or out of range.
#[must_use]
pub fn parse_time(time: &str) -> Option<NaiveTime> {
    let (hh, mm) = time.trim().split_once(':')?;
    if hh.is_empty() || hh.len() > 2 || mm.len() != 2 {
        return None;
    }
    if !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = hh.parse().ok()?;
    let minute: u32 = mm.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Combines a date and time string into a single timestamp.
#[must_use]
pub fn parse_date_time(date: &str, time: &str) -> Option<NaiveDateTime> {
    Some(parse_date(date)?.and_time(parse_time(time)?))
}

/// Whole minutes from `from` to `to` (negative when `to` is earlier).
#[must_use]
pub fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_minutes()
}

/// Checks a `YYYY-MM-DD` date on the write path and returns it trimmed.
///
/// # Errors
///
/// Returns [`TrackerError::InvalidRequest`] when the date does not parse.
pub fn validate_date(date: &str) -> Result<String, TrackerError> {
    let parsed = parse_date(date)
        .ok_or_else(|| TrackerError::invalid(format!("date must be YYYY-MM-DD, got {date:?}")))?;
    Ok(parsed.format("%Y-%m-%d").to_string())
}

/// Normalizes `H:MM` to zero-padded `HH:MM`.
///
/// # Errors
///
/// Returns [`TrackerError::InvalidRequest`] when the hour is outside
/// `0..=23`, the minute outside `0..=59`, or the shape is not `H:MM`.
pub fn normalize_time(time: &str) -> Result<String, TrackerError> {
    let parsed = parse_time(time)
        .ok_or_else(|| TrackerError::invalid(format!("time must be HH:MM, got {time:?}")))?;
    Ok(parsed.format("%H:%M").to_string())
}
