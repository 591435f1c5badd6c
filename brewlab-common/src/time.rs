//! Timestamp utilities

use chrono::{DateTime, Datelike, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds since the Unix epoch for a timestamp
pub fn to_millis(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

/// Timestamp from milliseconds since the Unix epoch
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// ISO-8601 week identifier, e.g. `2026-W07`
///
/// Uses the ISO week-numbering year so the last days of December that belong
/// to week 1 report the following year.
pub fn iso_week_id(timestamp: DateTime<Utc>) -> String {
    let week = timestamp.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// Whole weeks between two instants, ignoring direction
pub fn whole_weeks_between(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (a - b).num_milliseconds().abs() / (7 * 24 * 60 * 60 * 1000)
}
