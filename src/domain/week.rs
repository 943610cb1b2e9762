//! ISO-week calendar helpers for the weekly snapshot.
//!
//! The leaderboard week starts Monday 00:00 UTC; gains always measure
//! from the most recent Monday.

use chrono::{Datelike, Duration, NaiveDate, Utc};

/// The Monday that starts the ISO week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    let days_from_monday = i64::from(date.weekday().num_days_from_monday());
    date - Duration::days(days_from_monday)
}

/// The Monday that starts the current ISO week (UTC).
pub fn current_week_start() -> NaiveDate {
    week_start_of(Utc::now().date_naive())
}
