//! Calendar bucket keys for daily and weekly counters.
//!
//! Kept as pure functions of `(instant, timezone)` so rollover logic can be
//! tested without a real clock.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// First day of the statistics week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

/// Day and week bucket identifiers for one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketKeys {
    /// Calendar date, `YYYY-MM-DD`.
    pub day: String,
    /// Date of the first day of the week containing `day`, `YYYY-MM-DD`.
    pub week: String,
}

/// Compute the bucket keys of `instant` as observed in `tz`.
pub fn bucket_keys<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz, week_start: WeekStart) -> BucketKeys {
    let date = instant.with_timezone(tz).date_naive();
    BucketKeys {
        day: day_key(date),
        week: day_key(week_start_of(date, week_start)),
    }
}

fn week_start_of(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    let offset = match week_start {
        WeekStart::Sunday => date.weekday().num_days_from_sunday(),
        WeekStart::Monday => date.weekday().num_days_from_monday(),
    };
    date - Duration::days(i64::from(offset))
}

fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
