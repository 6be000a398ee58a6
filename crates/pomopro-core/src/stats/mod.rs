//! Session statistics.
//!
//! [`StatisticsSnapshot`] is the persisted `statistics` record. It is mutated
//! only through [`StatsAggregator`], which owns the calendar context
//! (timezone, week start) and recognizes day/week rollover before counting.

mod calendar;

pub use calendar::{bucket_keys, BucketKeys, WeekStart};

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::timer::SessionMode;

/// Aggregated completion counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatisticsSnapshot {
    #[serde(alias = "todayPomodoros")]
    pub today_count: u32,
    #[serde(alias = "weekPomodoros")]
    pub week_count: u32,
    #[serde(alias = "totalPomodoros")]
    pub total_count: u32,
    /// Day key (`YYYY-MM-DD`) to completions.
    #[serde(alias = "dailyPomodoros")]
    pub daily_counts: BTreeMap<String, u32>,
    /// Week key (`YYYY-MM-DD` of the week's first day) to completions.
    #[serde(alias = "weeklyPomodoros")]
    pub weekly_counts: BTreeMap<String, u32>,
    #[serde(alias = "completedTasks")]
    pub completed_task_count: u32,
    #[serde(alias = "consecutivePomodoros")]
    pub consecutive_focus_streak: u32,
}

impl StatisticsSnapshot {
    /// Most recent day that has a bucket.
    pub fn last_day_key(&self) -> Option<&str> {
        self.daily_counts.keys().next_back().map(String::as_str)
    }

    /// Most recent week that has a bucket.
    pub fn last_week_key(&self) -> Option<&str> {
        self.weekly_counts.keys().next_back().map(String::as_str)
    }

    /// Zero `today_count`/`week_count` when `keys` names a different day or
    /// week than the last recorded bucket.
    fn roll_over_to(&mut self, keys: &BucketKeys) {
        if self.last_day_key() != Some(keys.day.as_str()) && self.today_count != 0 {
            debug!(day = %keys.day, "day rollover");
            self.today_count = 0;
        }
        if self.last_week_key() != Some(keys.week.as_str()) && self.week_count != 0 {
            debug!(week = %keys.week, "week rollover");
            self.week_count = 0;
        }
    }

    /// Count one completion into the given buckets.
    ///
    /// Not idempotent: calling it twice counts twice.
    fn count(&mut self, mode: SessionMode, keys: &BucketKeys) {
        *self.daily_counts.entry(keys.day.clone()).or_insert(0) += 1;
        *self.weekly_counts.entry(keys.week.clone()).or_insert(0) += 1;
        self.today_count += 1;
        self.week_count += 1;
        self.total_count += 1;
        if mode == SessionMode::Focus {
            self.consecutive_focus_streak += 1;
        } else {
            self.consecutive_focus_streak = 0;
        }
    }

    /// `(day, count)` pairs in chronological order.
    pub fn daily_series(&self) -> Vec<(&str, u32)> {
        self.daily_counts
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect()
    }

    /// `(week, count)` pairs in chronological order.
    pub fn weekly_series(&self) -> Vec<(&str, u32)> {
        self.weekly_counts
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect()
    }
}

/// Sole mutator of a [`StatisticsSnapshot`].
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    snapshot: StatisticsSnapshot,
    tz: FixedOffset,
    week_start: WeekStart,
}

impl StatsAggregator {
    /// Aggregate in the host's current local offset.
    pub fn new(snapshot: StatisticsSnapshot, week_start: WeekStart) -> Self {
        let tz = Local::now().offset().fix();
        Self::with_timezone(snapshot, tz, week_start)
    }

    pub fn with_timezone(snapshot: StatisticsSnapshot, tz: FixedOffset, week_start: WeekStart) -> Self {
        Self {
            snapshot,
            tz,
            week_start,
        }
    }

    pub fn set_week_start(&mut self, week_start: WeekStart) {
        self.week_start = week_start;
    }

    pub fn snapshot(&self) -> &StatisticsSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> StatisticsSnapshot {
        self.snapshot
    }

    pub fn keys_for(&self, at: DateTime<Utc>) -> BucketKeys {
        bucket_keys(at, &self.tz, self.week_start)
    }

    /// Record one completed session of `mode` at `at`.
    ///
    /// Breaks are not counted. A focus completion extends the consecutive
    /// streak; a deep-focus completion counts but ends the streak.
    pub fn record_completion(&mut self, mode: SessionMode, at: DateTime<Utc>) {
        if !mode.is_work() {
            return;
        }
        let keys = self.keys_for(at);
        self.snapshot.roll_over_to(&keys);
        self.snapshot.count(mode, &keys);
        debug!(
            %mode,
            day = %keys.day,
            today = self.snapshot.today_count,
            total = self.snapshot.total_count,
            streak = self.snapshot.consecutive_focus_streak,
            "completion recorded"
        );
    }

    /// Overwrite the completed-task count with a freshly recomputed value.
    pub fn record_task_completion(&mut self, completed_count: u32) {
        self.snapshot.completed_task_count = completed_count;
    }

    pub fn reset_streak(&mut self) {
        if self.snapshot.consecutive_focus_streak != 0 {
            debug!(
                was = self.snapshot.consecutive_focus_streak,
                "consecutive focus streak reset"
            );
        }
        self.snapshot.consecutive_focus_streak = 0;
    }

    /// Apply day/week rollover for `now` without recording anything, so that
    /// "today" reads zero on a new day before its first completion.
    pub fn roll_over(&mut self, now: DateTime<Utc>) {
        let keys = self.keys_for(now);
        self.snapshot.roll_over_to(&keys);
    }

    pub fn streak(&self) -> u32 {
        self.snapshot.consecutive_focus_streak
    }

    /// Minutes of focus completed today, assuming each counted session ran
    /// for `focus_secs`.
    pub fn focused_minutes_today(&self, focus_secs: u64) -> u64 {
        u64::from(self.snapshot.today_count) * focus_secs / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn utc_aggregator(snapshot: StatisticsSnapshot) -> StatsAggregator {
        StatsAggregator::with_timezone(snapshot, FixedOffset::east_opt(0).unwrap(), WeekStart::Sunday)
    }

    fn wednesday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 6, 10, 0, 0).unwrap()
    }

    #[test]
    fn focus_completion_counts_everything() {
        let mut agg = utc_aggregator(StatisticsSnapshot::default());
        agg.record_completion(SessionMode::Focus, wednesday());
        let s = agg.snapshot();
        assert_eq!(s.today_count, 1);
        assert_eq!(s.week_count, 1);
        assert_eq!(s.total_count, 1);
        assert_eq!(s.daily_counts.get("2024-03-06"), Some(&1));
        assert_eq!(s.weekly_counts.get("2024-03-03"), Some(&1));
        assert_eq!(s.consecutive_focus_streak, 1);
    }

    #[test]
    fn deep_focus_counts_and_ends_streak() {
        let mut agg = utc_aggregator(StatisticsSnapshot {
            consecutive_focus_streak: 2,
            ..Default::default()
        });
        agg.record_completion(SessionMode::DeepFocus, wednesday());
        assert_eq!(agg.snapshot().total_count, 1);
        assert_eq!(agg.streak(), 0);

        // A run interrupted by deep focus starts over.
        for _ in 0..3 {
            agg.record_completion(SessionMode::Focus, wednesday());
        }
        assert_eq!(agg.streak(), 3);
    }

    #[test]
    fn breaks_are_not_counted() {
        let mut agg = utc_aggregator(StatisticsSnapshot::default());
        agg.record_completion(SessionMode::ShortBreak, wednesday());
        agg.record_completion(SessionMode::LongBreak, wednesday());
        assert_eq!(agg.snapshot(), &StatisticsSnapshot::default());
    }

    #[test]
    fn recording_twice_counts_twice() {
        let mut agg = utc_aggregator(StatisticsSnapshot::default());
        agg.record_completion(SessionMode::Focus, wednesday());
        agg.record_completion(SessionMode::Focus, wednesday());
        assert_eq!(agg.snapshot().total_count, 2);
        assert_eq!(agg.snapshot().today_count, 2);
    }

    #[test]
    fn day_rollover_restarts_today_and_keeps_yesterday() {
        let mut daily = BTreeMap::new();
        daily.insert("2024-03-05".to_string(), 1);
        let mut weekly = BTreeMap::new();
        weekly.insert("2024-03-03".to_string(), 1);
        let mut agg = utc_aggregator(StatisticsSnapshot {
            today_count: 1,
            week_count: 1,
            total_count: 1,
            daily_counts: daily,
            weekly_counts: weekly,
            ..Default::default()
        });

        agg.record_completion(SessionMode::Focus, wednesday());

        let s = agg.snapshot();
        assert_eq!(s.today_count, 1);
        assert_eq!(s.week_count, 2);
        assert_eq!(s.total_count, 2);
        assert_eq!(s.daily_counts.get("2024-03-05"), Some(&1));
        assert_eq!(s.daily_counts.get("2024-03-06"), Some(&1));
    }

    #[test]
    fn week_rollover_restarts_week_count() {
        let mut agg = utc_aggregator(StatisticsSnapshot::default());
        agg.record_completion(SessionMode::Focus, wednesday());
        agg.record_completion(SessionMode::Focus, wednesday() + Duration::days(4));
        let s = agg.snapshot();
        assert_eq!(s.week_count, 1);
        assert_eq!(s.weekly_counts.len(), 2);
        assert_eq!(s.total_count, 2);
    }

    #[test]
    fn roll_over_without_recording_zeroes_today() {
        let mut agg = utc_aggregator(StatisticsSnapshot::default());
        agg.record_completion(SessionMode::Focus, wednesday());
        agg.roll_over(wednesday() + Duration::days(1));
        assert_eq!(agg.snapshot().today_count, 0);
        assert_eq!(agg.snapshot().week_count, 1);
        assert_eq!(agg.snapshot().total_count, 1);
    }

    #[test]
    fn task_count_is_overwritten_not_incremented() {
        let mut agg = utc_aggregator(StatisticsSnapshot::default());
        agg.record_task_completion(3);
        agg.record_task_completion(2);
        assert_eq!(agg.snapshot().completed_task_count, 2);
    }

    #[test]
    fn legacy_record_names_are_accepted() {
        let json = r#"{"todayPomodoros":2,"weekPomodoros":3,"totalPomodoros":9,
            "dailyPomodoros":{"2024-03-06":2},"weeklyPomodoros":{"2024-03-03":3},
            "completedTasks":1,"consecutivePomodoros":2}"#;
        let s: StatisticsSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(s.total_count, 9);
        assert_eq!(s.consecutive_focus_streak, 2);
        assert_eq!(s.last_day_key(), Some("2024-03-06"));
    }

    #[test]
    fn focused_minutes_use_focus_length() {
        let mut agg = utc_aggregator(StatisticsSnapshot::default());
        agg.record_completion(SessionMode::Focus, wednesday());
        agg.record_completion(SessionMode::Focus, wednesday());
        assert_eq!(agg.focused_minutes_today(1500), 50);
    }
}
