//! Wall-clock sources.
//!
//! Every remaining-time computation goes through a [`Clock`] so that the
//! engine and the background timekeeper can be driven by a fake clock in
//! tests. Production code uses [`SystemClock`].

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Supplies the current wall-clock instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The host's real-time clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Cloning shares the underlying instant, so a foreground engine and a
/// background timekeeper can observe the same simulated time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward (or backward, for negative durations).
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .map(|now| *now)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

/// Whole seconds left until `end_at`, rounded to the nearest second and
/// never negative.
///
/// This is the drift-correction primitive shared by both timer contexts: the
/// result depends only on the deadline and the current instant, never on how
/// many checks ran in between.
pub fn seconds_until(end_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let diff_ms = (end_at - now).num_milliseconds();
    if diff_ms <= 0 {
        return 0;
    }
    ((diff_ms + 500) / 1000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    #[test]
    fn manual_clock_advances_shared_instant() {
        let clock = ManualClock::new(t0());
        let other = clock.clone();
        clock.advance_secs(90);
        assert_eq!(other.now(), t0() + Duration::seconds(90));
    }

    #[test]
    fn seconds_until_rounds_half_up() {
        let end = t0() + Duration::milliseconds(1_500);
        assert_eq!(seconds_until(end, t0()), 2);
        let end = t0() + Duration::milliseconds(1_499);
        assert_eq!(seconds_until(end, t0()), 1);
        let end = t0() + Duration::milliseconds(499);
        assert_eq!(seconds_until(end, t0()), 0);
    }

    #[test]
    fn seconds_until_clamps_past_deadlines() {
        let end = t0() - Duration::seconds(30);
        assert_eq!(seconds_until(end, t0()), 0);
    }
}
