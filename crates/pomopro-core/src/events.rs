use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Authority, SessionMode};

/// Every state change of the session engine produces an Event.
/// Front ends print or forward them; `None` from an operation means no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        mode: SessionMode,
        remaining_secs: u64,
        end_at: DateTime<Utc>,
        authority: Authority,
        at: DateTime<Utc>,
    },
    SessionPaused {
        mode: SessionMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionReset {
        mode: SessionMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ModeSwitched {
        from: SessionMode,
        to: SessionMode,
        duration_secs: u64,
        streak_reset: bool,
        at: DateTime<Utc>,
    },
    /// A session ran out. Statistics and hooks have already been applied.
    SessionCompleted {
        mode: SessionMode,
        next_mode: SessionMode,
        auto_start: bool,
        at: DateTime<Utc>,
    },
    /// The background timekeeper corrected the remaining time.
    RemainingCorrected {
        mode: SessionMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    AuthorityChanged {
        authority: Authority,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        mode: SessionMode,
        remaining_secs: u64,
        configured_secs: u64,
        running: bool,
        authority: Authority,
        end_at: Option<DateTime<Utc>>,
        /// 0.0 .. 1.0 progress within the current session.
        progress: f64,
        at: DateTime<Utc>,
    },
}
