//! # Pomopro Core Library
//!
//! Core logic for the Pomopro focus/break timer. The `pomopro` CLI is a thin
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Session Engine**: a wall-clock-based state machine. Remaining time is
//!   always recomputed from an absolute end timestamp, never decremented.
//! - **Background Timekeeper**: a second context that can own the countdown
//!   while the foreground is throttled or gone, connected only by messages.
//! - **Statistics**: completion counters with calendar buckets and a
//!   consecutive-focus streak, plus achievements derived from them.
//! - **Storage**: flat JSON records in a SQLite key-value table.
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: foreground state machine
//! - [`Timekeeper`]: background timekeeping, run with [`background::spawn`]
//! - [`TimerCommand`] / [`BackgroundEvent`]: the cross-context protocol
//! - [`StatsAggregator`]: sole mutator of [`StatisticsSnapshot`]
//! - [`Database`]: persisted records

pub mod achievements;
pub mod background;
pub mod channel;
pub mod clock;
pub mod error;
pub mod events;
pub mod notify;
pub mod stats;
pub mod storage;
pub mod tasks;
pub mod timer;

pub use achievements::{evaluate, is_unlocked, Achievement, ThresholdType, ACHIEVEMENTS};
pub use background::{Timekeeper, TimekeeperHandle};
pub use channel::{BackgroundEvent, CommandSink, TimerCommand};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, StorageError};
pub use events::Event;
pub use notify::{CompletionHook, Notifier, NotifyHook, SoundCue, SoundHook};
pub use stats::{StatisticsSnapshot, StatsAggregator, WeekStart};
pub use storage::{Database, MemoryStore, SessionRecord, Settings, Store};
pub use tasks::{Task, TaskList};
pub use timer::{Authority, Phase, SessionEngine, SessionMode, SessionState};
