//! Session engine implementation.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads; the caller is responsible for calling `tick()` periodically and
//! for feeding background updates to `handle_background()`.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running -> (completed) -> Idle in next mode
//! ```
//!
//! Remaining time is never decremented. While running it is recomputed from
//! the absolute end timestamp, so a frozen or throttled caller catches up on
//! the next tick.
//!
//! ## Authority
//!
//! With `backgroundMode` on and a connected [`CommandSink`] attached, `start()`
//! hands timekeeping to the background context (`Delegated`) and the engine
//! stops ticking locally. Corrections and the end signal arrive through
//! `handle_background()`. Without a connected sink the engine keeps
//! `Local` authority.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::mode::SessionMode;
use crate::channel::{BackgroundEvent, CommandSink, TimerCommand};
use crate::clock::{seconds_until, Clock};
use crate::events::Event;
use crate::notify::CompletionHook;
use crate::stats::{StatisticsSnapshot, StatsAggregator};
use crate::storage::Settings;

/// Delay before the next session auto-starts after a completion.
pub const AUTO_START_DELAY: Duration = Duration::seconds(1);

/// How long past the deadline a delegated session may stay silent before the
/// engine takes authority back and completes it locally.
pub const DELEGATION_GRACE: Duration = Duration::seconds(3);

/// Which context is counting down the running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    #[default]
    Local,
    Delegated,
}

/// Derived lifecycle phase, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Paused,
}

/// The timer part of the persisted `session_state` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub mode: SessionMode,
    /// Length of the current session when it was set up, in seconds.
    #[serde(rename = "activeTime")]
    pub configured_duration: u64,
    /// Seconds left. Exact while paused; a cached value while running.
    #[serde(rename = "time")]
    pub remaining: u64,
    #[serde(rename = "isRunning")]
    pub running: bool,
    #[serde(
        rename = "endTime",
        with = "chrono::serde::ts_milliseconds_option",
        default
    )]
    pub end_at: Option<DateTime<Utc>>,
    /// When the next session auto-starts, if one is scheduled.
    #[serde(
        rename = "pendingStart",
        with = "chrono::serde::ts_milliseconds_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pending_start: Option<DateTime<Utc>>,
}

impl SessionState {
    /// A fresh, idle session of `mode`.
    pub fn idle(mode: SessionMode, settings: &Settings) -> Self {
        let configured = settings.duration_secs(mode);
        Self {
            mode,
            configured_duration: configured,
            remaining: configured,
            running: false,
            end_at: None,
            pending_start: None,
        }
    }

    /// Remaining seconds as of `now`.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        match (self.running, self.end_at) {
            (true, Some(end_at)) => seconds_until(end_at, now).min(self.configured_duration),
            _ => self.remaining,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.running {
            Phase::Running
        } else if self.remaining < self.configured_duration {
            Phase::Paused
        } else {
            Phase::Idle
        }
    }
}

/// Foreground session state machine.
pub struct SessionEngine {
    state: SessionState,
    settings: Settings,
    authority: Authority,
    stats: StatsAggregator,
    clock: Arc<dyn Clock>,
    link: Option<Box<dyn CommandSink>>,
    hooks: Vec<Box<dyn CompletionHook>>,
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("state", &self.state)
            .field("authority", &self.authority)
            .field("linked", &self.link.is_some())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl SessionEngine {
    /// Create an idle engine in focus mode.
    pub fn new(settings: Settings, stats: StatsAggregator, clock: Arc<dyn Clock>) -> Self {
        let state = SessionState::idle(SessionMode::Focus, &settings);
        Self {
            state,
            settings,
            authority: Authority::Local,
            stats,
            clock,
            link: None,
            hooks: Vec::new(),
        }
    }

    /// Rebuild an engine from a persisted record.
    ///
    /// The configured duration is re-derived from `settings`. A running
    /// session keeps its end timestamp under local authority, so the next
    /// `tick()` either corrects the remaining time or completes a session
    /// that ran out while nobody was watching. A scheduled auto-start of an
    /// idle session survives and fires on the first `tick()` at or after it.
    pub fn restore(
        mut state: SessionState,
        settings: Settings,
        stats: StatsAggregator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let configured = settings.duration_secs(state.mode);
        let now = clock.now();
        match (state.running, state.end_at) {
            (true, Some(_)) => {
                state.configured_duration = configured;
                state.remaining = state.remaining_at(now);
                state.pending_start = None;
            }
            _ => {
                if state.running {
                    warn!("running session without end timestamp; restoring as paused");
                }
                state.running = false;
                state.end_at = None;
                state.configured_duration = configured;
                state.remaining = match state.remaining.min(configured) {
                    0 => configured,
                    remaining => remaining,
                };
            }
        }
        debug!(
            mode = %state.mode,
            remaining = state.remaining,
            running = state.running,
            pending_start = ?state.pending_start,
            "session restored"
        );
        Self {
            state,
            settings,
            authority: Authority::Local,
            stats,
            clock,
            link: None,
            hooks: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn mode(&self) -> SessionMode {
        self.state.mode
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Remaining seconds as of now. While delegated this is the last value
    /// reported by the background context.
    pub fn remaining_secs(&self) -> u64 {
        match self.authority {
            Authority::Delegated => self.state.remaining,
            Authority::Local => self.state.remaining_at(self.clock.now()),
        }
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn statistics(&self) -> &StatisticsSnapshot {
        self.stats.snapshot()
    }

    /// When a scheduled auto-start will fire, if one is pending.
    pub fn pending_start(&self) -> Option<DateTime<Utc>> {
        self.state.pending_start
    }

    pub fn is_linked(&self) -> bool {
        self.link_connected()
    }

    /// 0.0 .. 1.0 progress within the current session.
    pub fn progress(&self) -> f64 {
        let total = self.state.configured_duration;
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs() as f64 / total as f64)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            mode: self.state.mode,
            remaining_secs: self.remaining_secs(),
            configured_secs: self.state.configured_duration,
            running: self.state.running,
            authority: self.authority,
            end_at: self.state.end_at,
            progress: self.progress(),
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        if self.state.running {
            return None;
        }
        self.state.pending_start = None;
        let now = self.clock.now();
        if self.state.remaining == 0 {
            self.state.remaining = self.state.configured_duration;
        }
        let Some(end_at) = deadline(now, self.state.remaining) else {
            warn!(remaining = self.state.remaining, "session length out of range; not starting");
            return None;
        };
        self.state.end_at = Some(end_at);
        self.state.running = true;

        self.authority = if self.settings.background_mode && self.link_connected() {
            self.post(TimerCommand::TimerStart {
                time: self.state.remaining,
                mode: self.state.mode,
                end_time: end_at,
            });
            Authority::Delegated
        } else {
            if self.settings.background_mode {
                debug!("background context unavailable; ticking locally");
            }
            Authority::Local
        };
        debug!(mode = %self.state.mode, remaining = self.state.remaining, authority = ?self.authority, "session started");

        Some(Event::SessionStarted {
            mode: self.state.mode,
            remaining_secs: self.state.remaining,
            end_at,
            authority: self.authority,
            at: now,
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if !self.state.running {
            return None;
        }
        let now = self.clock.now();
        self.state.remaining = self.remaining_secs();
        if self.authority == Authority::Delegated {
            self.post(TimerCommand::TimerPause {
                time: self.state.remaining,
            });
        }
        self.state.end_at = None;
        self.state.running = false;
        self.authority = Authority::Local;
        debug!(remaining = self.state.remaining, "session paused");

        Some(Event::SessionPaused {
            mode: self.state.mode,
            remaining_secs: self.state.remaining,
            at: now,
        })
    }

    /// Hard stop: back to the full configured length of the current mode.
    pub fn reset(&mut self) -> Option<Event> {
        self.state.pending_start = None;
        if self.authority == Authority::Delegated {
            self.post(TimerCommand::TimerReset);
        }
        self.state.remaining = self.state.configured_duration;
        self.state.running = false;
        self.state.end_at = None;
        self.authority = Authority::Local;

        Some(Event::SessionReset {
            mode: self.state.mode,
            remaining_secs: self.state.remaining,
            at: self.clock.now(),
        })
    }

    /// Switch to `mode`, bypassing the completion table.
    ///
    /// Returning to focus from a break ends the consecutive-focus streak.
    pub fn switch_mode(&mut self, mode: SessionMode) -> Option<Event> {
        let from = self.state.mode;
        let streak_reset = from.is_break() && mode == SessionMode::Focus;
        if streak_reset {
            self.stats.reset_streak();
        }
        self.reset();

        let duration = self.settings.duration_secs(mode);
        self.state.mode = mode;
        self.state.configured_duration = duration;
        self.state.remaining = duration;
        if self.link_connected() {
            self.post(TimerCommand::ModeChange { mode });
        }
        debug!(%from, to = %mode, streak_reset, "mode switched");

        Some(Event::ModeSwitched {
            from,
            to: mode,
            duration_secs: duration,
            streak_reset,
            at: self.clock.now(),
        })
    }

    /// Call periodically. Fires a due auto-start, refreshes the remaining
    /// time of a locally ticked session and completes it at zero.
    pub fn tick(&mut self) -> Option<Event> {
        let now = self.clock.now();
        if let Some(due) = self.state.pending_start {
            if now >= due {
                self.state.pending_start = None;
                return self.start();
            }
        }
        if !self.state.running {
            return None;
        }

        let mut taken_back = false;
        if self.authority == Authority::Delegated {
            if !self.link_connected() {
                warn!("background context disconnected; ticking locally");
                self.authority = Authority::Local;
                taken_back = true;
            } else if self.overdue(now) {
                warn!("background context missed the deadline; completing locally");
                self.post(TimerCommand::TimerReset);
                self.authority = Authority::Local;
                taken_back = true;
            } else {
                return None;
            }
        }

        self.state.remaining = self.state.remaining_at(now);
        if self.state.remaining == 0 {
            return Some(self.complete(now));
        }
        taken_back.then_some(Event::AuthorityChanged {
            authority: Authority::Local,
            at: now,
        })
    }

    /// Apply a message from the background context. Stale messages are
    /// discarded.
    pub fn handle_background(&mut self, event: BackgroundEvent) -> Option<Event> {
        let delegated = self.state.running && self.authority == Authority::Delegated;
        let now = self.clock.now();
        match event {
            BackgroundEvent::TimerUpdate { time, mode } => {
                if !delegated || mode != self.state.mode {
                    debug!(time, %mode, "stale TIMER_UPDATE discarded");
                    return None;
                }
                self.state.remaining = time.min(self.state.configured_duration);
                Some(Event::RemainingCorrected {
                    mode,
                    remaining_secs: self.state.remaining,
                    at: now,
                })
            }
            BackgroundEvent::TimerEnd => {
                if !delegated {
                    debug!("stale TIMER_END discarded");
                    return None;
                }
                Some(self.complete(now))
            }
        }
    }

    /// Connect the background channel. A locally ticked session is handed
    /// over when background mode is on.
    pub fn attach_link(&mut self, sink: Box<dyn CommandSink>) -> Option<Event> {
        self.link = Some(sink);
        if self.state.running && self.authority == Authority::Local && self.settings.background_mode {
            return self.delegate();
        }
        None
    }

    /// Disconnect the background channel. A delegated session falls back to
    /// local ticking.
    pub fn detach_link(&mut self) -> Option<Event> {
        self.link = None;
        if self.authority != Authority::Delegated {
            return None;
        }
        self.authority = Authority::Local;
        debug!("background link detached; ticking locally");
        Some(Event::AuthorityChanged {
            authority: Authority::Local,
            at: self.clock.now(),
        })
    }

    /// Apply new settings. A running session keeps its length; toggling
    /// background mode while running moves authority accordingly.
    pub fn update_settings(&mut self, settings: Settings) -> Option<Event> {
        self.settings = settings;
        self.stats.set_week_start(self.settings.week_start);

        if !self.state.running {
            let configured = self.settings.duration_secs(self.state.mode);
            let idle = self.state.remaining >= self.state.configured_duration;
            self.state.configured_duration = configured;
            self.state.remaining = if idle {
                configured
            } else {
                self.state.remaining.min(configured)
            };
            return None;
        }

        match (self.settings.background_mode, self.authority) {
            (true, Authority::Local) => self.delegate(),
            (false, Authority::Delegated) => {
                let now = self.clock.now();
                self.post(TimerCommand::TimerPause {
                    time: self.remaining_secs(),
                });
                self.authority = Authority::Local;
                Some(Event::AuthorityChanged {
                    authority: Authority::Local,
                    at: now,
                })
            }
            _ => None,
        }
    }

    /// Forward a recomputed completed-task count to the statistics.
    pub fn record_task_completion(&mut self, completed_count: u32) {
        self.stats.record_task_completion(completed_count);
    }

    /// Zero today/this-week counters if the calendar moved on.
    pub fn roll_over_stats(&mut self) {
        let now = self.clock.now();
        self.stats.roll_over(now);
    }

    pub fn add_hook(&mut self, hook: Box<dyn CompletionHook>) {
        self.hooks.push(hook);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn link_connected(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.is_connected())
    }

    fn post(&self, command: TimerCommand) {
        if let Some(link) = self.link.as_ref().filter(|link| link.is_connected()) {
            link.post(command);
        }
    }

    fn overdue(&self, now: DateTime<Utc>) -> bool {
        self.state
            .end_at
            .and_then(|end_at| end_at.checked_add_signed(DELEGATION_GRACE))
            .is_some_and(|limit| now >= limit)
    }

    /// Hand the running session to the background context, keeping its end
    /// timestamp.
    fn delegate(&mut self) -> Option<Event> {
        let end_at = self.state.end_at?;
        if !self.link_connected() {
            return None;
        }
        let now = self.clock.now();
        let remaining = self.state.remaining_at(now);
        if remaining == 0 {
            return Some(self.complete(now));
        }
        self.state.remaining = remaining;
        self.post(TimerCommand::TimerStart {
            time: remaining,
            mode: self.state.mode,
            end_time: end_at,
        });
        self.authority = Authority::Delegated;
        debug!(remaining, "session handed to background context");
        Some(Event::AuthorityChanged {
            authority: Authority::Delegated,
            at: now,
        })
    }

    /// The completion transition. Callers guarantee it runs once per session.
    fn complete(&mut self, now: DateTime<Utc>) -> Event {
        let mode = self.state.mode;
        self.state.running = false;
        self.state.remaining = 0;
        self.state.end_at = None;
        self.authority = Authority::Local;

        self.stats.record_completion(mode, now);
        for hook in &mut self.hooks {
            hook.on_complete(mode, now, &self.settings);
        }

        let next_mode = mode.next_after_completion(self.stats.streak(), self.settings.long_break_interval);
        let auto_start = self.settings.auto_start_breaks || next_mode == SessionMode::Focus;
        info!(%mode, %next_mode, auto_start, "session completed");

        self.switch_mode(next_mode);
        if auto_start {
            self.state.pending_start = now.checked_add_signed(AUTO_START_DELAY);
        }

        Event::SessionCompleted {
            mode,
            next_mode,
            auto_start,
            at: now,
        }
    }
}

/// `now + secs`, or `None` when the instant is out of range.
fn deadline(now: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?;
    now.checked_add_signed(Duration::try_seconds(secs)?)
}
