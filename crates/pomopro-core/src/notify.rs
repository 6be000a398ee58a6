//! Completion side effects.
//!
//! Sound and notification playback are external collaborators behind
//! [`SoundCue`] and [`Notifier`]. The engine invokes every registered
//! [`CompletionHook`] exactly once per completed session.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::storage::Settings;
use crate::timer::SessionMode;

/// Displays a user-facing notification.
pub trait Notifier: Send {
    fn notify(&mut self, title: &str, body: &str);
}

/// Plays the completion sound.
pub trait SoundCue: Send {
    fn play(&mut self);
}

/// Subscriber for completed sessions. Hooks read the settings in force at
/// completion time so toggles take effect without re-registering.
pub trait CompletionHook: Send {
    fn on_complete(&mut self, mode: SessionMode, at: DateTime<Utc>, settings: &Settings);
}

/// Notification title and body for a completed session of `mode`.
pub fn completion_message(mode: SessionMode) -> (&'static str, &'static str) {
    match mode {
        SessionMode::Focus => ("Focus session complete!", "Time for a break."),
        SessionMode::ShortBreak => ("Short break over!", "Time to get back to work."),
        SessionMode::LongBreak => ("Long break over!", "Get ready for another session."),
        SessionMode::DeepFocus => ("Deep focus session complete!", "Excellent work."),
    }
}

/// Sends the mode-specific completion notification when `notifications` is on.
pub struct NotifyHook<N> {
    notifier: N,
}

impl<N: Notifier> NotifyHook<N> {
    pub fn new(notifier: N) -> Self {
        Self { notifier }
    }
}

impl<N: Notifier> CompletionHook for NotifyHook<N> {
    fn on_complete(&mut self, mode: SessionMode, _at: DateTime<Utc>, settings: &Settings) {
        if !settings.notifications {
            return;
        }
        let (title, body) = completion_message(mode);
        self.notifier.notify(title, body);
    }
}

/// Plays the completion sound when `sound` is on.
pub struct SoundHook<S> {
    cue: S,
}

impl<S: SoundCue> SoundHook<S> {
    pub fn new(cue: S) -> Self {
        Self { cue }
    }
}

impl<S: SoundCue> CompletionHook for SoundHook<S> {
    fn on_complete(&mut self, _mode: SessionMode, _at: DateTime<Utc>, settings: &Settings) {
        if settings.sound {
            self.cue.play();
        }
    }
}

/// Notifier that writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, title: &str, body: &str) {
        info!(title, body, "notification");
    }
}

/// Sound cue that rings the terminal bell.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl SoundCue for TerminalBell {
    fn play(&mut self) {
        use std::io::Write;
        let mut err = std::io::stderr();
        let _ = err.write_all(b"\x07");
        let _ = err.flush();
    }
}
