//! Cross-context message protocol.
//!
//! Foreground to background: [`TimerCommand`], tagged by `command`.
//! Background to foreground: [`BackgroundEvent`], tagged by `type`.
//!
//! Delivery is fire-and-forget. A post to a closed channel is dropped, and
//! every `TIMER_UPDATE` is a complete snapshot so a lost one costs nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::timer::SessionMode;

/// Command sent to the background timekeeper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerCommand {
    /// Take over timekeeping until `end_time`.
    TimerStart {
        time: u64,
        mode: SessionMode,
        #[serde(rename = "endTime", with = "chrono::serde::ts_milliseconds")]
        end_time: DateTime<Utc>,
    },
    TimerPause {
        time: u64,
    },
    TimerReset,
    /// Label update only; never starts or stops anything.
    ModeChange {
        mode: SessionMode,
    },
}

/// Update sent from the background timekeeper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackgroundEvent {
    TimerUpdate { time: u64, mode: SessionMode },
    TimerEnd,
}

/// Where the engine posts commands.
pub trait CommandSink: Send {
    fn is_connected(&self) -> bool;

    /// Post without waiting. Failure is swallowed.
    fn post(&self, command: TimerCommand);
}

impl CommandSink for mpsc::UnboundedSender<TimerCommand> {
    fn is_connected(&self) -> bool {
        !self.is_closed()
    }

    fn post(&self, command: TimerCommand) {
        if let Err(e) = self.send(command) {
            debug!(command = ?e.0, "background channel closed; command dropped");
        }
    }
}

/// Sink that keeps every posted command. Clones share the same log and
/// connection flag.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<TimerCommand>>>,
    connected: Arc<AtomicBool>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self {
            sent: Arc::default(),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl RecordingSink {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Drain the commands posted so far.
    pub fn take(&self) -> Vec<TimerCommand> {
        self.sent
            .lock()
            .map(|mut sent| std::mem::take(&mut *sent))
            .unwrap_or_default()
    }
}

impl CommandSink for RecordingSink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn post(&self, command: TimerCommand) {
        if !self.is_connected() {
            return;
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(command);
        }
    }
}
