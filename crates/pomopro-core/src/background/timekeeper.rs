use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::channel::{BackgroundEvent, TimerCommand};
use crate::clock::{seconds_until, Clock};
use crate::notify::{completion_message, Notifier};
use crate::timer::SessionMode;

/// Period of the background remaining-time check.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(1);

const EVENT_CAPACITY: usize = 64;

/// The one timer the background context may hold, keyed by its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTimer {
    pub mode: SessionMode,
    pub end_at: DateTime<Utc>,
}

pub struct Timekeeper {
    active: Option<ActiveTimer>,
    clock: Arc<dyn Clock>,
    notifier: Option<Box<dyn Notifier>>,
}

impl Timekeeper {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            active: None,
            clock,
            notifier: None,
        }
    }

    /// Show the completion notification when a timer runs out here.
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn active(&self) -> Option<&ActiveTimer> {
        self.active.as_ref()
    }

    /// Apply a foreground command. Returns the deadline that periodic checks
    /// must be armed for when the command starts a timer.
    pub fn apply(&mut self, command: TimerCommand) -> Option<DateTime<Utc>> {
        match command {
            TimerCommand::TimerStart { mode, end_time, .. } => {
                debug!(%mode, end_at = %end_time, "background timer armed");
                self.active = Some(ActiveTimer {
                    mode,
                    end_at: end_time,
                });
                Some(end_time)
            }
            TimerCommand::TimerPause { .. } | TimerCommand::TimerReset => {
                if self.active.take().is_some() {
                    debug!("background timer discarded");
                }
                None
            }
            TimerCommand::ModeChange { mode } => {
                if let Some(active) = self.active.as_mut() {
                    active.mode = mode;
                }
                None
            }
        }
    }

    /// One periodic check, armed for `armed_for`.
    ///
    /// A check armed for a deadline that is no longer active emits nothing.
    /// At zero the timer is discarded after emitting `TIMER_END`, so the end
    /// signal is sent at most once per deadline.
    pub fn check(&mut self, armed_for: DateTime<Utc>) -> Vec<BackgroundEvent> {
        let Some(active) = self.active.as_ref().filter(|a| a.end_at == armed_for) else {
            debug!(%armed_for, "stale background check ignored");
            return Vec::new();
        };
        let mode = active.mode;
        let time = seconds_until(active.end_at, self.clock.now());
        let mut events = vec![BackgroundEvent::TimerUpdate { time, mode }];
        if time == 0 {
            self.active = None;
            events.push(BackgroundEvent::TimerEnd);
            info!(%mode, "background timer ended");
            if let Some(notifier) = self.notifier.as_mut() {
                let (title, body) = completion_message(mode);
                notifier.notify(title, body);
            }
        }
        events
    }
}

/// Handle to a spawned [`Timekeeper`] task.
pub struct TimekeeperHandle {
    commands: mpsc::UnboundedSender<TimerCommand>,
    events: broadcast::Sender<BackgroundEvent>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Timekeeper>,
}

impl TimekeeperHandle {
    /// A sender for foreground commands. It implements
    /// [`crate::channel::CommandSink`].
    pub fn command_sender(&self) -> mpsc::UnboundedSender<TimerCommand> {
        self.commands.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BackgroundEvent> {
        self.events.subscribe()
    }

    /// Stop the task and get the timekeeper back.
    pub async fn shutdown(self) -> Option<Timekeeper> {
        let _ = self.shutdown.send(());
        self.task.await.ok()
    }
}

async fn next_check(ticker: &mut Option<(Interval, DateTime<Utc>)>) -> DateTime<Utc> {
    match ticker {
        Some((interval, armed_for)) => {
            interval.tick().await;
            *armed_for
        }
        None => pending().await,
    }
}

fn arm(armed_for: DateTime<Utc>) -> (Interval, DateTime<Utc>) {
    let mut interval = tokio::time::interval_at(Instant::now() + CHECK_INTERVAL, CHECK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    (interval, armed_for)
}

/// Run `timekeeper` in its own task.
///
/// The task ends when the handle is shut down or dropped.
pub fn spawn(mut timekeeper: Timekeeper) -> TimekeeperHandle {
    let (commands, mut command_rx) = mpsc::unbounded_channel::<TimerCommand>();
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();
    let event_tx = events.clone();

    let task = tokio::spawn(async move {
        let mut ticker: Option<(Interval, DateTime<Utc>)> = None;
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                command = command_rx.recv() => {
                    let Some(command) = command else { break };
                    match timekeeper.apply(command) {
                        Some(armed_for) => ticker = Some(arm(armed_for)),
                        None if timekeeper.active().is_none() => ticker = None,
                        None => {}
                    }
                }
                armed_for = next_check(&mut ticker) => {
                    for event in timekeeper.check(armed_for) {
                        // No subscribers is fine; updates are snapshots.
                        let _ = event_tx.send(event);
                    }
                    if timekeeper.active().is_none() {
                        ticker = None;
                    }
                }
            }
        }
        debug!("background timekeeper stopped");
        timekeeper
    });

    TimekeeperHandle {
        commands,
        events,
        shutdown,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 6, 10, 0, 0).unwrap()
    }

    fn start(secs: i64) -> TimerCommand {
        TimerCommand::TimerStart {
            time: secs as u64,
            mode: SessionMode::Focus,
            end_time: t0() + chrono::Duration::seconds(secs),
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Notifier for Recorder {
        fn notify(&mut self, title: &str, _body: &str) {
            self.0.lock().unwrap().push(title.to_string());
        }
    }

    #[test]
    fn check_reports_remaining_from_deadline() {
        let clock = ManualClock::new(t0());
        let mut tk = Timekeeper::new(Arc::new(clock.clone()));
        let armed = tk.apply(start(60)).unwrap();
        clock.advance_secs(15);
        assert_eq!(
            tk.check(armed),
            vec![BackgroundEvent::TimerUpdate {
                time: 45,
                mode: SessionMode::Focus
            }]
        );
    }

    #[test]
    fn end_is_emitted_once_and_notifies() {
        let clock = ManualClock::new(t0());
        let recorder = Recorder::default();
        let mut tk =
            Timekeeper::new(Arc::new(clock.clone())).with_notifier(Box::new(recorder.clone()));
        let armed = tk.apply(start(2)).unwrap();
        clock.advance_secs(2);
        let events = tk.check(armed);
        assert_eq!(events.last(), Some(&BackgroundEvent::TimerEnd));
        assert!(tk.active().is_none());
        assert!(tk.check(armed).is_empty());
        assert_eq!(*recorder.0.lock().unwrap(), vec!["Focus session complete!"]);
    }

    #[test]
    fn stale_check_after_reset_emits_nothing() {
        let clock = ManualClock::new(t0());
        let mut tk = Timekeeper::new(Arc::new(clock.clone()));
        let armed = tk.apply(start(60)).unwrap();
        tk.apply(TimerCommand::TimerReset);
        assert!(tk.check(armed).is_empty());
    }

    #[test]
    fn restart_invalidates_checks_for_old_deadline() {
        let clock = ManualClock::new(t0());
        let mut tk = Timekeeper::new(Arc::new(clock.clone()));
        let old = tk.apply(start(60)).unwrap();
        let new = tk.apply(start(120)).unwrap();
        assert!(tk.check(old).is_empty());
        assert_eq!(tk.check(new).len(), 1);
    }

    #[test]
    fn mode_change_relabels_active_timer() {
        let clock = ManualClock::new(t0());
        let mut tk = Timekeeper::new(Arc::new(clock.clone()));
        let armed = tk.apply(start(60)).unwrap();
        assert!(tk
            .apply(TimerCommand::ModeChange {
                mode: SessionMode::DeepFocus
            })
            .is_none());
        assert!(matches!(
            tk.check(armed).as_slice(),
            [BackgroundEvent::TimerUpdate {
                mode: SessionMode::DeepFocus,
                ..
            }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_timekeeper_broadcasts_updates_then_end() {
        let clock = ManualClock::new(t0());
        let handle = spawn(Timekeeper::new(Arc::new(clock.clone())));
        let mut rx = handle.subscribe();
        handle.command_sender().send(start(2)).unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            BackgroundEvent::TimerUpdate {
                time: 2,
                mode: SessionMode::Focus
            }
        );
        clock.advance_secs(2);
        assert_eq!(
            rx.recv().await.unwrap(),
            BackgroundEvent::TimerUpdate {
                time: 0,
                mode: SessionMode::Focus
            }
        );
        assert_eq!(rx.recv().await.unwrap(), BackgroundEvent::TimerEnd);

        let tk = handle.shutdown().await.unwrap();
        assert!(tk.active().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_stops_periodic_checks() {
        let clock = ManualClock::new(t0());
        let handle = spawn(Timekeeper::new(Arc::new(clock.clone())));
        let mut rx = handle.subscribe();
        let tx = handle.command_sender();
        tx.send(start(60)).unwrap();
        rx.recv().await.unwrap();

        tx.send(TimerCommand::TimerReset).unwrap();
        tokio::time::sleep(CHECK_INTERVAL * 5).await;
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
        handle.shutdown().await;
    }
}
