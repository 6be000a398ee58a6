//! Tokio adapter for the foreground engine.
//!
//! One loop, two sources: a 1-second interval that calls
//! [`SessionEngine::tick`] and the background update stream fed to
//! [`SessionEngine::handle_background`].

use std::future::pending;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::SessionEngine;
use crate::channel::BackgroundEvent;
use crate::events::Event;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

async fn next_update(
    updates: &mut Option<broadcast::Receiver<BackgroundEvent>>,
) -> Result<BackgroundEvent, RecvError> {
    match updates {
        Some(rx) => rx.recv().await,
        None => pending().await,
    }
}

/// Drive `engine` until `on_event` breaks.
///
/// `on_event` sees every event the engine produces, after the engine has
/// applied it. A closed update stream detaches the background link.
pub async fn run<F>(
    engine: &mut SessionEngine,
    mut updates: Option<broadcast::Receiver<BackgroundEvent>>,
    mut on_event: F,
) where
    F: FnMut(&SessionEngine, &Event) -> ControlFlow<()>,
{
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let event = tokio::select! {
            _ = ticker.tick() => engine.tick(),
            update = next_update(&mut updates) => match update {
                Ok(update) => engine.handle_background(update),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "foreground lagged behind background updates");
                    None
                }
                Err(RecvError::Closed) => {
                    updates = None;
                    engine.detach_link()
                }
            },
        };

        if let Some(event) = event {
            if on_event(engine, &event).is_break() {
                return;
            }
        }
    }
}

/// Drive `engine` until the running session completes.
pub async fn run_until_complete(
    engine: &mut SessionEngine,
    updates: Option<broadcast::Receiver<BackgroundEvent>>,
) -> Event {
    let mut completed = None;
    run(engine, updates, |_, event| {
        if matches!(event, Event::SessionCompleted { .. }) {
            completed = Some(event.clone());
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })
    .await;
    // `run` only returns on a break, which only happens with `completed` set.
    completed.unwrap_or_else(|| engine.snapshot())
}
