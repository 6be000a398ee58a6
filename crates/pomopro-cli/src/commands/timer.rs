use std::ops::ControlFlow;
use std::sync::Arc;

use clap::Subcommand;
use pomopro_core::background::{self, Timekeeper};
use pomopro_core::timer::driver;
use pomopro_core::{Event, SessionEngine, SessionMode, SystemClock};
use tracing::{info, warn};

use super::{print_json, Workspace};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the current session
    Start,
    /// Pause the running session
    Pause,
    /// Stop and rewind the current session
    Reset,
    /// Switch to another mode (focus, shortBreak, longBreak, deepFocus)
    Mode {
        mode: SessionMode,
    },
    /// Print current timer state as JSON
    Status,
    /// Run the timer in the foreground until the session completes and,
    /// when the next one auto-starts, until it is running
    Run {
        /// Delegate timekeeping to a background task
        #[arg(long)]
        background: bool,
    },
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = Workspace::open()?;
    let mut engine = ws.engine()?;

    // Catch up on anything that happened while no process was watching.
    if let Some(event) = engine.tick() {
        print_json(&event)?;
    }

    match action {
        TimerAction::Start => print_event(engine.start())?,
        TimerAction::Pause => print_event(engine.pause())?,
        TimerAction::Reset => print_event(engine.reset())?,
        TimerAction::Mode { mode } => print_event(engine.switch_mode(mode))?,
        TimerAction::Status => print_json(&engine.snapshot())?,
        TimerAction::Run { background } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?;
            runtime.block_on(run_session(&mut ws, &mut engine, background));
        }
    }

    ws.save(&engine)
}

fn print_event(event: Option<Event>) -> Result<(), Box<dyn std::error::Error>> {
    match event {
        Some(event) => print_json(&event),
        None => {
            eprintln!("nothing to do");
            Ok(())
        }
    }
}

/// Drive the engine until the current session completes, printing one JSON
/// line per event and persisting after each. A completion that schedules an
/// auto-start keeps the loop alive until the next session is running.
async fn run_session(ws: &mut Workspace, engine: &mut SessionEngine, background: bool) {
    let handle = if background {
        let handle = background::spawn(Timekeeper::new(Arc::new(SystemClock)));
        engine.attach_link(Box::new(handle.command_sender()));
        Some(handle)
    } else {
        None
    };
    let updates = handle.as_ref().map(|h| h.subscribe());

    if !engine.is_running() {
        if let Some(event) = engine.start() {
            emit(ws, engine, &event);
        }
    }
    info!(mode = %engine.mode(), remaining = engine.remaining_secs(), "running session");

    driver::run(engine, updates, |engine, event| {
        emit(ws, engine, event);
        match event {
            Event::SessionCompleted {
                auto_start: true, ..
            } => ControlFlow::Continue(()),
            Event::SessionCompleted { .. } | Event::SessionStarted { .. } => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    })
    .await;

    engine.detach_link();
    if let Some(handle) = handle {
        handle.shutdown().await;
    }
}

fn emit(ws: &mut Workspace, engine: &SessionEngine, event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "failed to encode event"),
    }
    if let Err(e) = ws.save(engine) {
        warn!(error = %e, "failed to persist session");
    }
}
