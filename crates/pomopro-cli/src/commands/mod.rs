pub mod config;
pub mod stats;
pub mod task;
pub mod timer;

use std::sync::Arc;

use pomopro_core::notify::{LogNotifier, TerminalBell};
use pomopro_core::storage::records::{
    load_session, load_settings, load_statistics, save_session, save_statistics,
};
use pomopro_core::{
    Database, NotifyHook, SessionEngine, SessionRecord, Settings, SoundHook, StatsAggregator,
    SystemClock,
};

/// The persisted records, loaded for one command.
pub struct Workspace {
    pub db: Database,
    pub settings: Settings,
    pub record: SessionRecord,
}

impl Workspace {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open()?;
        let settings = load_settings(&db)?;
        let record = load_session(&db, &settings)?;
        Ok(Self {
            db,
            settings,
            record,
        })
    }

    /// Rebuild the engine from the stored records, with completion hooks.
    pub fn engine(&self) -> Result<SessionEngine, Box<dyn std::error::Error>> {
        let stats = StatsAggregator::new(load_statistics(&self.db)?, self.settings.week_start);
        let mut engine = SessionEngine::restore(
            self.record.timer.clone(),
            self.settings.clone(),
            stats,
            Arc::new(SystemClock),
        );
        engine.add_hook(Box::new(NotifyHook::new(LogNotifier)));
        engine.add_hook(Box::new(SoundHook::new(TerminalBell)));
        Ok(engine)
    }

    /// Persist the engine's timer state, the task list and the statistics.
    pub fn save(&mut self, engine: &SessionEngine) -> Result<(), Box<dyn std::error::Error>> {
        self.record.timer = engine.state().clone();
        save_session(&self.db, &self.record)?;
        save_statistics(&self.db, engine.statistics())?;
        Ok(())
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
