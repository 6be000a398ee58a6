//! Typed access to the persisted records.
//!
//! A record that is missing loads as its default. A record that cannot be
//! parsed also loads as its default, with a warning; the next save
//! overwrites it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Settings, Store};
use crate::error::Result;
use crate::stats::StatisticsSnapshot;
use crate::tasks::TaskList;
use crate::timer::{SessionMode, SessionState};

pub const SETTINGS_KEY: &str = "settings";
pub const SESSION_KEY: &str = "session_state";
pub const STATISTICS_KEY: &str = "statistics";

/// The `session_state` record: timer state plus the task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(flatten)]
    pub timer: SessionState,
    #[serde(flatten)]
    pub tasks: TaskList,
}

impl SessionRecord {
    pub fn fresh(settings: &Settings) -> Self {
        Self {
            timer: SessionState::idle(SessionMode::Focus, settings),
            tasks: TaskList::default(),
        }
    }
}

fn load_or<T: DeserializeOwned>(store: &dyn Store, key: &str, fallback: impl FnOnce() -> T) -> Result<T> {
    let Some(raw) = store.get(key)? else {
        return Ok(fallback());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(key, error = %e, "corrupt record; using defaults");
            Ok(fallback())
        }
    }
}

fn save<T: Serialize>(store: &dyn Store, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json)?;
    Ok(())
}

pub fn load_settings(store: &dyn Store) -> Result<Settings> {
    load_or(store, SETTINGS_KEY, Settings::default)
}

pub fn save_settings(store: &dyn Store, settings: &Settings) -> Result<()> {
    save(store, SETTINGS_KEY, settings)
}

pub fn load_session(store: &dyn Store, settings: &Settings) -> Result<SessionRecord> {
    load_or(store, SESSION_KEY, || SessionRecord::fresh(settings))
}

pub fn save_session(store: &dyn Store, record: &SessionRecord) -> Result<()> {
    save(store, SESSION_KEY, record)
}

pub fn load_statistics(store: &dyn Store) -> Result<StatisticsSnapshot> {
    load_or(store, STATISTICS_KEY, StatisticsSnapshot::default)
}

pub fn save_statistics(store: &dyn Store, statistics: &StatisticsSnapshot) -> Result<()> {
    save(store, STATISTICS_KEY, statistics)
}
