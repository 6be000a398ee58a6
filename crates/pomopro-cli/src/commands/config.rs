use clap::Subcommand;
use pomopro_core::storage::records::save_settings;
use pomopro_core::Settings;

use super::{print_json, Workspace};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a setting (e.g. "shortBreak", "autoStartBreaks")
    Get {
        /// Setting key
        key: String,
    },
    /// Set a setting
    Set {
        /// Setting key
        key: String,
        /// New value
        value: String,
    },
    /// List all settings
    List,
    /// Reset settings to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = Workspace::open()?;
    match action {
        ConfigAction::Get { key } => match ws.settings.get(&key) {
            Some(value) => println!("{value}"),
            None => return Err(format!("unknown key: {key}").into()),
        },
        ConfigAction::Set { key, value } => {
            let mut settings = ws.settings.clone();
            settings.set(&key, &value)?;
            apply(&mut ws, settings)?;
            println!("ok");
        }
        ConfigAction::List => print_json(&ws.settings)?,
        ConfigAction::Reset => {
            apply(&mut ws, Settings::default())?;
            println!("settings reset to defaults");
        }
    }
    Ok(())
}

/// Persist new settings and let the session pick up new durations.
fn apply(ws: &mut Workspace, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    save_settings(&ws.db, &settings)?;
    let mut engine = ws.engine()?;
    engine.update_settings(settings.clone());
    ws.settings = settings;
    ws.save(&engine)
}
