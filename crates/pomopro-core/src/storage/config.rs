//! User settings.
//!
//! Stores user preferences including:
//! - Per-mode session durations (seconds)
//! - Notification and sound toggles
//! - Auto-start and background-timekeeping behaviour
//!
//! Settings are persisted as the flat `settings` JSON record in the store.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::stats::WeekStart;
use crate::timer::SessionMode;

/// Longest accepted session length: one day.
pub const MAX_DURATION_SECS: u64 = 24 * 60 * 60;

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Focus session length in seconds.
    #[serde(rename = "pomodoro", alias = "focus", default = "default_focus")]
    pub focus: u64,
    #[serde(default = "default_short_break")]
    pub short_break: u64,
    #[serde(default = "default_long_break")]
    pub long_break: u64,
    #[serde(default = "default_deep_focus")]
    pub deep_focus: u64,
    #[serde(default = "default_true")]
    pub notifications: bool,
    #[serde(default = "default_true")]
    pub sound: bool,
    #[serde(default)]
    pub auto_start_breaks: bool,
    #[serde(default = "default_true")]
    pub break_reminder: bool,
    /// Delegate timekeeping to the background context while running.
    #[serde(default = "default_true")]
    pub background_mode: bool,
    /// Consecutive focus sessions that earn a long break.
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    /// First day of the week for weekly statistics.
    #[serde(default)]
    pub week_start: WeekStart,
}

// Default functions
fn default_focus() -> u64 {
    25 * 60
}
fn default_short_break() -> u64 {
    5 * 60
}
fn default_long_break() -> u64 {
    15 * 60
}
fn default_deep_focus() -> u64 {
    45 * 60
}
fn default_true() -> bool {
    true
}
fn default_long_break_interval() -> u32 {
    4
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus: default_focus(),
            short_break: default_short_break(),
            long_break: default_long_break(),
            deep_focus: default_deep_focus(),
            notifications: true,
            sound: true,
            auto_start_breaks: false,
            break_reminder: true,
            background_mode: true,
            long_break_interval: default_long_break_interval(),
            week_start: WeekStart::default(),
        }
    }
}

impl Settings {
    /// Configured length of `mode` in seconds, within
    /// `1..=MAX_DURATION_SECS`.
    pub fn duration_secs(&self, mode: SessionMode) -> u64 {
        let secs = match mode {
            SessionMode::Focus => self.focus,
            SessionMode::ShortBreak => self.short_break,
            SessionMode::LongBreak => self.long_break,
            SessionMode::DeepFocus => self.deep_focus,
        };
        secs.clamp(1, MAX_DURATION_SECS)
    }

    /// Get a setting as a string by its record key (e.g. `shortBreak`).
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match json.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a setting by its record key, parsing `value` according to the
    /// type of the existing field.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed as
    /// the field's type, or a number falls outside `1..=MAX_DURATION_SECS`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        let obj = json
            .as_object_mut()
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let existing = obj
            .get(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
            ),
            serde_json::Value::Number(_) => {
                let n = value
                    .parse::<u64>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                if n == 0 {
                    return Err(invalid("must be at least 1".into()));
                }
                if n > MAX_DURATION_SECS {
                    return Err(invalid(format!("must be at most {MAX_DURATION_SECS}")));
                }
                serde_json::Value::Number(n.into())
            }
            _ => serde_json::Value::String(value.into()),
        };
        obj.insert(key.to_string(), new_value);

        *self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_durations_match_pomodoro_classic() {
        let s = Settings::default();
        assert_eq!(s.duration_secs(SessionMode::Focus), 1500);
        assert_eq!(s.duration_secs(SessionMode::ShortBreak), 300);
        assert_eq!(s.duration_secs(SessionMode::LongBreak), 900);
        assert_eq!(s.duration_secs(SessionMode::DeepFocus), 2700);
        assert!(s.background_mode);
        assert!(!s.auto_start_breaks);
    }

    #[test]
    fn record_uses_camel_case_key_names() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["pomodoro"], 1500);
        assert_eq!(json["shortBreak"], 300);
        assert_eq!(json["autoStartBreaks"], false);
        assert_eq!(json["backgroundMode"], true);
    }

    #[test]
    fn partial_record_fills_defaults() {
        let s: Settings = serde_json::from_str(r#"{"pomodoro": 600, "sound": false}"#).unwrap();
        assert_eq!(s.focus, 600);
        assert!(!s.sound);
        assert_eq!(s.long_break, 900);
    }

    #[test]
    fn get_returns_string_for_all_types() {
        let s = Settings::default();
        assert_eq!(s.get("sound").as_deref(), Some("true"));
        assert_eq!(s.get("longBreak").as_deref(), Some("900"));
        assert!(s.get("missing").is_none());
    }

    #[test]
    fn set_updates_bool_and_number() {
        let mut s = Settings::default();
        s.set("autoStartBreaks", "true").unwrap();
        s.set("deepFocus", "3600").unwrap();
        assert!(s.auto_start_breaks);
        assert_eq!(s.deep_focus, 3600);
    }

    #[test]
    fn set_validates_string_enums() {
        let mut s = Settings::default();
        s.set("weekStart", "monday").unwrap();
        assert_eq!(s.week_start, WeekStart::Monday);
        assert!(s.set("weekStart", "friday").is_err());
        assert_eq!(s.week_start, WeekStart::Monday);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut s = Settings::default();
        assert!(matches!(
            s.set("theme", "dark"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn set_rejects_invalid_type_and_zero_duration() {
        let mut s = Settings::default();
        assert!(s.set("sound", "loud").is_err());
        assert!(s.set("shortBreak", "0").is_err());
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn zero_duration_is_clamped_when_read() {
        let s = Settings {
            short_break: 0,
            ..Settings::default()
        };
        assert_eq!(s.duration_secs(SessionMode::ShortBreak), 1);
    }

    #[test]
    fn set_rejects_durations_longer_than_a_day() {
        let mut s = Settings::default();
        assert!(matches!(
            s.set("pomodoro", "10000000000000"),
            Err(ConfigError::InvalidValue { .. })
        ));
        s.set("pomodoro", "86400").unwrap();
        assert_eq!(s.focus, MAX_DURATION_SECS);
    }

    #[test]
    fn oversized_record_duration_is_capped_when_read() {
        let s: Settings = serde_json::from_str(r#"{"pomodoro": 18446744073709551615}"#).unwrap();
        assert_eq!(s.duration_secs(SessionMode::Focus), MAX_DURATION_SECS);
    }
}
