use serde::{Deserialize, Serialize};

/// The kind of session the timer is counting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionMode {
    #[serde(alias = "pomodoro")]
    Focus,
    ShortBreak,
    LongBreak,
    DeepFocus,
}

impl SessionMode {
    pub const ALL: [SessionMode; 4] = [
        SessionMode::Focus,
        SessionMode::ShortBreak,
        SessionMode::LongBreak,
        SessionMode::DeepFocus,
    ];

    pub fn is_break(self) -> bool {
        matches!(self, SessionMode::ShortBreak | SessionMode::LongBreak)
    }

    /// Work sessions are the ones that count towards statistics.
    pub fn is_work(self) -> bool {
        !self.is_break()
    }

    /// Mode that follows a completed session of this mode.
    ///
    /// `streak` is the consecutive-focus streak *after* the completion was
    /// recorded; `long_break_interval` is how many focus sessions in a row
    /// earn a long break.
    pub fn next_after_completion(self, streak: u32, long_break_interval: u32) -> SessionMode {
        match self {
            SessionMode::Focus if streak >= long_break_interval.max(1) => SessionMode::LongBreak,
            SessionMode::Focus => SessionMode::ShortBreak,
            SessionMode::DeepFocus => SessionMode::LongBreak,
            SessionMode::ShortBreak | SessionMode::LongBreak => SessionMode::Focus,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionMode::Focus => "Focus",
            SessionMode::ShortBreak => "Short Break",
            SessionMode::LongBreak => "Long Break",
            SessionMode::DeepFocus => "Deep Focus",
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionMode::Focus => "focus",
            SessionMode::ShortBreak => "shortBreak",
            SessionMode::LongBreak => "longBreak",
            SessionMode::DeepFocus => "deepFocus",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" | "pomodoro" => Ok(SessionMode::Focus),
            "shortBreak" | "short-break" | "short_break" => Ok(SessionMode::ShortBreak),
            "longBreak" | "long-break" | "long_break" => Ok(SessionMode::LongBreak),
            "deepFocus" | "deep-focus" | "deep_focus" => Ok(SessionMode::DeepFocus),
            other => Err(format!("unknown session mode: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_goes_to_short_break_below_interval() {
        assert_eq!(
            SessionMode::Focus.next_after_completion(3, 4),
            SessionMode::ShortBreak
        );
    }

    #[test]
    fn focus_goes_to_long_break_at_interval() {
        assert_eq!(
            SessionMode::Focus.next_after_completion(4, 4),
            SessionMode::LongBreak
        );
        assert_eq!(
            SessionMode::Focus.next_after_completion(7, 4),
            SessionMode::LongBreak
        );
    }

    #[test]
    fn deep_focus_always_earns_long_break() {
        assert_eq!(
            SessionMode::DeepFocus.next_after_completion(0, 4),
            SessionMode::LongBreak
        );
    }

    #[test]
    fn breaks_return_to_focus() {
        for mode in [SessionMode::ShortBreak, SessionMode::LongBreak] {
            assert_eq!(mode.next_after_completion(9, 4), SessionMode::Focus);
        }
    }

    #[test]
    fn legacy_pomodoro_name_reads_as_focus() {
        let mode: SessionMode = serde_json::from_str("\"pomodoro\"").unwrap();
        assert_eq!(mode, SessionMode::Focus);
        assert_eq!(serde_json::to_string(&mode).unwrap(), "\"focus\"");
    }

    #[test]
    fn display_matches_wire_name() {
        for mode in SessionMode::ALL {
            let wire = serde_json::to_string(&mode).unwrap();
            assert_eq!(wire, format!("\"{mode}\""));
            assert_eq!(mode.to_string().parse::<SessionMode>().unwrap(), mode);
        }
    }
}
