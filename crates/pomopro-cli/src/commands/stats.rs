use clap::Subcommand;
use pomopro_core::{evaluate, SessionMode, ACHIEVEMENTS};
use serde_json::json;

use super::{print_json, Workspace};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Counters, focused minutes and per-day/per-week series
    Show,
    /// Achievement unlock status
    Achievements,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::open()?;
    let mut engine = ws.engine()?;
    engine.roll_over_stats();
    let stats = engine.statistics();

    match action {
        StatsAction::Show => {
            let focus_secs = engine.settings().duration_secs(SessionMode::Focus);
            let focused_minutes = engine.stats().focused_minutes_today(focus_secs);
            let daily: Vec<_> = stats
                .daily_series()
                .into_iter()
                .map(|(day, count)| json!({ "day": day, "count": count }))
                .collect();
            let weekly: Vec<_> = stats
                .weekly_series()
                .into_iter()
                .map(|(week, count)| json!({ "week": week, "count": count }))
                .collect();
            print_json(&json!({
                "todayCount": stats.today_count,
                "weekCount": stats.week_count,
                "totalCount": stats.total_count,
                "completedTaskCount": stats.completed_task_count,
                "consecutiveFocusStreak": stats.consecutive_focus_streak,
                "focusedMinutesToday": focused_minutes,
                "daily": daily,
                "weekly": weekly,
            }))?;
        }
        StatsAction::Achievements => {
            print_json(&evaluate(&ACHIEVEMENTS, stats))?;
        }
    }
    Ok(())
}
