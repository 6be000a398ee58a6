//! Achievement thresholds.
//!
//! Unlock status is never stored; it is recomputed from the current
//! [`StatisticsSnapshot`] every time it is asked for.

use serde::Serialize;

use crate::stats::StatisticsSnapshot;

/// Which counter an achievement is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ThresholdType {
    TotalSessions,
    ConsecutiveFocus,
    CompletedTasks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub name: &'static str,
    pub description: &'static str,
    pub threshold_type: ThresholdType,
    pub threshold: u32,
}

pub const ACHIEVEMENTS: [Achievement; 4] = [
    Achievement {
        name: "First Steps",
        description: "Complete 5 focus sessions",
        threshold_type: ThresholdType::TotalSessions,
        threshold: 5,
    },
    Achievement {
        name: "Productivity Master",
        description: "Complete 50 focus sessions",
        threshold_type: ThresholdType::TotalSessions,
        threshold: 50,
    },
    Achievement {
        name: "Unstoppable",
        description: "Complete 4 focus sessions in a row",
        threshold_type: ThresholdType::ConsecutiveFocus,
        threshold: 4,
    },
    Achievement {
        name: "Task Master",
        description: "Complete 10 tasks",
        threshold_type: ThresholdType::CompletedTasks,
        threshold: 10,
    },
];

impl Achievement {
    /// Current value of the counter this achievement watches.
    pub fn progress(&self, snapshot: &StatisticsSnapshot) -> u32 {
        match self.threshold_type {
            ThresholdType::ConsecutiveFocus => snapshot.consecutive_focus_streak,
            ThresholdType::CompletedTasks => snapshot.completed_task_count,
            ThresholdType::TotalSessions => snapshot.total_count,
        }
    }
}

pub fn is_unlocked(achievement: &Achievement, snapshot: &StatisticsSnapshot) -> bool {
    achievement.progress(snapshot) >= achievement.threshold
}

/// Unlock status of one achievement, for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStatus {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub progress: u32,
    pub unlocked: bool,
}

pub fn evaluate(table: &[Achievement], snapshot: &StatisticsSnapshot) -> Vec<AchievementStatus> {
    table
        .iter()
        .map(|a| AchievementStatus {
            achievement: a.clone(),
            progress: a.progress(snapshot),
            unlocked: is_unlocked(a, snapshot),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_name(name: &str) -> &'static Achievement {
        ACHIEVEMENTS.iter().find(|a| a.name == name).unwrap()
    }

    #[test]
    fn nothing_unlocked_on_fresh_stats() {
        let snapshot = StatisticsSnapshot::default();
        assert!(ACHIEVEMENTS.iter().all(|a| !is_unlocked(a, &snapshot)));
    }

    #[test]
    fn total_sessions_threshold_is_inclusive() {
        let snapshot = StatisticsSnapshot {
            total_count: 5,
            ..Default::default()
        };
        assert!(is_unlocked(by_name("First Steps"), &snapshot));
        assert!(!is_unlocked(by_name("Productivity Master"), &snapshot));
    }

    #[test]
    fn streak_achievement_reads_streak_not_total() {
        let snapshot = StatisticsSnapshot {
            total_count: 100,
            consecutive_focus_streak: 3,
            ..Default::default()
        };
        assert!(!is_unlocked(by_name("Unstoppable"), &snapshot));
        let snapshot = StatisticsSnapshot {
            consecutive_focus_streak: 4,
            ..snapshot
        };
        assert!(is_unlocked(by_name("Unstoppable"), &snapshot));
    }

    #[test]
    fn task_achievement_reads_completed_tasks() {
        let snapshot = StatisticsSnapshot {
            completed_task_count: 10,
            ..Default::default()
        };
        assert!(is_unlocked(by_name("Task Master"), &snapshot));
    }

    #[test]
    fn evaluate_reports_progress_for_every_entry() {
        let snapshot = StatisticsSnapshot {
            total_count: 7,
            ..Default::default()
        };
        let statuses = evaluate(&ACHIEVEMENTS, &snapshot);
        assert_eq!(statuses.len(), ACHIEVEMENTS.len());
        assert!(statuses[0].unlocked);
        assert_eq!(statuses[1].progress, 7);
        assert!(!statuses[1].unlocked);
    }
}
