//! Badge catalog and unlock evaluation.
//!
//! Badges are never stored as unlocked state. They are derived on demand
//! from a [`UserStats`] snapshot against the static [`BADGES`] catalog,
//! which is declared in increasing order of difficulty.

use serde::{Deserialize, Serialize};

use crate::stats::UserStats;

/// Stat a badge's progress is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMetric {
    TasksCompleted,
    ProjectsCompleted,
    CurrentStreak,
    Level,
}

impl ProgressMetric {
    fn value(self, stats: &UserStats) -> u64 {
        match self {
            Self::TasksCompleted => stats.tasks_completed,
            Self::ProjectsCompleted => stats.projects_completed,
            Self::CurrentStreak => u64::from(stats.current_streak),
            Self::Level => u64::from(stats.level),
        }
    }

    fn describe(self, value: u64, target: u64) -> String {
        match self {
            Self::TasksCompleted => format!("{value}/{target} tasks completed"),
            Self::ProjectsCompleted => format!("{value}/{target} projects completed"),
            Self::CurrentStreak => format!("{value}/{target} day streak"),
            Self::Level => format!("Level {value}/{target}"),
        }
    }
}

/// How progress towards a badge is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRule {
    pub metric: ProgressMetric,
    pub target: u64,
}

/// A named achievement unlocked by a predicate over aggregate stats.
#[derive(Debug, Clone, Copy)]
pub struct Badge {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub condition: fn(&UserStats) -> bool,
    /// Only some badges report fractional progress.
    pub progress: Option<ProgressRule>,
}

impl Badge {
    /// Whether `stats` satisfy this badge's condition.
    #[must_use]
    pub fn is_unlocked(&self, stats: &UserStats) -> bool {
        (self.condition)(stats)
    }
}

impl PartialEq for Badge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Badge {}

const fn tracked(metric: ProgressMetric, target: u64) -> Option<ProgressRule> {
    Some(ProgressRule { metric, target })
}

/// The badge catalog, ordered from easiest to hardest.
pub static BADGES: [Badge; 12] = [
    Badge {
        id: "first_steps",
        name: "First Steps",
        description: "Complete your first task",
        icon: "🎯",
        condition: |s| s.tasks_completed >= 1,
        progress: None,
    },
    Badge {
        id: "task_master",
        name: "Task Master",
        description: "Complete 10 tasks",
        icon: "✅",
        condition: |s| s.tasks_completed >= 10,
        progress: tracked(ProgressMetric::TasksCompleted, 10),
    },
    Badge {
        id: "productivity_king",
        name: "Productivity King",
        description: "Complete 100 tasks",
        icon: "👑",
        condition: |s| s.tasks_completed >= 100,
        progress: tracked(ProgressMetric::TasksCompleted, 100),
    },
    Badge {
        id: "week_warrior",
        name: "Week Warrior",
        description: "Maintain a 7-day streak",
        icon: "🔥",
        condition: |s| s.current_streak >= 7,
        progress: tracked(ProgressMetric::CurrentStreak, 7),
    },
    Badge {
        id: "unstoppable",
        name: "Unstoppable",
        description: "Maintain a 30-day streak",
        icon: "⚡",
        condition: |s| s.current_streak >= 30,
        progress: tracked(ProgressMetric::CurrentStreak, 30),
    },
    Badge {
        id: "streak_legend",
        name: "Streak Legend",
        description: "Achieve a 100-day streak",
        icon: "🌟",
        condition: |s| s.longest_streak >= 100,
        progress: None,
    },
    Badge {
        id: "project_starter",
        name: "Project Starter",
        description: "Complete your first project",
        icon: "🚀",
        condition: |s| s.projects_completed >= 1,
        progress: None,
    },
    Badge {
        id: "project_master",
        name: "Project Master",
        description: "Complete 10 projects",
        icon: "🏆",
        condition: |s| s.projects_completed >= 10,
        progress: tracked(ProgressMetric::ProjectsCompleted, 10),
    },
    Badge {
        id: "visionary",
        name: "Visionary",
        description: "Create 25 research ideas",
        icon: "💡",
        condition: |s| s.research_ideas >= 25,
        progress: None,
    },
    Badge {
        id: "rising_star",
        name: "Rising Star",
        description: "Reach level 5",
        icon: "⭐",
        condition: |s| s.level >= 5,
        progress: None,
    },
    Badge {
        id: "century_club",
        name: "Century Club",
        description: "Reach level 10",
        icon: "💯",
        condition: |s| s.level >= 10,
        progress: tracked(ProgressMetric::Level, 10),
    },
    Badge {
        id: "elite",
        name: "Elite",
        description: "Reach level 20",
        icon: "💎",
        condition: |s| s.level >= 20,
        progress: None,
    },
];

/// Look up a badge by id.
#[must_use]
pub fn get_badge(id: &str) -> Option<&'static Badge> {
    BADGES.iter().find(|badge| badge.id == id)
}

/// Badges whose condition holds, in catalog order.
#[must_use]
pub fn unlocked_badges(stats: &UserStats) -> Vec<&'static Badge> {
    BADGES.iter().filter(|badge| badge.is_unlocked(stats)).collect()
}

/// First locked badge in catalog order.
///
/// This is a positional scan, not a nearest-by-progress search.
#[must_use]
pub fn next_badge(stats: &UserStats) -> Option<&'static Badge> {
    BADGES.iter().find(|badge| !badge.is_unlocked(stats))
}

/// Unlock state and progress towards a single badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeProgress {
    pub unlocked: bool,
    /// Percentage towards the badge, capped at 100.
    pub progress: f64,
    pub description: String,
}

/// Progress of `stats` towards `badge`.
///
/// Badges without a progress rule report 0 and their static description.
#[must_use]
pub fn badge_progress(badge: &Badge, stats: &UserStats) -> BadgeProgress {
    let unlocked = badge.is_unlocked(stats);

    let (progress, description) = match badge.progress {
        Some(ProgressRule { metric, target }) => {
            let value = metric.value(stats);
            (
                value as f64 / target as f64 * 100.0,
                metric.describe(value, target),
            )
        }
        None => (0.0, badge.description.to_string()),
    };

    BadgeProgress {
        unlocked,
        progress: progress.min(100.0),
        description,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn ids(badges: &[&Badge]) -> Vec<&'static str> {
        badges.iter().map(|badge| badge.id).collect()
    }

    #[test]
    fn catalog_ids_are_unique() {
        let unique: HashSet<_> = BADGES.iter().map(|badge| badge.id).collect();
        assert_eq!(unique.len(), BADGES.len());
    }

    #[test]
    fn fresh_user_has_no_badges() {
        let stats = UserStats::default();

        assert!(unlocked_badges(&stats).is_empty());
        assert_eq!(next_badge(&stats).map(|b| b.id), Some("first_steps"));
    }

    #[test]
    fn fifteen_tasks_unlock_first_two_task_badges() {
        let stats = UserStats {
            tasks_completed: 15,
            ..Default::default()
        };

        let unlocked = unlocked_badges(&stats);

        assert_eq!(ids(&unlocked), vec!["first_steps", "task_master"]);
        assert!(!unlocked.iter().any(|b| b.id == "productivity_king"));
    }

    #[test]
    fn unlocked_badges_preserve_catalog_order() {
        let stats = UserStats {
            level: 10,
            tasks_completed: 1,
            projects_completed: 1,
            current_streak: 7,
            longest_streak: 7,
            ..Default::default()
        };

        assert_eq!(
            ids(&unlocked_badges(&stats)),
            vec![
                "first_steps",
                "week_warrior",
                "project_starter",
                "rising_star",
                "century_club"
            ]
        );
    }

    #[test]
    fn next_badge_is_first_locked_in_catalog_order() {
        let stats = UserStats {
            tasks_completed: 12,
            current_streak: 6,
            ..Default::default()
        };

        // week_warrior is one day away, productivity_king is 88 tasks away
        assert_eq!(next_badge(&stats).map(|b| b.id), Some("productivity_king"));
    }

    #[test]
    fn next_badge_is_none_when_everything_is_unlocked() {
        let stats = UserStats {
            total_xp: 1_000_000,
            level: 20,
            current_streak: 100,
            longest_streak: 100,
            tasks_completed: 100,
            projects_completed: 10,
            research_ideas: 25,
        };

        assert_eq!(unlocked_badges(&stats).len(), BADGES.len());
        assert!(next_badge(&stats).is_none());
    }

    #[test]
    fn streak_legend_uses_longest_streak() {
        let stats = UserStats {
            current_streak: 1,
            longest_streak: 100,
            ..Default::default()
        };

        assert!(get_badge("streak_legend").unwrap().is_unlocked(&stats));
        assert!(!get_badge("unstoppable").unwrap().is_unlocked(&stats));
    }

    #[test]
    fn get_badge_finds_by_id() {
        assert_eq!(get_badge("visionary").map(|b| b.name), Some("Visionary"));
        assert!(get_badge("missing").is_none());
    }

    #[test]
    fn task_master_progress_is_ratio_of_ten() {
        let stats = UserStats {
            tasks_completed: 4,
            ..Default::default()
        };

        let progress = badge_progress(get_badge("task_master").unwrap(), &stats);

        assert!(!progress.unlocked);
        assert_eq!(progress.progress, 40.0);
        assert_eq!(progress.description, "4/10 tasks completed");
    }

    #[test]
    fn progress_is_capped_at_100() {
        let stats = UserStats {
            tasks_completed: 25,
            ..Default::default()
        };

        let progress = badge_progress(get_badge("task_master").unwrap(), &stats);

        assert!(progress.unlocked);
        assert_eq!(progress.progress, 100.0);
        assert_eq!(progress.description, "25/10 tasks completed");
    }

    #[test]
    fn streak_and_level_badges_describe_their_metric() {
        let stats = UserStats {
            current_streak: 3,
            level: 4,
            projects_completed: 2,
            ..Default::default()
        };

        let week = badge_progress(get_badge("week_warrior").unwrap(), &stats);
        assert_eq!(week.description, "3/7 day streak");

        let unstoppable = badge_progress(get_badge("unstoppable").unwrap(), &stats);
        assert_eq!(unstoppable.description, "3/30 day streak");
        assert_eq!(unstoppable.progress, 10.0);

        let projects = badge_progress(get_badge("project_master").unwrap(), &stats);
        assert_eq!(projects.description, "2/10 projects completed");
        assert_eq!(projects.progress, 20.0);

        let century = badge_progress(get_badge("century_club").unwrap(), &stats);
        assert_eq!(century.description, "Level 4/10");
        assert_eq!(century.progress, 40.0);
    }

    #[test]
    fn untracked_badges_report_zero_and_static_description() {
        let stats = UserStats {
            tasks_completed: 3,
            ..Default::default()
        };

        let progress = badge_progress(get_badge("first_steps").unwrap(), &stats);

        assert!(progress.unlocked);
        assert_eq!(progress.progress, 0.0);
        assert_eq!(progress.description, "Complete your first task");
    }
}
