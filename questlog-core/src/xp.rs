//! XP calculation and level progression.
//!
//! Everything here is a pure function of its arguments. Levels follow a
//! quadratic curve: level `L` begins at `(L - 1)^2 * 100` XP, so level 2
//! starts at 100, level 3 at 400, level 5 at 1600 and level 10 at 8100.

use serde::{Deserialize, Serialize};

use crate::types::{Priority, ProjectFacts, ProjectStatus};

/// Reward table for task completion, by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRewards {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

/// Reward table for projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectRewards {
    pub base: u32,
    pub completion_bonus: u32,
}

/// Reward table for research ideas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchRewards {
    pub created: u32,
}

/// Reward table for daily streak upkeep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakRewards {
    pub daily: u32,
    pub weekly_bonus: u32,
}

/// All XP reward constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpRewards {
    pub task: TaskRewards,
    pub project: ProjectRewards,
    pub research: ResearchRewards,
    pub streak: StreakRewards,
}

pub const XP_REWARDS: XpRewards = XpRewards {
    task: TaskRewards {
        low: 10,
        medium: 20,
        high: 30,
    },
    project: ProjectRewards {
        base: 100,
        completion_bonus: 50,
    },
    research: ResearchRewards { created: 5 },
    streak: StreakRewards {
        daily: 5,
        weekly_bonus: 25,
    },
};

/// XP awarded per level band.
const XP_PER_LEVEL_UNIT: i64 = 100;

/// Highest level an `i64` XP total can reach: `calculate_level(i64::MAX)`.
///
/// Level arguments above this are treated as `MAX_LEVEL`.
pub const MAX_LEVEL: u32 = 303_700_050;

/// Streak length that earns the weekly bonus (and every multiple of it).
const WEEK_DAYS: u32 = 7;

/// XP for completing a task of the given priority.
#[must_use]
pub const fn calculate_task_xp(priority: Priority) -> u32 {
    match priority {
        Priority::Low => XP_REWARDS.task.low,
        Priority::Medium => XP_REWARDS.task.medium,
        Priority::High => XP_REWARDS.task.high,
    }
}

/// XP for a project: the custom (or default) reward, plus the completion
/// bonus once the project is completed.
///
/// A reward of zero is treated like a missing one.
#[must_use]
pub fn calculate_project_xp(project: &ProjectFacts) -> u32 {
    let base = project
        .xp_reward
        .filter(|reward| *reward > 0)
        .unwrap_or(XP_REWARDS.project.base);

    if project.status == ProjectStatus::Completed {
        base.saturating_add(XP_REWARDS.project.completion_bonus)
    } else {
        base
    }
}

/// Level reached with `total_xp`: `floor(sqrt(total_xp / 100)) + 1`.
///
/// Negative totals clamp to level 1.
#[must_use]
pub fn calculate_level(total_xp: i64) -> u32 {
    if total_xp < 0 {
        return 1;
    }
    // floor(sqrt(x / 100)) == isqrt(floor(x / 100)) for non-negative x
    let root = (total_xp / XP_PER_LEVEL_UNIT).isqrt();
    u32::try_from(root).unwrap_or(u32::MAX - 1) + 1
}

/// Total XP at which `level` begins.
///
/// `level` is clamped to [`MAX_LEVEL`], so the result always fits an `i64`.
#[must_use]
pub fn xp_for_level(level: u32) -> i64 {
    if level <= 1 {
        return 0;
    }
    let steps = i64::from(level.min(MAX_LEVEL) - 1);
    steps * steps * XP_PER_LEVEL_UNIT
}

/// Total XP at which the level after `current_level` begins.
///
/// From [`MAX_LEVEL`] on there is no next level; the band ends at `i64::MAX`.
#[must_use]
pub fn xp_for_next_level(current_level: u32) -> i64 {
    if current_level >= MAX_LEVEL {
        return i64::MAX;
    }
    xp_for_level(current_level + 1)
}

/// Progress within the current level band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// XP earned since the current level began.
    pub current: i64,
    /// XP width of the current level band.
    pub required: i64,
    /// `current / required * 100`, not clamped.
    pub percentage: f64,
}

/// Progress from `current_level` towards the next one.
///
/// The percentage is deliberately left unclamped: a `current_level` that
/// lags behind `total_xp` reports more than 100. Level 0 is read as level 1
/// and levels past [`MAX_LEVEL`] as `MAX_LEVEL`.
#[must_use]
pub fn progress_to_next_level(total_xp: i64, current_level: u32) -> LevelProgress {
    let level = current_level.clamp(1, MAX_LEVEL);
    let level_start = xp_for_level(level);
    let next_start = xp_for_next_level(level);

    let current = total_xp.saturating_sub(level_start);
    let required = next_start - level_start;

    LevelProgress {
        current,
        required,
        percentage: current as f64 / required as f64 * 100.0,
    }
}

/// XP for keeping the streak alive on its `streak_days`-th day.
///
/// Every seventh day earns the weekly bonus on top of the daily reward.
#[must_use]
pub const fn calculate_streak_xp(streak_days: u32) -> u32 {
    let mut xp = XP_REWARDS.streak.daily;
    if streak_days > 0 && streak_days % WEEK_DAYS == 0 {
        xp += XP_REWARDS.streak.weekly_bonus;
    }
    xp
}

/// Level for a persisted (unsigned) XP total.
#[must_use]
pub fn level_for_total(total_xp: u64) -> u32 {
    calculate_level(i64::try_from(total_xp).unwrap_or(i64::MAX))
}
