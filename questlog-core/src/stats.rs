//! Persisted per-user gamification stats and the aggregated snapshot
//! the badge engine evaluates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::UserId;
use crate::xp::level_for_total;

/// One row per user, created at account provisioning.
///
/// `level` always equals `calculate_level(total_xp)` and
/// `longest_streak >= current_streak`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamificationStats {
    pub user_id: UserId,
    pub total_xp: u64,
    pub level: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// UTC day of the most recent streak-qualifying activity.
    pub last_activity_date: Option<NaiveDate>,
}

impl GamificationStats {
    /// Zeroed stats for a freshly provisioned user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            total_xp: 0,
            level: 1,
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
        }
    }

    /// Copy of these stats with `xp` added and the level recomputed.
    #[must_use]
    pub fn with_xp_added(&self, xp: u32) -> Self {
        let total_xp = self.total_xp.saturating_add(u64::from(xp));
        Self {
            total_xp,
            level: level_for_total(total_xp),
            ..self.clone()
        }
    }
}

/// Aggregate snapshot of a user's progress, used for badge evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_xp: u64,
    pub level: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub tasks_completed: u64,
    pub projects_completed: u64,
    pub research_ideas: u64,
}
