//! Gamification engine for questlog.
//!
//! This crate turns productivity events (completed tasks, completed
//! projects, new research ideas) into experience points, levels, daily
//! streaks, a weekly productivity score and unlockable badges.
//!
//! # Architecture
//!
//! - **Calculators** ([`xp`], [`streak::weekly_score`]) are pure functions
//! - **Storage** ([`GamificationStore`]) persists per-user stats and the
//!   append-only activity log
//! - **Tracker** ([`StreakTracker`]) owns streak state transitions
//! - **Badges** ([`BADGES`]) are derived on demand from [`UserStats`]
//! - **Service** ([`Gamification`]) is the trigger point for the CRUD layer
//!
//! Calendar days are UTC days throughout.

mod activity;
mod badges;
mod commands;
mod config;
mod error;
mod locks;
mod service;
mod stats;
pub mod storage;
pub mod streak;
mod types;
pub mod xp;

// Activity log
pub use activity::{ActivityLogEntry, ActivityType, Metadata};

// Badges
pub use badges::{
    BADGES, Badge, BadgeProgress, ProgressMetric, ProgressRule, badge_progress, get_badge,
    next_badge, unlocked_badges,
};

// Command types
pub use commands::{ProjectTransition, ResearchCreated, TaskCompletion};

// Configuration
pub use config::{QuestlogConfig, StorageConfig};

// Errors
pub use error::{ConfigError, GamificationError, Result};

// Locking
pub use locks::{UserLockGuard, UserLocks};

// Service
pub use service::{CompletionOutcome, DashboardSummary, Gamification};

// Stats
pub use stats::{GamificationStats, UserStats};

// Streaks
pub use streak::{StreakDay, StreakState, StreakTracker, StreakUpdate};

// ID and domain types
pub use types::{ActivityId, Priority, ProjectFacts, ProjectStatus, UserId};

// XP
pub use xp::{LevelProgress, MAX_LEVEL, XP_REWARDS};

// Storage traits (re-export from storage module)
pub use storage::{GamificationStore, MemoryStore, TursoStore};
