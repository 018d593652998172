//! Persistence contract for the gamification engine.
//!
//! [`GamificationStore`] is the narrow interface the engine calls through.
//! Two implementations ship with the crate:
//! - [`MemoryStore`] - process-local, used by tests and embedders
//! - [`TursoStore`] - libSQL, either an embedded file or a remote Turso database
//!
//! All reads and writes are scoped by [`UserId`].

mod error;
mod memory;
mod turso;

pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use turso::TursoStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::activity::{ActivityLogEntry, ActivityType};
use crate::stats::GamificationStats;
use crate::types::UserId;

/// Reads and writes of per-user gamification state.
#[async_trait]
pub trait GamificationStore: Send + Sync {
    /// Provision stats for a user.
    ///
    /// Fails with [`Error::AlreadyExists`] if the user already has stats.
    async fn create_stats(&self, stats: &GamificationStats) -> Result<()>;

    /// Get the stats for a user.
    async fn get_stats(&self, user_id: UserId) -> Result<Option<GamificationStats>>;

    /// Replace `previous` with `next`, but only if the stored row still
    /// matches `previous`.
    ///
    /// Fails with [`Error::Conflict`] when another writer got there first.
    async fn update_stats(
        &self,
        previous: &GamificationStats,
        next: &GamificationStats,
    ) -> Result<()>;

    /// Append an entry to the activity log.
    async fn append_activity(&self, entry: &ActivityLogEntry) -> Result<()>;

    /// Replace `previous` with `next` and append `entries`, all or nothing.
    ///
    /// Fails with [`Error::Conflict`] under the same rule as
    /// [`update_stats`](Self::update_stats). On any error neither the
    /// stats nor the log change.
    async fn commit_update(
        &self,
        previous: &GamificationStats,
        next: &GamificationStats,
        entries: &[ActivityLogEntry],
    ) -> Result<()>;

    /// Entries for a user with `created_at >= since`, oldest first.
    async fn activities_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ActivityLogEntry>>;

    /// Count entries of one type, optionally restricted to `created_at >= since`.
    async fn count_activities(
        &self,
        user_id: UserId,
        activity_type: ActivityType,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64>;
}
