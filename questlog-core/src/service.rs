//! Trigger points called by the CRUD layer.
//!
//! [`Gamification`] composes the XP calculator, the streak tracker and the
//! badge engine over one [`GamificationStore`]. Every read-modify-write of
//! a user's stats runs under that user's lock and lands as a single
//! [`commit_update`](GamificationStore::commit_update), so a failed event
//! leaves neither XP nor log entries behind.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::activity::{ActivityLogEntry, ActivityType};
use crate::badges::{Badge, next_badge, unlocked_badges};
use crate::commands::{ProjectTransition, ResearchCreated, TaskCompletion};
use crate::config::QuestlogConfig;
use crate::error::{GamificationError, Result};
use crate::locks::UserLocks;
use crate::stats::{GamificationStats, UserStats};
use crate::storage::{self, GamificationStore};
use crate::streak::{DEFAULT_HISTORY_DAYS, StreakDay, StreakTracker, StreakUpdate, advance_streak};
use crate::types::UserId;
use crate::xp::{
    LevelProgress, XP_REWARDS, calculate_project_xp, calculate_task_xp, progress_to_next_level,
};

/// What a single XP-earning event did to the user's stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionOutcome {
    /// XP for the event itself, excluding streak XP.
    pub xp_earned: u32,
    /// Total XP after the event and any streak update.
    pub total_xp: u64,
    pub level: u32,
    pub leveled_up: bool,
    /// `None` for events that do not touch the streak.
    pub streak: Option<StreakUpdate>,
}

/// Everything the dashboard shows about a user's progress.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub stats: UserStats,
    pub level_progress: LevelProgress,
    pub weekly_score: u32,
    #[serde(serialize_with = "serialize_badge_ids")]
    pub unlocked_badges: Vec<&'static Badge>,
    #[serde(serialize_with = "serialize_badge_id")]
    pub next_badge: Option<&'static Badge>,
}

/// The gamification engine.
pub struct Gamification {
    store: Arc<dyn GamificationStore>,
    tracker: StreakTracker,
    locks: UserLocks,
    history_days: u32,
}

impl Gamification {
    /// Create an engine over `store`.
    pub fn new(store: Arc<dyn GamificationStore>) -> Self {
        let locks = UserLocks::new();
        Self {
            tracker: StreakTracker::with_locks(store.clone(), locks.clone()),
            store,
            locks,
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }

    /// Open the configured store and build an engine over it.
    pub async fn from_config(config: &QuestlogConfig) -> Result<Self> {
        let store = config.storage.open().await?;
        Ok(Self::new(store).with_history_days(config.history_days))
    }

    /// Set the default window for [`streak_history`](Self::streak_history).
    #[must_use]
    pub fn with_history_days(mut self, days: u32) -> Self {
        self.history_days = days;
        self
    }

    /// The streak tracker sharing this engine's store and locks.
    pub fn tracker(&self) -> &StreakTracker {
        &self.tracker
    }

    /// Create zeroed stats for a new account.
    ///
    /// Returns the existing stats if the user is already provisioned.
    #[instrument(skip(self), level = "debug")]
    pub async fn provision_user(&self, user_id: UserId) -> Result<GamificationStats> {
        if let Some(existing) = self.store.get_stats(user_id).await? {
            return Ok(existing);
        }

        let stats = GamificationStats::new(user_id);
        match self.store.create_stats(&stats).await {
            Ok(()) => {
                info!(%user_id, "provisioned gamification stats");
                Ok(stats)
            }
            Err(storage::Error::AlreadyExists(_)) => self.load_stats(user_id).await,
            Err(err) => Err(err.into()),
        }
    }

    /// Award XP for a completed task and advance the streak.
    pub async fn record_task_completed(
        &self,
        user_id: UserId,
        task: &TaskCompletion,
    ) -> Result<CompletionOutcome> {
        self.record_task_completed_at(user_id, task, Utc::now()).await
    }

    /// [`record_task_completed`](Self::record_task_completed) as of `now`.
    #[instrument(skip(self, task), fields(task_id = %task.task_id), level = "debug")]
    pub async fn record_task_completed_at(
        &self,
        user_id: UserId,
        task: &TaskCompletion,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome> {
        let xp = calculate_task_xp(task.priority);
        let entry = ActivityLogEntry::new(user_id, ActivityType::TaskCompleted, xp, now)
            .with_meta("todo_id", task.task_id.as_str())
            .with_meta("title", task.title.as_str())
            .with_meta("priority", task.priority.as_str());

        self.record_completion(user_id, xp, entry, now).await
    }

    /// Award XP if `transition` moves a project into `completed`.
    ///
    /// Returns `None` for any other status change.
    pub async fn record_project_transition(
        &self,
        user_id: UserId,
        transition: &ProjectTransition,
    ) -> Result<Option<CompletionOutcome>> {
        self.record_project_transition_at(user_id, transition, Utc::now())
            .await
    }

    /// [`record_project_transition`](Self::record_project_transition) as of `now`.
    #[instrument(skip(self, transition), fields(project_id = %transition.project_id), level = "debug")]
    pub async fn record_project_transition_at(
        &self,
        user_id: UserId,
        transition: &ProjectTransition,
        now: DateTime<Utc>,
    ) -> Result<Option<CompletionOutcome>> {
        if !transition.completes_project() {
            debug!(%user_id, "project update is not a completion");
            return Ok(None);
        }

        let xp = calculate_project_xp(&transition.project);
        let entry = ActivityLogEntry::new(user_id, ActivityType::ProjectCompleted, xp, now)
            .with_meta("project_id", transition.project_id.as_str())
            .with_meta("title", transition.title.as_str());

        self.record_completion(user_id, xp, entry, now)
            .await
            .map(Some)
    }

    /// Award the flat research XP. The streak is left alone.
    pub async fn record_research_created(
        &self,
        user_id: UserId,
        research: &ResearchCreated,
    ) -> Result<CompletionOutcome> {
        self.record_research_created_at(user_id, research, Utc::now())
            .await
    }

    /// [`record_research_created`](Self::record_research_created) as of `now`.
    #[instrument(skip(self, research), fields(research_id = %research.research_id), level = "debug")]
    pub async fn record_research_created_at(
        &self,
        user_id: UserId,
        research: &ResearchCreated,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome> {
        let xp = XP_REWARDS.research.created;

        let entry = ActivityLogEntry::new(user_id, ActivityType::ResearchCreated, xp, now)
            .with_meta("research_id", research.research_id.as_str())
            .with_meta("title", research.title.as_str());

        let _guard = self.locks.acquire(user_id).await;
        let before = self.load_stats(user_id).await?;
        let after = before.with_xp_added(xp);
        self.store.commit_update(&before, &after, &[entry]).await?;

        Ok(CompletionOutcome {
            xp_earned: xp,
            total_xp: after.total_xp,
            level: after.level,
            leveled_up: after.level > before.level,
            streak: None,
        })
    }

    /// Aggregate snapshot used for badge evaluation.
    #[instrument(skip(self), level = "debug")]
    pub async fn user_stats(&self, user_id: UserId) -> Result<UserStats> {
        let stats = self.load_stats(user_id).await?;
        let count = |kind: ActivityType| self.store.count_activities(user_id, kind, None);

        Ok(UserStats {
            total_xp: stats.total_xp,
            level: stats.level,
            current_streak: stats.current_streak,
            longest_streak: stats.longest_streak,
            tasks_completed: count(ActivityType::TaskCompleted).await?,
            projects_completed: count(ActivityType::ProjectCompleted).await?,
            research_ideas: count(ActivityType::ResearchCreated).await?,
        })
    }

    /// Level progress, weekly score and badges for the dashboard.
    pub async fn dashboard(&self, user_id: UserId) -> Result<DashboardSummary> {
        self.dashboard_at(user_id, Utc::now()).await
    }

    /// [`dashboard`](Self::dashboard) as of `now`.
    pub async fn dashboard_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<DashboardSummary> {
        let stats = self.user_stats(user_id).await?;
        let weekly_score = self.tracker.calculate_weekly_score_at(user_id, now).await?;

        Ok(DashboardSummary {
            level_progress: progress_to_next_level(
                i64::try_from(stats.total_xp).unwrap_or(i64::MAX),
                stats.level,
            ),
            weekly_score,
            unlocked_badges: unlocked_badges(&stats),
            next_badge: next_badge(&stats),
            stats,
        })
    }

    /// Streak history over the configured window.
    pub async fn streak_history(&self, user_id: UserId) -> Result<Vec<StreakDay>> {
        self.tracker.streak_history(user_id, self.history_days).await
    }

    /// Award `xp`, advance the streak and log `entry` in one store commit.
    async fn record_completion(
        &self,
        user_id: UserId,
        xp: u32,
        entry: ActivityLogEntry,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome> {
        let activity = entry.activity_type;
        let _guard = self.locks.acquire(user_id).await;

        let before = self.load_stats(user_id).await?;
        let step = advance_streak(&before.with_xp_added(xp), now);
        let entries: Vec<_> = step.entry.into_iter().chain([entry]).collect();
        self.store.commit_update(&before, &step.next, &entries).await?;

        let after = step.next;
        info!(
            %user_id,
            activity = activity.as_str(),
            xp,
            streak = step.update.current_streak,
            streak_xp = step.update.xp_earned,
            total_xp = after.total_xp,
            level = after.level,
            "completion recorded"
        );

        Ok(CompletionOutcome {
            xp_earned: xp,
            total_xp: after.total_xp,
            level: after.level,
            leveled_up: after.level > before.level,
            streak: Some(step.update),
        })
    }

    async fn load_stats(&self, user_id: UserId) -> Result<GamificationStats> {
        self.store
            .get_stats(user_id)
            .await?
            .ok_or(GamificationError::NotFound(user_id))
    }
}

fn serialize_badge_ids<S: serde::Serializer>(
    badges: &[&'static Badge],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(badges.iter().map(|badge| badge.id))
}

fn serialize_badge_id<S: serde::Serializer>(
    badge: &Option<&'static Badge>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match badge {
        Some(badge) => serializer.serialize_some(badge.id),
        None => serializer.serialize_none(),
    }
}
