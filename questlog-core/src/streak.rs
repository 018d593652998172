//! Daily streak tracking and weekly productivity scoring.
//!
//! Every streak transition goes through `advance_streak`, which produces
//! the next [`GamificationStats`] and the `streak_updated` log entry in one
//! step. Calendar days are UTC days.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::activity::{ActivityLogEntry, ActivityType};
use crate::error::{GamificationError, Result};
use crate::locks::UserLocks;
use crate::stats::GamificationStats;
use crate::storage::GamificationStore;
use crate::types::UserId;
use crate::xp::calculate_streak_xp;

/// Days covered by the weekly score.
const WEEKLY_WINDOW_DAYS: i64 = 7;

/// Default number of days returned by [`StreakTracker::streak_history`].
pub const DEFAULT_HISTORY_DAYS: u32 = 30;

/// Where a user stands relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakState {
    /// No streak-qualifying activity was ever recorded.
    NoActivity,
    /// Activity was already counted today.
    ActiveToday,
    /// Last activity was yesterday; today's activity extends the streak.
    StreakAlive,
    /// Last activity was two or more days ago.
    StreakBroken,
}

impl StreakState {
    /// Classify `last_activity` relative to `today`.
    ///
    /// A last activity dated after `today` counts as [`StreakState::ActiveToday`].
    #[must_use]
    pub fn classify(last_activity: Option<NaiveDate>, today: NaiveDate) -> Self {
        let Some(last) = last_activity else {
            return Self::NoActivity;
        };
        match (today - last).num_days() {
            days if days <= 0 => Self::ActiveToday,
            1 => Self::StreakAlive,
            _ => Self::StreakBroken,
        }
    }

    /// Whether the next activity starts a new streak.
    #[must_use]
    pub fn is_broken(self) -> bool {
        matches!(self, Self::NoActivity | Self::StreakBroken)
    }
}

/// True when the streak cannot be continued today: there is no prior
/// activity, or it lies more than one calendar day back.
#[must_use]
pub fn check_streak_break(last_activity: Option<NaiveDate>, today: NaiveDate) -> bool {
    StreakState::classify(last_activity, today).is_broken()
}

/// Result of a streak update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakUpdate {
    pub current_streak: u32,
    pub xp_earned: u32,
    pub streak_broken: bool,
}

/// One day of streak history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakDay {
    pub date: NaiveDate,
    pub has_activity: bool,
}

/// Weekly productivity score from activity counts.
///
/// Tasks and projects each contribute up to 40 points (20 tasks, 3
/// projects); each streak day contributes 20/7.
#[must_use]
pub fn weekly_score(task_completions: u64, project_completions: u64, streak_days: u64) -> u32 {
    let task_score = (task_completions as f64 / 20.0 * 40.0).min(40.0);
    let project_score = (project_completions as f64 / 3.0 * 40.0).min(40.0);
    let streak_score = streak_days as f64 / 7.0 * 20.0;

    (task_score + project_score + streak_score).round() as u32
}

/// What one streak-qualifying activity does to a user's stats.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StreakStep {
    pub next: GamificationStats,
    pub update: StreakUpdate,
    /// `None` when the activity was already counted today.
    pub entry: Option<ActivityLogEntry>,
}

/// Advance `stats` for an activity at `now` without touching storage.
pub(crate) fn advance_streak(stats: &GamificationStats, now: DateTime<Utc>) -> StreakStep {
    let today = now.date_naive();
    let state = StreakState::classify(stats.last_activity_date, today);

    if state == StreakState::ActiveToday {
        return StreakStep {
            next: stats.clone(),
            update: StreakUpdate {
                current_streak: stats.current_streak,
                xp_earned: 0,
                streak_broken: false,
            },
            entry: None,
        };
    }

    let streak_broken = state.is_broken();
    let current_streak = if streak_broken {
        1
    } else {
        stats.current_streak.saturating_add(1)
    };
    let xp_earned = calculate_streak_xp(current_streak);

    let next = GamificationStats {
        current_streak,
        longest_streak: current_streak.max(stats.longest_streak),
        last_activity_date: Some(today),
        ..stats.with_xp_added(xp_earned)
    };
    let entry = ActivityLogEntry::new(stats.user_id, ActivityType::StreakUpdated, xp_earned, now)
        .with_meta("streak", current_streak)
        .with_meta("broken", streak_broken);

    StreakStep {
        next,
        update: StreakUpdate {
            current_streak,
            xp_earned,
            streak_broken,
        },
        entry: Some(entry),
    }
}

/// Tracks daily streaks against the persisted stats and activity log.
#[derive(Clone)]
pub struct StreakTracker {
    store: Arc<dyn GamificationStore>,
    locks: UserLocks,
}

impl StreakTracker {
    /// Create a tracker with its own lock table.
    pub fn new(store: Arc<dyn GamificationStore>) -> Self {
        Self::with_locks(store, UserLocks::new())
    }

    /// Create a tracker sharing an existing lock table.
    pub fn with_locks(store: Arc<dyn GamificationStore>, locks: UserLocks) -> Self {
        Self { store, locks }
    }

    /// Record today's streak-qualifying activity for `user_id`.
    pub async fn update_streak(&self, user_id: UserId) -> Result<StreakUpdate> {
        self.update_streak_at(user_id, Utc::now()).await
    }

    /// [`update_streak`](Self::update_streak) as of `now`.
    #[instrument(skip(self), level = "debug")]
    pub async fn update_streak_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<StreakUpdate> {
        let _guard = self.locks.acquire(user_id).await;
        let stats = self
            .store
            .get_stats(user_id)
            .await?
            .ok_or(GamificationError::NotFound(user_id))?;

        let step = advance_streak(&stats, now);
        let Some(entry) = &step.entry else {
            debug!(%user_id, streak = stats.current_streak, "activity already counted today");
            return Ok(step.update);
        };
        self.store
            .commit_update(&stats, &step.next, std::slice::from_ref(entry))
            .await?;

        info!(
            %user_id,
            streak = step.update.current_streak,
            xp = step.update.xp_earned,
            broken = step.update.streak_broken,
            "streak updated"
        );
        Ok(step.update)
    }

    /// Weekly productivity score over the last seven days.
    pub async fn calculate_weekly_score(&self, user_id: UserId) -> Result<u32> {
        self.calculate_weekly_score_at(user_id, Utc::now()).await
    }

    /// [`calculate_weekly_score`](Self::calculate_weekly_score) as of `now`.
    #[instrument(skip(self), level = "debug")]
    pub async fn calculate_weekly_score_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<u32> {
        let since = now - Duration::days(WEEKLY_WINDOW_DAYS);
        let activities = self.store.activities_since(user_id, since).await?;

        let count = |kind: ActivityType| {
            activities
                .iter()
                .filter(|entry| entry.activity_type == kind)
                .count() as u64
        };

        let score = weekly_score(
            count(ActivityType::TaskCompleted),
            count(ActivityType::ProjectCompleted),
            count(ActivityType::StreakUpdated),
        );
        debug!(%user_id, score, entries = activities.len(), "weekly score");
        Ok(score)
    }

    /// Activity flags for the trailing `days` calendar days, oldest first.
    ///
    /// Fails with `InvalidArgument` when the window starts before the
    /// earliest representable date.
    pub async fn streak_history(&self, user_id: UserId, days: u32) -> Result<Vec<StreakDay>> {
        self.streak_history_at(user_id, days, Utc::now()).await
    }

    /// [`streak_history`](Self::streak_history) as of `now`.
    #[instrument(skip(self), level = "debug")]
    pub async fn streak_history_at(
        &self,
        user_id: UserId,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<StreakDay>> {
        if days == 0 {
            return Ok(Vec::new());
        }

        let today = now.date_naive();
        let first_day = today
            .checked_sub_days(Days::new(u64::from(days) - 1))
            .ok_or_else(|| {
                GamificationError::InvalidArgument(format!(
                    "streak history of {days} days reaches before the earliest date"
                ))
            })?;
        let since = first_day.and_time(NaiveTime::MIN).and_utc();

        let active: HashSet<NaiveDate> = self
            .store
            .activities_since(user_id, since)
            .await?
            .iter()
            .map(|entry| entry.created_at.date_naive())
            .collect();

        Ok(first_day
            .iter_days()
            .take(days as usize)
            .map(|date| StreakDay {
                date,
                has_activity: active.contains(&date),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    async fn setup(stats: GamificationStats) -> (StreakTracker, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.create_stats(&stats).await.unwrap();
        (StreakTracker::new(store.clone()), store)
    }

    fn stats_with_streak(current: u32, longest: u32, last: Option<NaiveDate>) -> GamificationStats {
        GamificationStats {
            current_streak: current,
            longest_streak: longest,
            last_activity_date: last,
            ..GamificationStats::new(UserId::new())
        }
    }

    #[test]
    fn classify_covers_every_state() {
        let today = date(2025, 6, 10);
        assert_eq!(StreakState::classify(None, today), StreakState::NoActivity);
        assert_eq!(StreakState::classify(Some(today), today), StreakState::ActiveToday);
        assert_eq!(
            StreakState::classify(Some(date(2025, 6, 9)), today),
            StreakState::StreakAlive
        );
        assert_eq!(
            StreakState::classify(Some(date(2025, 6, 8)), today),
            StreakState::StreakBroken
        );
    }

    #[test]
    fn future_last_activity_counts_as_today() {
        let today = date(2025, 6, 10);
        assert_eq!(
            StreakState::classify(Some(date(2025, 6, 11)), today),
            StreakState::ActiveToday
        );
    }

    #[test]
    fn check_streak_break_cases() {
        let today = date(2025, 1, 1);
        assert!(check_streak_break(None, today));
        assert!(!check_streak_break(Some(date(2024, 12, 31)), today));
        assert!(check_streak_break(Some(date(2024, 12, 30)), today));
        assert!(!check_streak_break(Some(today), today));
    }

    #[test]
    fn advance_streak_same_day_changes_nothing() {
        let stats = stats_with_streak(4, 9, Some(date(2025, 6, 10)));

        let step = advance_streak(&stats, noon(2025, 6, 10));

        assert_eq!(step.next, stats);
        assert_eq!(step.update.xp_earned, 0);
        assert!(step.entry.is_none());
    }

    #[test]
    fn advance_streak_builds_stats_and_entry_from_one_snapshot() {
        let stats = stats_with_streak(6, 6, Some(date(2025, 6, 9))).with_xp_added(40);

        let step = advance_streak(&stats, noon(2025, 6, 10));

        assert_eq!(step.next.total_xp, 70);
        assert_eq!(step.next.current_streak, 7);
        assert_eq!(step.next.longest_streak, 7);
        let entry = step.entry.unwrap();
        assert_eq!(entry.xp_earned, 30);
        assert_eq!(entry.metadata["streak"], 7);
    }

    #[test]
    fn weekly_score_weights() {
        assert_eq!(weekly_score(0, 0, 0), 0);
        assert_eq!(weekly_score(20, 3, 7), 100);
        assert_eq!(weekly_score(10, 0, 0), 20);
        assert_eq!(weekly_score(0, 1, 0), 13);
        assert_eq!(weekly_score(0, 0, 1), 3);
    }

    #[test]
    fn weekly_score_caps_task_and_project_terms() {
        assert_eq!(weekly_score(200, 30, 0), 80);
        assert_eq!(weekly_score(200, 30, 7), 100);
    }

    #[tokio::test]
    async fn first_activity_starts_streak_at_one() {
        let stats = GamificationStats::new(UserId::new());
        let user = stats.user_id;
        let (tracker, store) = setup(stats).await;

        let update = tracker.update_streak_at(user, noon(2025, 6, 10)).await.unwrap();

        assert_eq!(
            update,
            StreakUpdate {
                current_streak: 1,
                xp_earned: 5,
                streak_broken: true,
            }
        );
        let stats = store.get_stats(user).await.unwrap().unwrap();
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 1);
        assert_eq!(stats.total_xp, 5);
        assert_eq!(stats.last_activity_date, Some(date(2025, 6, 10)));
    }

    #[tokio::test]
    async fn consecutive_day_extends_streak() {
        let stats = stats_with_streak(3, 3, Some(date(2025, 6, 9)));
        let user = stats.user_id;
        let (tracker, _store) = setup(stats).await;

        let update = tracker.update_streak_at(user, noon(2025, 6, 10)).await.unwrap();

        assert_eq!(update.current_streak, 4);
        assert!(!update.streak_broken);
        assert_eq!(update.xp_earned, 5);
    }

    #[tokio::test]
    async fn seventh_day_earns_weekly_bonus() {
        let stats = stats_with_streak(6, 6, Some(date(2025, 6, 9)));
        let user = stats.user_id;
        let (tracker, store) = setup(stats).await;

        let update = tracker.update_streak_at(user, noon(2025, 6, 10)).await.unwrap();

        assert_eq!(update.current_streak, 7);
        assert_eq!(update.xp_earned, 30);
        let stats = store.get_stats(user).await.unwrap().unwrap();
        assert_eq!(stats.longest_streak, 7);
        assert_eq!(stats.total_xp, 30);
    }

    #[tokio::test]
    async fn gap_of_three_days_resets_streak() {
        let stats = stats_with_streak(12, 20, Some(date(2025, 6, 7)));
        let user = stats.user_id;
        let (tracker, store) = setup(stats).await;

        let update = tracker.update_streak_at(user, noon(2025, 6, 10)).await.unwrap();

        assert!(update.streak_broken);
        assert_eq!(update.current_streak, 1);
        let stats = store.get_stats(user).await.unwrap().unwrap();
        assert_eq!(stats.longest_streak, 20);
    }

    #[tokio::test]
    async fn second_update_same_day_is_noop() {
        let stats = GamificationStats::new(UserId::new());
        let user = stats.user_id;
        let (tracker, store) = setup(stats).await;

        let first = tracker.update_streak_at(user, noon(2025, 6, 10)).await.unwrap();
        let late = Utc.with_ymd_and_hms(2025, 6, 10, 23, 59, 0).unwrap();
        let second = tracker.update_streak_at(user, late).await.unwrap();

        assert_eq!(second.current_streak, first.current_streak);
        assert_eq!(second.xp_earned, 0);
        assert!(!second.streak_broken);
        assert_eq!(store.get_stats(user).await.unwrap().unwrap().total_xp, 5);
        assert_eq!(store.activities_for(user).await.len(), 1);
    }

    #[tokio::test]
    async fn streak_update_logs_activity_with_metadata() {
        let stats = stats_with_streak(1, 1, Some(date(2025, 6, 9)));
        let user = stats.user_id;
        let (tracker, store) = setup(stats).await;

        tracker.update_streak_at(user, noon(2025, 6, 10)).await.unwrap();

        let log = store.activities_for(user).await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].activity_type, ActivityType::StreakUpdated);
        assert_eq!(log[0].xp_earned, 5);
        assert_eq!(log[0].metadata["streak"], 2);
        assert_eq!(log[0].metadata["broken"], false);
    }

    #[tokio::test]
    async fn streak_update_recomputes_level() {
        let stats = stats_with_streak(0, 0, None).with_xp_added(98);
        let user = stats.user_id;
        let (tracker, store) = setup(stats).await;

        tracker.update_streak_at(user, noon(2025, 6, 10)).await.unwrap();

        let stats = store.get_stats(user).await.unwrap().unwrap();
        assert_eq!(stats.total_xp, 103);
        assert_eq!(stats.level, 2);
    }

    #[tokio::test]
    async fn update_for_unprovisioned_user_is_not_found() {
        let tracker = StreakTracker::new(Arc::new(MemoryStore::new()));
        let user = UserId::new();

        let err = tracker.update_streak_at(user, noon(2025, 6, 10)).await.unwrap_err();

        assert!(matches!(err, GamificationError::NotFound(id) if id == user));
    }

    #[tokio::test]
    async fn weekly_score_counts_only_last_seven_days() {
        let stats = GamificationStats::new(UserId::new());
        let user = stats.user_id;
        let (tracker, store) = setup(stats).await;
        let now = noon(2025, 6, 10);

        for hours_ago in [1, 30, 100] {
            store
                .append_activity(&ActivityLogEntry::new(
                    user,
                    ActivityType::TaskCompleted,
                    20,
                    now - Duration::hours(hours_ago),
                ))
                .await
                .unwrap();
        }
        store
            .append_activity(&ActivityLogEntry::new(
                user,
                ActivityType::ProjectCompleted,
                150,
                now - Duration::days(2),
            ))
            .await
            .unwrap();
        store
            .append_activity(&ActivityLogEntry::new(
                user,
                ActivityType::ProjectCompleted,
                150,
                now - Duration::days(8),
            ))
            .await
            .unwrap();
        for days_ago in 0..3 {
            store
                .append_activity(&ActivityLogEntry::new(
                    user,
                    ActivityType::StreakUpdated,
                    5,
                    now - Duration::days(days_ago),
                ))
                .await
                .unwrap();
        }

        // 3 tasks -> 6, 1 project -> 13.33, 3 streak days -> 8.57
        let score = tracker.calculate_weekly_score_at(user, now).await.unwrap();

        assert_eq!(score, 28);
    }

    #[tokio::test]
    async fn weekly_score_ignores_research_entries() {
        let stats = GamificationStats::new(UserId::new());
        let user = stats.user_id;
        let (tracker, store) = setup(stats).await;
        let now = noon(2025, 6, 10);
        store
            .append_activity(&ActivityLogEntry::new(
                user,
                ActivityType::ResearchCreated,
                5,
                now,
            ))
            .await
            .unwrap();

        assert_eq!(tracker.calculate_weekly_score_at(user, now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn streak_history_marks_active_days_oldest_first() {
        let stats = GamificationStats::new(UserId::new());
        let user = stats.user_id;
        let (tracker, store) = setup(stats).await;
        let now = noon(2025, 6, 10);

        for (day, hour) in [(10, 1), (8, 23), (8, 5), (3, 12), (1, 12)] {
            store
                .append_activity(&ActivityLogEntry::new(
                    user,
                    ActivityType::ResearchCreated,
                    5,
                    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap(),
                ))
                .await
                .unwrap();
        }

        let history = tracker.streak_history_at(user, 7, now).await.unwrap();

        assert_eq!(history.len(), 7);
        assert_eq!(history[0].date, date(2025, 6, 4));
        assert_eq!(history[6].date, date(2025, 6, 10));
        let active: Vec<_> = history
            .iter()
            .filter(|day| day.has_activity)
            .map(|day| day.date)
            .collect();
        assert_eq!(active, vec![date(2025, 6, 8), date(2025, 6, 10)]);
    }

    #[tokio::test]
    async fn streak_history_includes_midnight_of_first_day() {
        let stats = GamificationStats::new(UserId::new());
        let user = stats.user_id;
        let (tracker, store) = setup(stats).await;
        store
            .append_activity(&ActivityLogEntry::new(
                user,
                ActivityType::TaskCompleted,
                10,
                Utc.with_ymd_and_hms(2025, 6, 8, 0, 0, 0).unwrap(),
            ))
            .await
            .unwrap();

        let history = tracker
            .streak_history_at(user, 3, noon(2025, 6, 10))
            .await
            .unwrap();

        assert!(history[0].has_activity);
        assert_eq!(history[0].date, date(2025, 6, 8));
    }

    #[tokio::test]
    async fn streak_history_rejects_window_before_earliest_date() {
        let tracker = StreakTracker::new(Arc::new(MemoryStore::new()));

        let err = tracker
            .streak_history_at(UserId::new(), u32::MAX, noon(2025, 6, 10))
            .await
            .unwrap_err();

        assert!(matches!(err, GamificationError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn streak_history_of_zero_days_is_empty() {
        let tracker = StreakTracker::new(Arc::new(MemoryStore::new()));

        let history = tracker
            .streak_history_at(UserId::new(), 0, noon(2025, 6, 10))
            .await
            .unwrap();

        assert!(history.is_empty());
    }
}
