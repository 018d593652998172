//! In-memory GamificationStore implementation
//!
//! MemoryStore keeps stats in a map and the activity log in a Vec.
//! Thread-safe via RwLock.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{Error, GamificationStore, Result};
use crate::activity::{ActivityLogEntry, ActivityType};
use crate::stats::GamificationStats;
use crate::types::UserId;

/// In-memory implementation of GamificationStore
#[derive(Default)]
pub struct MemoryStore {
    stats: RwLock<HashMap<UserId, GamificationStats>>,
    activities: RwLock<Vec<ActivityLogEntry>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Every logged entry for a user, in insertion order
    pub async fn activities_for(&self, user_id: UserId) -> Vec<ActivityLogEntry> {
        self.activities
            .read()
            .await
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GamificationStore for MemoryStore {
    async fn create_stats(&self, stats: &GamificationStats) -> Result<()> {
        let mut all = self.stats.write().await;
        if all.contains_key(&stats.user_id) {
            return Err(Error::AlreadyExists(stats.user_id));
        }
        all.insert(stats.user_id, stats.clone());
        Ok(())
    }

    async fn get_stats(&self, user_id: UserId) -> Result<Option<GamificationStats>> {
        Ok(self.stats.read().await.get(&user_id).cloned())
    }

    async fn update_stats(
        &self,
        previous: &GamificationStats,
        next: &GamificationStats,
    ) -> Result<()> {
        let mut all = self.stats.write().await;
        match all.get_mut(&previous.user_id) {
            Some(current) if current == previous => {
                *current = next.clone();
                Ok(())
            }
            _ => Err(Error::Conflict(previous.user_id)),
        }
    }

    async fn append_activity(&self, entry: &ActivityLogEntry) -> Result<()> {
        self.activities.write().await.push(entry.clone());
        Ok(())
    }

    async fn commit_update(
        &self,
        previous: &GamificationStats,
        next: &GamificationStats,
        entries: &[ActivityLogEntry],
    ) -> Result<()> {
        let mut all = self.stats.write().await;
        let mut log = self.activities.write().await;
        match all.get_mut(&previous.user_id) {
            Some(current) if current == previous => {
                *current = next.clone();
                log.extend_from_slice(entries);
                Ok(())
            }
            _ => Err(Error::Conflict(previous.user_id)),
        }
    }

    async fn activities_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ActivityLogEntry>> {
        let mut entries: Vec<_> = self
            .activities
            .read()
            .await
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.created_at >= since)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.created_at);
        Ok(entries)
    }

    async fn count_activities(
        &self,
        user_id: UserId,
        activity_type: ActivityType,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64> {
        let count = self
            .activities
            .read()
            .await
            .iter()
            .filter(|entry| {
                entry.user_id == user_id
                    && entry.activity_type == activity_type
                    && since.is_none_or(|since| entry.created_at >= since)
            })
            .count();
        Ok(count as u64)
    }
}
