//! The append-only activity log.
//!
//! Every XP-earning or streak-relevant action appends one entry. The log
//! is the system of record for weekly scoring and streak history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{ActivityId, UserId};

/// Free-form context attached to a log entry.
pub type Metadata = Map<String, Value>;

/// Kind of logged activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    TaskCompleted,
    ProjectCompleted,
    ResearchCreated,
    StreakUpdated,
}

impl ActivityType {
    /// Convert to database string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskCompleted => "task_completed",
            Self::ProjectCompleted => "project_completed",
            Self::ResearchCreated => "research_created",
            Self::StreakUpdated => "streak_updated",
        }
    }

    /// Parse from database string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "task_completed" => Some(Self::TaskCompleted),
            "project_completed" => Some(Self::ProjectCompleted),
            "research_created" => Some(Self::ResearchCreated),
            "streak_updated" => Some(Self::StreakUpdated),
            _ => None,
        }
    }
}

/// A single immutable log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: ActivityId,
    pub user_id: UserId,
    pub activity_type: ActivityType,
    pub xp_earned: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ActivityLogEntry {
    /// Create an entry stamped at `created_at`.
    #[must_use]
    pub fn new(
        user_id: UserId,
        activity_type: ActivityType,
        xp_earned: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActivityId::new(),
            user_id,
            activity_type,
            xp_earned,
            created_at,
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata field.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}
