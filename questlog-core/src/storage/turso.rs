//! Turso/libSQL implementation of gamification storage.
//!
//! It can connect to:
//! - Remote Turso database (cloud)
//! - Local embedded SQLite file
//! - An in-memory database (tests)

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use libsql::{Builder, Connection, Database};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::{Error, GamificationStore, Result};
use crate::activity::{ActivityLogEntry, ActivityType, Metadata};
use crate::stats::GamificationStats;
use crate::types::{ActivityId, UserId};

/// SQL schema for the per-user stats table.
const SCHEMA_STATS: &str = r#"
CREATE TABLE IF NOT EXISTS gamification_stats (
    user_id TEXT PRIMARY KEY,
    total_xp INTEGER NOT NULL DEFAULT 0,
    level INTEGER NOT NULL DEFAULT 1,
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    last_activity_date TEXT
)
"#;

/// SQL schema for the append-only activity log.
const SCHEMA_ACTIVITY_LOG: &str = r#"
CREATE TABLE IF NOT EXISTS activity_log (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    activity_type TEXT NOT NULL,
    xp_earned INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    metadata TEXT NOT NULL
)
"#;

/// SQL index for windowed activity queries.
const INDEX_ACTIVITY_LOG: &str = r#"
CREATE INDEX IF NOT EXISTS idx_activity_log_user_time
ON activity_log(user_id, created_at)
"#;

const SELECT_STATS: &str = "SELECT user_id, total_xp, level, current_streak, longest_streak, last_activity_date FROM gamification_stats";

const SELECT_ACTIVITY: &str =
    "SELECT id, user_id, activity_type, xp_earned, created_at, metadata FROM activity_log";

/// Turso-backed gamification storage.
///
/// All writes go through one connection and are serialized by `write`,
/// so a transaction never picks up another task's statements.
#[derive(Clone)]
pub struct TursoStore {
    _db: Arc<Database>,
    conn: Connection,
    write: Arc<Mutex<()>>,
}

impl TursoStore {
    /// Create a new store backed by a local embedded database file.
    pub async fn new_local(path: &Path) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        Self::from_database(db).await
    }

    /// Create a new store connected to a remote Turso database.
    pub async fn new_remote(url: &str, token: &str) -> Result<Self> {
        let db = Builder::new_remote(url.to_string(), token.to_string())
            .build()
            .await?;
        Self::from_database(db).await
    }

    /// Create a new in-memory store (for testing).
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db.connect()?;
        let store = Self {
            _db: Arc::new(db),
            conn,
            write: Arc::new(Mutex::new(())),
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Ensure the database schema exists.
    async fn ensure_schema(&self) -> Result<()> {
        self.conn.execute(SCHEMA_STATS, ()).await?;
        self.conn.execute(SCHEMA_ACTIVITY_LOG, ()).await?;
        self.conn.execute(INDEX_ACTIVITY_LOG, ()).await?;
        Ok(())
    }

    /// Parse stats from a database row.
    fn parse_stats(row: &libsql::Row) -> Result<GamificationStats> {
        let user_id_str: String = row.get(0)?;
        let total_xp: i64 = row.get(1)?;
        let level: i64 = row.get(2)?;
        let current_streak: i64 = row.get(3)?;
        let longest_streak: i64 = row.get(4)?;
        let last_activity_str: Option<String> = row.get(5)?;

        Ok(GamificationStats {
            user_id: parse_user_id(&user_id_str)?,
            total_xp: to_unsigned(total_xp, "total_xp")?,
            level: to_unsigned(level, "level")?,
            current_streak: to_unsigned(current_streak, "current_streak")?,
            longest_streak: to_unsigned(longest_streak, "longest_streak")?,
            last_activity_date: last_activity_str
                .as_deref()
                .map(parse_date)
                .transpose()?,
        })
    }

    /// Parse an activity log entry from a database row.
    fn parse_activity(row: &libsql::Row) -> Result<ActivityLogEntry> {
        let id_str: String = row.get(0)?;
        let user_id_str: String = row.get(1)?;
        let type_str: String = row.get(2)?;
        let xp_earned: i64 = row.get(3)?;
        let created_at_str: String = row.get(4)?;
        let metadata_json: String = row.get(5)?;

        let id = ActivityId(
            id_str
                .parse()
                .map_err(|_| Error::InvalidData(format!("invalid activity id: {}", id_str)))?,
        );
        let activity_type = ActivityType::parse(&type_str)
            .ok_or_else(|| Error::InvalidData(format!("invalid activity type: {}", type_str)))?;
        let metadata: Metadata = serde_json::from_str(&metadata_json)?;

        Ok(ActivityLogEntry {
            id,
            user_id: parse_user_id(&user_id_str)?,
            activity_type,
            xp_earned: to_unsigned(xp_earned, "xp_earned")?,
            created_at: parse_datetime(&created_at_str)?,
            metadata,
        })
    }
}

#[async_trait]
impl GamificationStore for TursoStore {
    #[instrument(skip(self, stats), fields(user_id = %stats.user_id), level = "debug")]
    async fn create_stats(&self, stats: &GamificationStats) -> Result<()> {
        let _write = self.write.lock().await;
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO gamification_stats (user_id, total_xp, level, current_streak, longest_streak, last_activity_date) VALUES (?, ?, ?, ?, ?, ?)",
                libsql::params![
                    stats.user_id.to_string(),
                    to_signed(stats.total_xp)?,
                    i64::from(stats.level),
                    i64::from(stats.current_streak),
                    i64::from(stats.longest_streak),
                    stats.last_activity_date.map(format_date)
                ],
            )
            .await?;

        if inserted == 0 {
            return Err(Error::AlreadyExists(stats.user_id));
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_stats(&self, user_id: UserId) -> Result<Option<GamificationStats>> {
        let mut rows = self
            .conn
            .query(
                &format!("{SELECT_STATS} WHERE user_id = ?"),
                [user_id.to_string()],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::parse_stats(&row)?))
        } else {
            Ok(None)
        }
    }

    #[instrument(skip(self, previous, next), fields(user_id = %previous.user_id), level = "debug")]
    async fn update_stats(
        &self,
        previous: &GamificationStats,
        next: &GamificationStats,
    ) -> Result<()> {
        let _write = self.write.lock().await;
        update_stats_on(&self.conn, previous, next).await
    }

    #[instrument(skip(self, entry), fields(user_id = %entry.user_id, activity = entry.activity_type.as_str()), level = "debug")]
    async fn append_activity(&self, entry: &ActivityLogEntry) -> Result<()> {
        let _write = self.write.lock().await;
        insert_activity_on(&self.conn, entry).await
    }

    #[instrument(skip(self, previous, next, entries), fields(user_id = %previous.user_id, entries = entries.len()), level = "debug")]
    async fn commit_update(
        &self,
        previous: &GamificationStats,
        next: &GamificationStats,
        entries: &[ActivityLogEntry],
    ) -> Result<()> {
        let _write = self.write.lock().await;
        let tx = self.conn.transaction().await?;

        let applied = async {
            update_stats_on(&tx, previous, next).await?;
            for entry in entries {
                insert_activity_on(&tx, entry).await?;
            }
            Ok::<_, Error>(())
        }
        .await;

        match applied {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(user_id = %previous.user_id, error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn activities_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ActivityLogEntry>> {
        let mut rows = self
            .conn
            .query(
                &format!("{SELECT_ACTIVITY} WHERE user_id = ? AND created_at >= ? ORDER BY created_at ASC"),
                libsql::params![user_id.to_string(), format_datetime(since)],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_activity(&row)?);
        }
        Ok(entries)
    }

    #[instrument(skip(self), level = "debug")]
    async fn count_activities(
        &self,
        user_id: UserId,
        activity_type: ActivityType,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64> {
        let mut rows = match since {
            Some(since) => {
                self.conn
                    .query(
                        "SELECT COUNT(*) FROM activity_log WHERE user_id = ? AND activity_type = ? AND created_at >= ?",
                        libsql::params![
                            user_id.to_string(),
                            activity_type.as_str(),
                            format_datetime(since)
                        ],
                    )
                    .await?
            }
            None => {
                self.conn
                    .query(
                        "SELECT COUNT(*) FROM activity_log WHERE user_id = ? AND activity_type = ?",
                        libsql::params![user_id.to_string(), activity_type.as_str()],
                    )
                    .await?
            }
        };

        match rows.next().await? {
            Some(row) => {
                let count: i64 = row.get(0)?;
                to_unsigned(count, "count")
            }
            None => Ok(0),
        }
    }
}

/// Conditional stats update on `conn`.
async fn update_stats_on(
    conn: &Connection,
    previous: &GamificationStats,
    next: &GamificationStats,
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE gamification_stats SET total_xp = ?, level = ?, current_streak = ?, longest_streak = ?, last_activity_date = ? \
             WHERE user_id = ? AND total_xp = ? AND current_streak = ? AND longest_streak = ? AND last_activity_date IS ?",
            libsql::params![
                to_signed(next.total_xp)?,
                i64::from(next.level),
                i64::from(next.current_streak),
                i64::from(next.longest_streak),
                next.last_activity_date.map(format_date),
                previous.user_id.to_string(),
                to_signed(previous.total_xp)?,
                i64::from(previous.current_streak),
                i64::from(previous.longest_streak),
                previous.last_activity_date.map(format_date)
            ],
        )
        .await?;

    if updated == 0 {
        debug!(user_id = %previous.user_id, "stats changed since read");
        return Err(Error::Conflict(previous.user_id));
    }
    Ok(())
}

async fn insert_activity_on(conn: &Connection, entry: &ActivityLogEntry) -> Result<()> {
    let metadata_json = serde_json::to_string(&entry.metadata)?;
    conn.execute(
        "INSERT INTO activity_log (id, user_id, activity_type, xp_earned, created_at, metadata) VALUES (?, ?, ?, ?, ?, ?)",
        libsql::params![
            entry.id.0.to_string(),
            entry.user_id.to_string(),
            entry.activity_type.as_str(),
            i64::from(entry.xp_earned),
            format_datetime(entry.created_at),
            metadata_json
        ],
    )
    .await?;
    Ok(())
}

/// Format a timestamp for storage.
///
/// Fixed-width UTC so that string comparison in SQL orders by time.
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp from storage.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::InvalidData(format!("invalid datetime: {}", s)))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::InvalidData(format!("invalid date: {}", s)))
}

fn parse_user_id(s: &str) -> Result<UserId> {
    s.parse()
        .map(UserId)
        .map_err(|_| Error::InvalidData(format!("invalid user id: {}", s)))
}

fn to_signed(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::InvalidData(format!("value out of range: {}", value)))
}

fn to_unsigned<T: TryFrom<i64>>(value: i64, column: &str) -> Result<T> {
    T::try_from(value).map_err(|_| Error::InvalidData(format!("invalid {}: {}", column, value)))
}
