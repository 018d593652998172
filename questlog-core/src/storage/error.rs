//! Error types for gamification storage.

use thiserror::Error;

use crate::types::UserId;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database error from libSQL.
    #[error("database error: {0}")]
    Database(#[from] libsql::Error),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error preparing a local database.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid data in the database.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Stats changed between read and conditional write.
    #[error("concurrent update of gamification stats for user {0}")]
    Conflict(UserId),

    /// Stats were already provisioned for this user.
    #[error("gamification stats already exist for user {0}")]
    AlreadyExists(UserId),
}
