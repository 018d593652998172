//! Error types for questlog-core

use thiserror::Error;

use crate::storage;
use crate::types::UserId;

/// Result type for gamification operations.
pub type Result<T> = std::result::Result<T, GamificationError>;

/// Top-level error type for the gamification engine.
#[derive(Debug, Error)]
pub enum GamificationError {
    /// Malformed input to a calculator, such as an unknown priority.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The user has no provisioned gamification stats.
    #[error("gamification stats not found for user {0}")]
    NotFound(UserId),

    /// The persistence collaborator failed. Never retried here.
    #[error("storage error: {0}")]
    Storage(#[from] storage::Error),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
