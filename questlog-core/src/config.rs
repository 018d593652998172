//! Configuration for the gamification engine
//!
//! ```toml
//! history_days = 30
//!
//! [storage]
//! backend = "local"
//! path = "/var/lib/questlog/questlog.db"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::storage::{self, GamificationStore, MemoryStore, TursoStore};
use crate::streak::DEFAULT_HISTORY_DAYS;

/// Top-level questlog configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestlogConfig {
    /// Where stats and the activity log live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Days returned by the streak history view
    #[serde(default = "default_history_days")]
    pub history_days: u32,
}

fn default_history_days() -> u32 {
    DEFAULT_HISTORY_DAYS
}

impl Default for QuestlogConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }
}

impl QuestlogConfig {
    /// Load and validate the config file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load the user config file, falling back to defaults when it is absent
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = questlog_paths::default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.history_days == 0 {
            return Err(ConfigError::Invalid(
                "history_days must be greater than zero".to_string(),
            ));
        }
        if let StorageConfig::Remote { url, .. } = &self.storage
            && url.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "storage.url is required for the remote backend".to_string(),
            ));
        }
        Ok(())
    }
}

/// Storage backend selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-process store, lost on exit
    Memory,

    /// libSQL database file
    Local {
        /// Defaults to `questlog.db` in the data directory
        #[serde(default)]
        path: Option<PathBuf>,
    },

    /// Remote Turso database
    Remote {
        url: String,
        #[serde(default)]
        token: String,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local { path: None }
    }
}

impl StorageConfig {
    /// Path of the local database file, if this is the local backend
    pub fn database_path(&self) -> Option<PathBuf> {
        match self {
            Self::Local { path } => Some(
                path.clone()
                    .unwrap_or_else(questlog_paths::default_database_path),
            ),
            _ => None,
        }
    }

    /// Open the configured store
    pub async fn open(&self) -> storage::Result<Arc<dyn GamificationStore>> {
        match self {
            Self::Memory => {
                info!("using in-memory gamification store");
                Ok(Arc::new(MemoryStore::new()))
            }
            Self::Local { path } => {
                let path = path
                    .clone()
                    .unwrap_or_else(questlog_paths::default_database_path);
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(parent)?;
                }
                info!(path = %path.display(), "opening local gamification store");
                Ok(Arc::new(TursoStore::new_local(&path).await?))
            }
            Self::Remote { url, token } => {
                info!(%url, "opening remote gamification store");
                Ok(Arc::new(TursoStore::new_remote(url, token).await?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::GamificationStats;
    use crate::types::UserId;

    #[test]
    fn test_default_config() {
        let config = QuestlogConfig::default();
        assert_eq!(config.history_days, 30);
        assert_eq!(config.storage, StorageConfig::Local { path: None });
    }

    #[test]
    fn test_deserialize_toml_defaults() {
        let config = QuestlogConfig::from_toml_str("").unwrap();
        assert_eq!(config, QuestlogConfig::default());
    }

    #[test]
    fn test_deserialize_local_backend() {
        let toml = r#"
            history_days = 14

            [storage]
            backend = "local"
            path = "/tmp/questlog/test.db"
        "#;
        let config = QuestlogConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.history_days, 14);
        assert_eq!(
            config.storage.database_path(),
            Some(PathBuf::from("/tmp/questlog/test.db"))
        );
    }

    #[test]
    fn test_deserialize_remote_backend() {
        let toml = r#"
            [storage]
            backend = "remote"
            url = "libsql://questlog.turso.io"
            token = "secret"
        "#;
        let config = QuestlogConfig::from_toml_str(toml).unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::Remote {
                url: "libsql://questlog.turso.io".to_string(),
                token: "secret".to_string(),
            }
        );
        assert_eq!(config.storage.database_path(), None);
    }

    #[test]
    fn test_local_without_path_uses_data_dir() {
        let config = QuestlogConfig::from_toml_str("[storage]\nbackend = \"local\"").unwrap();
        assert_eq!(
            config.storage.database_path(),
            Some(questlog_paths::default_database_path())
        );
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let err = QuestlogConfig::from_toml_str("[storage]\nbackend = \"postgres\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_zero_history_days() {
        let err = QuestlogConfig::from_toml_str("history_days = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_empty_remote_url() {
        let toml = r#"
            [storage]
            backend = "remote"
            url = " "
        "#;
        let err = QuestlogConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "history_days = 7\n[storage]\nbackend = \"memory\"\n").unwrap();

        let config = QuestlogConfig::load(&path).unwrap();

        assert_eq!(config.history_days, 7);
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = QuestlogConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[tokio::test]
    async fn test_open_local_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("questlog.db");
        let config = StorageConfig::Local {
            path: Some(path.clone()),
        };

        let store = config.open().await.unwrap();
        let stats = GamificationStats::new(UserId::new());
        store.create_stats(&stats).await.unwrap();

        assert!(path.exists());
        assert_eq!(store.get_stats(stats.user_id).await.unwrap(), Some(stats));
    }

    #[tokio::test]
    async fn test_open_memory() {
        let store = StorageConfig::Memory.open().await.unwrap();
        assert_eq!(store.get_stats(UserId::new()).await.unwrap(), None);
    }
}
