//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Document substrate configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SubstrateConfig {
    /// Process-local in-memory substrate. Contents are lost on exit.
    Memory,
    /// SQLite-backed substrate.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Query timeout in seconds (advisory only - SQLite cannot force-cancel queries).
        /// Logs warnings for statements exceeding this duration.
        #[serde(default = "default_sqlite_query_timeout_secs")]
        query_timeout_secs: Option<u64>,
    },
}

fn default_sqlite_query_timeout_secs() -> Option<u64> {
    Some(30)
}

impl Default for SubstrateConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/depot.db"),
            query_timeout_secs: default_sqlite_query_timeout_secs(),
        }
    }
}

/// Store configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Substrate backend.
    #[serde(default)]
    pub backend: SubstrateConfig,
    /// Log every substrate call at debug level.
    #[serde(default)]
    pub tracing: bool,
}

impl StoreConfig {
    /// Validate store configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match &self.backend {
            SubstrateConfig::Memory => Ok(()),
            SubstrateConfig::Sqlite {
                path,
                query_timeout_secs,
            } => {
                if path.as_os_str().is_empty() {
                    return Err("store.backend.path cannot be empty".to_string());
                }
                if *query_timeout_secs == Some(0) {
                    return Err("store.backend.query_timeout_secs cannot be 0".to_string());
                }
                Ok(())
            }
        }
    }
}

/// Notification queue worker configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Number of queue observers. Must be positive.
    #[serde(default = "default_queue_workers")]
    pub workers: i64,
    /// Delay in seconds before the first poll.
    #[serde(default = "default_queue_delay_secs")]
    pub delay_secs: u64,
    /// Interval in seconds between polls.
    #[serde(default = "default_queue_interval_secs")]
    pub interval_secs: u64,
}

fn default_queue_workers() -> i64 {
    1
}

fn default_queue_delay_secs() -> u64 {
    60
}

fn default_queue_interval_secs() -> u64 {
    5
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: default_queue_workers(),
            delay_secs: default_queue_delay_secs(),
            interval_secs: default_queue_interval_secs(),
        }
    }
}

impl QueueConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Worker count as a usize. Only meaningful after `validate` succeeded.
    pub fn worker_count(&self) -> usize {
        usize::try_from(self.workers).unwrap_or(0)
    }

    /// Validate queue configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.workers <= 0 {
            return Err(format!(
                "queue.workers must be greater than 0, got {}",
                self.workers
            ));
        }
        // tokio::time::interval panics on a zero period
        if self.interval_secs == 0 {
            return Err("queue.interval_secs cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Notification history retention configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HousekeepingConfig {
    /// History records older than this many days are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Interval in seconds between purges.
    #[serde(default = "default_housekeeping_interval_secs")]
    pub interval_secs: u64,
    /// Delay in seconds before the first purge.
    #[serde(default = "default_housekeeping_delay_secs")]
    pub delay_secs: u64,
}

fn default_retention_days() -> u32 {
    120
}

fn default_housekeeping_interval_secs() -> u64 {
    3600 // 1 hour
}

fn default_housekeeping_delay_secs() -> u64 {
    60
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            interval_secs: default_housekeeping_interval_secs(),
            delay_secs: default_housekeeping_delay_secs(),
        }
    }
}

impl HousekeepingConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.interval_secs == 0 {
            return Err("housekeeping.interval_secs cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Queue worker configuration.
    #[serde(default)]
    pub queue: QueueConfig,
    /// History retention configuration.
    #[serde(default)]
    pub housekeeping: HousekeepingConfig,
}

impl AppConfig {
    /// Create a test configuration backed by the in-memory substrate.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            store: StoreConfig {
                backend: SubstrateConfig::Memory,
                tracing: false,
            },
            queue: QueueConfig::default(),
            housekeeping: HousekeepingConfig::default(),
        }
    }

    /// Validate every section, failing on the first invalid one.
    pub fn validate(&self) -> Result<(), String> {
        self.store.validate()?;
        self.queue.validate()?;
        self.housekeeping.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_housekeeping_defaults() {
        let config = HousekeepingConfig::default();
        assert_eq!(config.retention_days, 120);
        assert_eq!(config.interval(), Duration::from_secs(3600));
        assert_eq!(config.delay(), Duration::from_secs(60));
    }

    #[test]
    fn test_queue_workers_must_be_positive() {
        let mut config = QueueConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_count(), 1);

        config.workers = 0;
        assert!(config.validate().is_err());

        config.workers = -3;
        let err = config.validate().unwrap_err();
        assert!(err.contains("-3"), "error should name the bad value: {err}");
    }

    #[test]
    fn test_queue_interval_cannot_be_zero() {
        let config = QueueConfig {
            interval_secs: 0,
            ..QueueConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_substrate_config_tagged_by_type() {
        let json = r#"{"type": "sqlite", "path": "/tmp/depot.db"}"#;
        let config: SubstrateConfig = serde_json::from_str(json).unwrap();
        match config {
            SubstrateConfig::Sqlite {
                path,
                query_timeout_secs,
            } => {
                assert_eq!(path, PathBuf::from("/tmp/depot.db"));
                assert_eq!(query_timeout_secs, Some(30));
            }
            SubstrateConfig::Memory => panic!("expected sqlite config"),
        }

        let config: SubstrateConfig = serde_json::from_str(r#"{"type": "memory"}"#).unwrap();
        assert!(matches!(config, SubstrateConfig::Memory));
    }

    #[test]
    fn test_app_config_deserializes_from_empty_document() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert!(!config.store.tracing);
        assert_eq!(config.queue.workers, 1);
    }

    #[test]
    fn test_for_testing_uses_memory_substrate() {
        let config = AppConfig::for_testing();
        assert!(matches!(config.store.backend, SubstrateConfig::Memory));
        assert!(config.validate().is_ok());
    }
}
