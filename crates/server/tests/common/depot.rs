//! Depot process test utilities.

use depot_core::config::{AppConfig, SubstrateConfig};
use depot_server::DepotState;
use tempfile::TempDir;

/// A bootstrapped depot over a temporary SQLite database.
pub struct TestDepot {
    pub state: DepotState,
    _temp_dir: TempDir,
}

impl TestDepot {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::for_testing()).await
    }

    pub async fn with_config(mut config: AppConfig) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        config.store.backend = SubstrateConfig::Sqlite {
            path: temp_dir.path().join("depot.db"),
            query_timeout_secs: Some(5),
        };
        let state = DepotState::open(config).await.expect("Failed to open depot");
        state.bootstrap().await.expect("Failed to create indexes");
        Self {
            state,
            _temp_dir: temp_dir,
        }
    }
}
