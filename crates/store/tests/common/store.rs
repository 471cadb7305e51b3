//! Substrate test utilities.

use depot_store::{AdminStore, CollectionRegistry, MemorySubstrate, SqliteSubstrate, StoreResult, Substrate};
use std::sync::Arc;
use tempfile::TempDir;

/// A substrate with every depot index created. The SQLite file is removed on drop.
#[allow(dead_code)]
pub struct TestStore {
    pub name: &'static str,
    pub substrate: Arc<dyn Substrate>,
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// In-memory substrate.
    pub async fn memory() -> StoreResult<Self> {
        Self::prepared("memory", Arc::new(MemorySubstrate::new()), None).await
    }

    /// SQLite substrate in a temporary directory.
    pub async fn sqlite() -> StoreResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let substrate = SqliteSubstrate::new(temp_dir.path().join("depot.db"), None).await?;
        Self::prepared("sqlite", Arc::new(substrate), Some(temp_dir)).await
    }

    async fn prepared(
        name: &'static str,
        substrate: Arc<dyn Substrate>,
        temp_dir: Option<TempDir>,
    ) -> StoreResult<Self> {
        AdminStore::new(substrate.clone(), Arc::new(CollectionRegistry::depot()))
            .create_indexes()
            .await?;
        Ok(Self {
            name,
            substrate,
            _temp_dir: temp_dir,
        })
    }

    pub fn substrate(&self) -> Arc<dyn Substrate> {
        self.substrate.clone()
    }
}

/// One prepared store per backend.
#[allow(dead_code)]
pub async fn all_backends() -> Vec<TestStore> {
    vec![
        TestStore::memory().await.expect("Failed to create memory store"),
        TestStore::sqlite().await.expect("Failed to create sqlite store"),
    ]
}
