//! Substrate test utilities.

use depot_notifications::NotificationsStore;
use depot_store::{AdminStore, CollectionRegistry, MemorySubstrate, SqliteSubstrate, Substrate};
use std::sync::Arc;
use tempfile::TempDir;

/// A substrate with the depot and notification indexes created.
#[allow(dead_code)]
pub struct TestSubstrate {
    pub name: &'static str,
    pub substrate: Arc<dyn Substrate>,
    _temp_dir: Option<TempDir>,
}

impl TestSubstrate {
    pub async fn memory() -> Self {
        Self::prepared("memory", Arc::new(MemorySubstrate::new()), None).await
    }

    pub async fn sqlite() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let substrate = SqliteSubstrate::new(temp_dir.path().join("depot.db"), None)
            .await
            .expect("Failed to open sqlite substrate");
        Self::prepared("sqlite", Arc::new(substrate), Some(temp_dir)).await
    }

    async fn prepared(name: &'static str, substrate: Arc<dyn Substrate>, temp_dir: Option<TempDir>) -> Self {
        let mut registry = CollectionRegistry::depot();
        NotificationsStore::register(&mut registry);
        AdminStore::new(substrate.clone(), Arc::new(registry))
            .create_indexes()
            .await
            .expect("Failed to create indexes");
        Self {
            name,
            substrate,
            _temp_dir: temp_dir,
        }
    }

    pub fn substrate(&self) -> Arc<dyn Substrate> {
        self.substrate.clone()
    }
}

#[allow(dead_code)]
pub async fn all_backends() -> Vec<TestSubstrate> {
    vec![TestSubstrate::memory().await, TestSubstrate::sqlite().await]
}
