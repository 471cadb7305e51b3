//! Process-wide state shared by the workers and the admin commands.

use anyhow::{Context, Result};
use depot_core::config::AppConfig;
use depot_notifications::{NotificationsManager, NotificationsStore, VersionRegistrar};
use depot_store::repos::{QueryMetricsRepo, ScheduleInstancesRepo, SchedulesRepo};
use depot_store::{AdminStore, CollectionRegistry, Substrate};
use std::sync::Arc;

/// Every collection the depot process manages.
pub fn collection_registry() -> CollectionRegistry {
    let mut registry = CollectionRegistry::depot();
    NotificationsStore::register(&mut registry);
    registry
}

/// Handles onto the substrate, built once at startup.
#[derive(Clone)]
pub struct DepotState {
    pub config: AppConfig,
    pub substrate: Arc<dyn Substrate>,
    pub admin: AdminStore,
    pub notifications: NotificationsManager,
    pub metrics: QueryMetricsRepo,
    pub schedules: SchedulesRepo,
    pub schedule_instances: ScheduleInstancesRepo,
}

impl DepotState {
    /// Open the configured substrate and build the repositories over it.
    pub async fn open(config: AppConfig) -> Result<Self> {
        let substrate = depot_store::from_config(&config.store)
            .await
            .context("failed to initialize store")?;
        substrate
            .health_check()
            .await
            .context("store health check failed")?;
        Ok(Self::with_substrate(config, substrate))
    }

    pub fn with_substrate(config: AppConfig, substrate: Arc<dyn Substrate>) -> Self {
        let handler = Arc::new(VersionRegistrar::new(substrate.clone()));
        Self {
            admin: AdminStore::new(substrate.clone(), Arc::new(collection_registry())),
            notifications: NotificationsManager::new(substrate.clone(), handler),
            metrics: QueryMetricsRepo::new(substrate.clone()),
            schedules: SchedulesRepo::new(substrate.clone()),
            schedule_instances: ScheduleInstancesRepo::new(substrate.clone()),
            substrate,
            config,
        }
    }

    /// Create any missing index.
    pub async fn bootstrap(&self) -> Result<Vec<String>> {
        self.admin
            .create_indexes()
            .await
            .context("failed to create indexes")
    }

    /// Purge expired notification history and collapse query metrics.
    pub async fn housekeep(&self) -> Result<HousekeepingReport> {
        let notifications = self
            .notifications
            .delete_old_notifications(self.config.housekeeping.retention_days)
            .await
            .context("failed to purge notification history")?;
        let metrics = self
            .metrics
            .consolidate_all()
            .await
            .context("failed to consolidate query metrics")?;
        Ok(HousekeepingReport {
            notifications,
            metrics,
        })
    }
}

/// Rows removed by one housekeeping pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HousekeepingReport {
    pub notifications: u64,
    pub metrics: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_includes_notifications() {
        let registry = collection_registry();
        assert_eq!(registry.len(), 11);
        assert!(registry.get("notifications").is_some());
        assert!(registry.get("notifications_queue").is_some());
        assert!(registry.get("query-metrics").is_some());
    }

    #[tokio::test]
    async fn test_bootstrap_and_housekeep() {
        let state = DepotState::open(AppConfig::for_testing()).await.unwrap();
        let indexes = state.bootstrap().await.unwrap();
        assert_eq!(indexes.len(), 11);
        assert_eq!(state.bootstrap().await.unwrap(), indexes);

        state.metrics.record("org.finos", "sample", "1.0.0").await.unwrap();
        let report = state.housekeep().await.unwrap();
        assert_eq!(report, HousekeepingReport::default());
    }
}
