//! Event processing.

use crate::error::NotificationResult;
use async_trait::async_trait;
use depot_core::version::VersionId;
use depot_core::{MetadataNotification, RefreshStatus, StoreProjectData, StoreProjectVersionData};
use depot_store::StoreError;
use depot_store::repos::{ProjectVersionsRepo, ProjectsRepo, RefreshStatusRepo};
use depot_store::substrate::Substrate;
use std::sync::Arc;

/// Processes claimed events.
///
/// Returns the errors the event produced; an empty list means success. An
/// `Err` is reserved for failures of the depot itself and is recorded on the
/// event the same way.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn handle(&self, event: &MetadataNotification) -> NotificationResult<Vec<String>>;
}

/// Records the version named by an event against its registered project.
///
/// The version is marked as refreshing for the duration of the update, so a
/// second event for the same version arriving meanwhile is reported instead
/// of applied twice.
#[derive(Clone)]
pub struct VersionRegistrar {
    projects: ProjectsRepo,
    versions: ProjectVersionsRepo,
    refresh: RefreshStatusRepo,
}

impl VersionRegistrar {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            projects: ProjectsRepo::new(substrate.clone()),
            versions: ProjectVersionsRepo::new(substrate.clone()),
            refresh: RefreshStatusRepo::new(substrate),
        }
    }

    async fn register(&self, event: &MetadataNotification) -> NotificationResult<Vec<String>> {
        let Some(project) = self.projects.find(&event.group_id, &event.artifact_id).await? else {
            return Ok(vec![format!(
                "No Project with coordinates {}-{} found",
                event.group_id, event.artifact_id
            )]);
        };

        let version = StoreProjectVersionData::new(&event.group_id, &event.artifact_id, &event.version_id);
        self.versions.create_or_update(&version).await?;

        if let Some(latest) = newer_release(&project, &event.version_id) {
            let mut updated = project;
            updated.latest_version = Some(latest.to_string());
            self.projects.create_or_update(&updated).await?;
        }
        Ok(Vec::new())
    }
}

// The event version, if it is a release newer than the project's latest.
fn newer_release(project: &StoreProjectData, version_id: &str) -> Option<VersionId> {
    let candidate: VersionId = version_id.parse().ok()?;
    let current = project
        .latest_version
        .as_deref()
        .and_then(|v| v.parse::<VersionId>().ok());
    match current {
        Some(current) if current >= candidate => None,
        _ => Some(candidate),
    }
}

#[async_trait]
impl NotificationHandler for VersionRegistrar {
    async fn handle(&self, event: &MetadataNotification) -> NotificationResult<Vec<String>> {
        let status = RefreshStatus::new(&event.group_id, &event.artifact_id, &event.version_id)
            .with_events(event.event_id.clone(), event.parent_event_id.clone());
        match self.refresh.insert(&status).await {
            Ok(_) => {}
            Err(StoreError::Conflict(_)) => {
                return Ok(vec![format!("{} is already being refreshed", event.coordinate())]);
            }
            Err(e) => return Err(e.into()),
        }

        let result = self.register(event).await;
        self.refresh
            .delete(&event.group_id, &event.artifact_id, &event.version_id)
            .await?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_store::{AdminStore, CollectionRegistry, MemorySubstrate};

    async fn substrate() -> Arc<dyn Substrate> {
        let substrate: Arc<dyn Substrate> = Arc::new(MemorySubstrate::new());
        AdminStore::new(substrate.clone(), Arc::new(CollectionRegistry::depot()))
            .create_indexes()
            .await
            .unwrap();
        substrate
    }

    #[test]
    fn test_newer_release() {
        let mut project = StoreProjectData::new("PROD-1", "g", "a");
        assert_eq!(newer_release(&project, "1.0.0"), Some(VersionId::new(1, 0, 0)));
        assert_eq!(newer_release(&project, "master-SNAPSHOT"), None);

        project.latest_version = Some("1.2.0".to_string());
        assert_eq!(newer_release(&project, "1.1.9"), None);
        assert_eq!(newer_release(&project, "1.2.0"), None);
        assert_eq!(newer_release(&project, "1.10.0"), Some(VersionId::new(1, 10, 0)));
    }

    #[tokio::test]
    async fn test_registers_version_of_known_project() {
        let substrate = substrate().await;
        let projects = ProjectsRepo::new(substrate.clone());
        projects
            .create_or_update(&StoreProjectData::new("PROD-1", "org.finos", "sample"))
            .await
            .unwrap();

        let registrar = VersionRegistrar::new(substrate.clone());
        let errors = registrar
            .handle(&MetadataNotification::new("org.finos", "sample", "2.0.0"))
            .await
            .unwrap();
        assert!(errors.is_empty(), "{errors:?}");

        let versions = ProjectVersionsRepo::new(substrate.clone());
        assert!(versions.find_version("org.finos", "sample", "2.0.0").await.unwrap().is_some());
        let project = projects.find("org.finos", "sample").await.unwrap().unwrap();
        assert_eq!(project.latest_version.as_deref(), Some("2.0.0"));

        // refresh marker is released
        let refresh = RefreshStatusRepo::new(substrate);
        assert!(refresh.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_project_is_reported() {
        let substrate = substrate().await;
        let registrar = VersionRegistrar::new(substrate.clone());
        let errors = registrar
            .handle(&MetadataNotification::new("org.finos", "missing", "1.0.0"))
            .await
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("org.finos-missing"));
        assert!(RefreshStatusRepo::new(substrate).get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_in_progress_is_reported() {
        let substrate = substrate().await;
        RefreshStatusRepo::new(substrate.clone())
            .insert(&RefreshStatus::new("org.finos", "sample", "1.0.0"))
            .await
            .unwrap();

        let errors = VersionRegistrar::new(substrate)
            .handle(&MetadataNotification::new("org.finos", "sample", "1.0.0"))
            .await
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("already being refreshed"));
    }
}
