//! Project registrations.

use crate::engine::{Collection, DocumentStore};
use crate::error::{StoreError, StoreResult};
use crate::query::{self, QueryBuilder, fields};
use crate::substrate::{SchemaField, Substrate};
use depot_core::StoreProjectData;
use std::sync::Arc;

pub const COLLECTION: &str = "project-configurations";
pub const PROJECT_ID: &str = "projectId";

/// Collection strategy for [`StoreProjectData`].
pub struct Projects;

impl Collection for Projects {
    type Record = StoreProjectData;
    const NAME: &'static str = COLLECTION;

    fn schema() -> Vec<SchemaField> {
        vec![
            SchemaField::sortable_tag(fields::GROUP_ID),
            SchemaField::sortable_tag(fields::ARTIFACT_ID),
            SchemaField::sortable_tag(PROJECT_ID),
        ]
    }

    fn key(project: &StoreProjectData) -> String {
        query::compound_key(&[COLLECTION, &project.group_id, &project.artifact_id])
    }

    fn key_filter(project: &StoreProjectData) -> QueryBuilder {
        QueryBuilder::new().artifact(&project.group_id, &project.artifact_id)
    }

    fn validate_new_data(project: &StoreProjectData) -> StoreResult<()> {
        Ok(project.validate()?)
    }
}

/// Projects repository. One project identifier per coordinate pair.
#[derive(Clone)]
pub struct ProjectsRepo {
    store: DocumentStore<Projects>,
}

impl ProjectsRepo {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            store: DocumentStore::new(substrate),
        }
    }

    pub fn store(&self) -> &DocumentStore<Projects> {
        &self.store
    }

    pub async fn get_all(&self) -> StoreResult<Vec<StoreProjectData>> {
        self.store.find_all().await
    }

    pub async fn get_projects(&self, page: usize, page_size: usize) -> StoreResult<Vec<StoreProjectData>> {
        self.store.find_all_by_page(page, page_size).await
    }

    pub async fn find_by_project_id(&self, project_id: &str) -> StoreResult<Vec<StoreProjectData>> {
        self.store
            .find_where(QueryBuilder::new().equal(PROJECT_ID, project_id))
            .await
    }

    pub async fn find(&self, group_id: &str, artifact_id: &str) -> StoreResult<Option<StoreProjectData>> {
        self.store
            .find_one(QueryBuilder::new().artifact(group_id, artifact_id))
            .await
    }

    /// Register or update a project.
    ///
    /// Rebinding a registered coordinate pair to a different project
    /// identifier is rejected.
    pub async fn create_or_update(&self, project: &StoreProjectData) -> StoreResult<StoreProjectData> {
        Projects::validate_new_data(project)?;
        if let Some(existing) = self.find(&project.group_id, &project.artifact_id).await?
            && existing.project_id != project.project_id
        {
            tracing::warn!(
                group_id = %project.group_id,
                artifact_id = %project.artifact_id,
                registered = %existing.project_id,
                requested = %project.project_id,
                "Rejected project rebind"
            );
            return Err(StoreError::Conflict(format!(
                "Duplicate coordinates: Different project {} its already registered with this coordinates {}-{}",
                existing.project_id, project.group_id, project.artifact_id
            )));
        }
        self.store.create_or_update(true, false, project).await
    }

    pub async fn delete(&self, group_id: &str, artifact_id: &str) -> StoreResult<u64> {
        self.store
            .delete_by_query(QueryBuilder::new().artifact(group_id, artifact_id))
            .await
    }
}
