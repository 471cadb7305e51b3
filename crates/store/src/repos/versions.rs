//! Project versions.

use super::coordinate_fields;
use crate::engine::{Collection, DocumentStore};
use crate::error::{StoreError, StoreResult};
use crate::query::{self, QueryBuilder};
use crate::substrate::{SchemaField, Substrate};
use depot_core::StoreProjectVersionData;
use std::sync::Arc;

pub const COLLECTION: &str = "versions";
pub const VERSION_DATA_EXCLUDED: &str = "versionData_excluded";

/// Collection strategy for [`StoreProjectVersionData`].
pub struct ProjectVersions;

impl Collection for ProjectVersions {
    type Record = StoreProjectVersionData;
    const NAME: &'static str = COLLECTION;

    fn schema() -> Vec<SchemaField> {
        let mut schema = coordinate_fields();
        schema.push(SchemaField::tag("$.versionData.excluded", VERSION_DATA_EXCLUDED).sortable());
        schema
    }

    fn key(version: &StoreProjectVersionData) -> String {
        query::compound_key(&[
            COLLECTION,
            &version.group_id,
            &version.artifact_id,
            &version.version_id,
        ])
    }

    fn key_filter(version: &StoreProjectVersionData) -> QueryBuilder {
        QueryBuilder::new().artifact_version(&version.group_id, &version.artifact_id, &version.version_id)
    }

    fn validate_new_data(version: &StoreProjectVersionData) -> StoreResult<()> {
        Ok(version.validate()?)
    }
}

/// Project versions repository.
#[derive(Clone)]
pub struct ProjectVersionsRepo {
    store: DocumentStore<ProjectVersions>,
}

impl ProjectVersionsRepo {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            store: DocumentStore::new(substrate),
        }
    }

    pub fn store(&self) -> &DocumentStore<ProjectVersions> {
        &self.store
    }

    pub async fn get_all(&self) -> StoreResult<Vec<StoreProjectVersionData>> {
        self.store.find_all().await
    }

    /// Every version of an artifact.
    pub async fn find(&self, group_id: &str, artifact_id: &str) -> StoreResult<Vec<StoreProjectVersionData>> {
        self.store
            .find_where(QueryBuilder::new().artifact(group_id, artifact_id))
            .await
    }

    pub async fn find_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> StoreResult<Option<StoreProjectVersionData>> {
        if version_id.is_empty() {
            return Err(StoreError::Validation(
                "cannot find project version, versionId cannot be empty".to_string(),
            ));
        }
        self.store
            .find_one(QueryBuilder::new().artifact_version(group_id, artifact_id, version_id))
            .await
    }

    /// Versions with the given exclusion flag, across artifacts.
    pub async fn find_versions(&self, excluded: bool) -> StoreResult<Vec<StoreProjectVersionData>> {
        self.store
            .find_where(QueryBuilder::new().flag(VERSION_DATA_EXCLUDED, excluded))
            .await
    }

    pub async fn get_version_count(&self, group_id: &str, artifact_id: &str) -> StoreResult<usize> {
        self.store
            .count(QueryBuilder::new().artifact(group_id, artifact_id))
            .await
    }

    pub async fn create_or_update(
        &self,
        version: &StoreProjectVersionData,
    ) -> StoreResult<StoreProjectVersionData> {
        self.store.create_or_update(true, false, version).await
    }

    /// Delete every version of an artifact.
    pub async fn delete(&self, group_id: &str, artifact_id: &str) -> StoreResult<u64> {
        self.store
            .delete_by_query(QueryBuilder::new().artifact(group_id, artifact_id))
            .await
    }

    pub async fn delete_by_version_id(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> StoreResult<u64> {
        self.store
            .delete_by_query(QueryBuilder::new().artifact_version(group_id, artifact_id, version_id))
            .await
    }
}
