//! Artifact files and refresh status.

use super::coordinate_fields;
use crate::engine::{Collection, DocumentStore};
use crate::error::StoreResult;
use crate::query::{self, QueryBuilder, fields};
use crate::substrate::{Aggregation, SchemaField, Substrate};
use depot_core::{ArtifactFile, RefreshStatus};
use std::sync::Arc;

pub const FILES_COLLECTION: &str = "artifacts-files";
pub const REFRESH_STATUS_COLLECTION: &str = "artifacts-refresh-status";
pub const PATH: &str = "path";
pub const EVENT_ID: &str = "eventId";
pub const PARENT_EVENT_ID: &str = "parentEventId";

/// Collection strategy for [`ArtifactFile`].
pub struct ArtifactFiles;

impl Collection for ArtifactFiles {
    type Record = ArtifactFile;
    const NAME: &'static str = FILES_COLLECTION;

    fn schema() -> Vec<SchemaField> {
        vec![SchemaField::sortable_tag(PATH)]
    }

    fn key(file: &ArtifactFile) -> String {
        query::compound_key(&[FILES_COLLECTION, &file.path])
    }

    fn key_filter(file: &ArtifactFile) -> QueryBuilder {
        QueryBuilder::new().equal(PATH, &file.path)
    }
}

/// Artifact files repository.
#[derive(Clone)]
pub struct ArtifactFilesRepo {
    store: DocumentStore<ArtifactFiles>,
}

impl ArtifactFilesRepo {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            store: DocumentStore::new(substrate),
        }
    }

    pub fn store(&self) -> &DocumentStore<ArtifactFiles> {
        &self.store
    }

    pub async fn create_or_update(&self, file: &ArtifactFile) -> StoreResult<ArtifactFile> {
        self.store.create_or_update(true, false, file).await
    }

    pub async fn find(&self, path: &str) -> StoreResult<Option<ArtifactFile>> {
        self.store.find_one(QueryBuilder::new().equal(PATH, path)).await
    }
}

/// Collection strategy for [`RefreshStatus`].
pub struct RefreshStatuses;

impl Collection for RefreshStatuses {
    type Record = RefreshStatus;
    const NAME: &'static str = REFRESH_STATUS_COLLECTION;

    fn schema() -> Vec<SchemaField> {
        let mut schema = coordinate_fields();
        schema.push(SchemaField::sortable_tag(EVENT_ID));
        schema.push(SchemaField::sortable_tag(PARENT_EVENT_ID));
        schema
    }

    fn key(status: &RefreshStatus) -> String {
        query::compound_key(&[
            REFRESH_STATUS_COLLECTION,
            &status.group_id,
            &status.artifact_id,
            &status.version_id,
        ])
    }

    fn key_filter(status: &RefreshStatus) -> QueryBuilder {
        QueryBuilder::new().artifact_version(&status.group_id, &status.artifact_id, &status.version_id)
    }
}

/// Optional filters for [`RefreshStatusRepo::find`].
#[derive(Clone, Debug, Default)]
pub struct RefreshStatusFilter {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version_id: Option<String>,
    pub event_id: Option<String>,
    pub parent_event_id: Option<String>,
}

/// Refresh status repository. A version can only be marked once; statuses
/// are inserted and deleted, never updated.
#[derive(Clone)]
pub struct RefreshStatusRepo {
    store: DocumentStore<RefreshStatuses>,
}

impl RefreshStatusRepo {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            store: DocumentStore::new(substrate),
        }
    }

    pub fn store(&self) -> &DocumentStore<RefreshStatuses> {
        &self.store
    }

    /// Mark a version as refreshing. Fails with a conflict if it already is.
    pub async fn insert(&self, status: &RefreshStatus) -> StoreResult<RefreshStatus> {
        self.store
            .insert(&RefreshStatuses::key(status), true, false, status)
            .await
    }

    pub async fn get_all(&self) -> StoreResult<Vec<RefreshStatus>> {
        self.store.find_all().await
    }

    pub async fn find(&self, filter: &RefreshStatusFilter) -> StoreResult<Vec<RefreshStatus>> {
        let mut query = QueryBuilder::new();
        for (field, value) in [
            (fields::ARTIFACT_ID, &filter.artifact_id),
            (fields::VERSION_ID, &filter.version_id),
            (EVENT_ID, &filter.event_id),
            (PARENT_EVENT_ID, &filter.parent_event_id),
        ] {
            if let Some(value) = value {
                query = query.equal(field, value);
            }
        }

        match &filter.group_id {
            Some(group_id) => self.store.find_where(query.equal(fields::GROUP_ID, group_id)).await,
            None => {
                let aggregation = Aggregation::new(query.build()).filter_exists(fields::GROUP_ID);
                self.store.find_by_aggregation(aggregation).await
            }
        }
    }

    pub async fn get(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> StoreResult<Option<RefreshStatus>> {
        self.store
            .find_one(QueryBuilder::new().artifact_version(group_id, artifact_id, version_id))
            .await
    }

    pub async fn delete(&self, group_id: &str, artifact_id: &str, version_id: &str) -> StoreResult<u64> {
        self.store
            .delete_by_query(QueryBuilder::new().artifact_version(group_id, artifact_id, version_id))
            .await
    }
}
