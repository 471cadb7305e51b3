//! Generated files.

use super::coordinate_fields;
use crate::engine::{Collection, DocumentStore};
use crate::error::StoreResult;
use crate::query::{self, QueryBuilder};
use crate::substrate::{SchemaField, Substrate};
use depot_core::StoredFileGeneration;
use std::sync::Arc;

pub const COLLECTION: &str = "file-generations";
pub const GENERATION_PATH: &str = "path";
pub const GENERATION_TYPE: &str = "type";
pub const FILE_PATH: &str = "file_path";

/// Collection strategy for [`StoredFileGeneration`].
pub struct FileGenerations;

impl Collection for FileGenerations {
    type Record = StoredFileGeneration;
    const NAME: &'static str = COLLECTION;

    fn schema() -> Vec<SchemaField> {
        let mut schema = coordinate_fields();
        schema.push(SchemaField::sortable_tag(GENERATION_PATH));
        schema.push(SchemaField::sortable_tag(GENERATION_TYPE));
        schema.push(SchemaField::tag("$.file.path", FILE_PATH).sortable());
        schema
    }

    fn key(generation: &StoredFileGeneration) -> String {
        query::compound_key(&[
            COLLECTION,
            &generation.group_id,
            &generation.artifact_id,
            &generation.version_id,
            &generation.file.path,
        ])
    }

    fn key_filter(generation: &StoredFileGeneration) -> QueryBuilder {
        file_path_filter(
            &generation.group_id,
            &generation.artifact_id,
            &generation.version_id,
            &generation.file.path,
        )
    }
}

fn file_path_filter(group_id: &str, artifact_id: &str, version_id: &str, file_path: &str) -> QueryBuilder {
    QueryBuilder::new()
        .artifact_version(group_id, artifact_id, version_id)
        .equal(FILE_PATH, file_path)
}

/// File generations repository.
#[derive(Clone)]
pub struct FileGenerationsRepo {
    store: DocumentStore<FileGenerations>,
}

impl FileGenerationsRepo {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            store: DocumentStore::new(substrate),
        }
    }

    pub fn store(&self) -> &DocumentStore<FileGenerations> {
        &self.store
    }

    pub async fn get_all(&self) -> StoreResult<Vec<StoredFileGeneration>> {
        self.store.find_all().await
    }

    pub async fn find(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> StoreResult<Vec<StoredFileGeneration>> {
        self.store
            .find_where(QueryBuilder::new().artifact_version(group_id, artifact_id, version_id))
            .await
    }

    /// Files generated from one model element.
    pub async fn find_by_element_path(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        element_path: &str,
    ) -> StoreResult<Vec<StoredFileGeneration>> {
        let filter = QueryBuilder::new()
            .artifact_version(group_id, artifact_id, version_id)
            .equal(GENERATION_PATH, element_path);
        self.store.find_where(filter).await
    }

    pub async fn find_by_file_path(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        file_path: &str,
    ) -> StoreResult<Option<StoredFileGeneration>> {
        self.store
            .find_one(file_path_filter(group_id, artifact_id, version_id, file_path))
            .await
    }

    pub async fn find_by_type(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        generation_type: &str,
    ) -> StoreResult<Vec<StoredFileGeneration>> {
        let filter = QueryBuilder::new()
            .artifact_version(group_id, artifact_id, version_id)
            .equal(GENERATION_TYPE, generation_type);
        self.store.find_where(filter).await
    }

    /// Same lookup as [`Self::find_by_file_path`].
    pub async fn get(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        file_path: &str,
    ) -> StoreResult<Option<StoredFileGeneration>> {
        self.find_by_file_path(group_id, artifact_id, version_id, file_path)
            .await
    }

    pub async fn create_or_update(
        &self,
        generation: &StoredFileGeneration,
    ) -> StoreResult<StoredFileGeneration> {
        self.store.create_or_update(true, false, generation).await
    }

    /// Delete every generation of a version.
    pub async fn delete(&self, group_id: &str, artifact_id: &str, version_id: &str) -> StoreResult<u64> {
        self.store
            .delete_by_query(QueryBuilder::new().artifact_version(group_id, artifact_id, version_id))
            .await
    }
}
