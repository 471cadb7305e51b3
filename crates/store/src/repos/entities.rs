//! Stored entities.

use super::{StoreOperationResult, coordinate_fields};
use crate::engine::{Collection, DocumentStore};
use crate::error::{StoreError, StoreResult};
use crate::query::{self, QueryBuilder, fields};
use crate::substrate::{Aggregation, SchemaField, SearchQuery, Substrate};
use depot_core::entity::EntityDefinition;
use depot_core::version::MASTER_SNAPSHOT;
use depot_core::{ProjectVersion, StoredEntity};
use std::sync::Arc;

pub const COLLECTION: &str = "entities";

pub const ENTITY_PATH: &str = "entity_path";
pub const ENTITY_PACKAGE: &str = "entity_content_package";
pub const ENTITY_CLASSIFIER_PATH: &str = "entity_classifierPath";
pub const VERSIONED_ENTITY: &str = "versionedEntity";

const COORDINATE: &str = "coordinate";

/// Collection strategy for [`StoredEntity`].
pub struct Entities;

impl Collection for Entities {
    type Record = StoredEntity;
    const NAME: &'static str = COLLECTION;

    fn schema() -> Vec<SchemaField> {
        let mut schema = coordinate_fields();
        schema.push(SchemaField::sortable_tag(VERSIONED_ENTITY));
        schema.push(SchemaField::tag("$.entity.path", ENTITY_PATH).sortable());
        schema.push(SchemaField::tag("$.entity.content.package", ENTITY_PACKAGE).sortable());
        schema.push(SchemaField::tag("$.entity.classifierPath", ENTITY_CLASSIFIER_PATH).sortable());
        schema
    }

    fn key(entity: &StoredEntity) -> String {
        query::compound_key(&[
            COLLECTION,
            &entity.group_id,
            &entity.artifact_id,
            &entity.version_id,
            &entity.entity.path,
        ])
    }

    fn key_filter(entity: &StoredEntity) -> QueryBuilder {
        entity_path_filter(
            &entity.group_id,
            &entity.artifact_id,
            &entity.version_id,
            &entity.entity.path,
        )
    }

    fn validate_new_data(entity: &StoredEntity) -> StoreResult<()> {
        let errors = entity.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Validation(format!("invalid data {errors:?}")))
        }
    }
}

fn entity_path_filter(group_id: &str, artifact_id: &str, version_id: &str, path: &str) -> QueryBuilder {
    QueryBuilder::new()
        .artifact_version(group_id, artifact_id, version_id)
        .equal(ENTITY_PATH, path)
}

fn versioned_filter(group_id: &str, artifact_id: &str, version_id: &str, versioned: bool) -> QueryBuilder {
    QueryBuilder::new()
        .artifact_version(group_id, artifact_id, version_id)
        .flag(VERSIONED_ENTITY, versioned)
}

/// Options for classifier lookups across projects.
#[derive(Clone, Debug, Default)]
pub struct ClassifierQuery {
    /// Case-insensitive substring the entity path must contain.
    pub search: Option<String>,
    /// Maximum number of results; applied after `search` filtering.
    pub limit: Option<usize>,
    /// Drop entity content from the results.
    pub summary: bool,
    pub versioned: bool,
}

impl ClassifierQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit).filter(|l| *l > 0);
        self
    }

    pub fn summary(mut self, summary: bool) -> Self {
        self.summary = summary;
        self
    }

    pub fn versioned(mut self, versioned: bool) -> Self {
        self.versioned = versioned;
        self
    }
}

/// Entities repository.
#[derive(Clone)]
pub struct EntitiesRepo {
    store: DocumentStore<Entities>,
}

impl EntitiesRepo {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            store: DocumentStore::new(substrate),
        }
    }

    pub fn store(&self) -> &DocumentStore<Entities> {
        &self.store
    }

    /// Insert or update each entity, collecting validation failures instead of
    /// aborting the batch.
    pub async fn create_or_update(&self, entities: &[StoredEntity]) -> StoreResult<StoreOperationResult> {
        let mut report = StoreOperationResult::default();
        for entity in entities {
            let errors = entity.validation_errors();
            if !errors.is_empty() {
                report.errors.extend(errors);
                continue;
            }
            let existing = self.store.find_one(Entities::key_filter(entity)).await?;
            self.store.create_or_update(true, false, entity).await?;
            if existing.is_some() {
                report.modified_count += 1;
            } else {
                report.inserted_count += 1;
            }
        }

        if report.inserted_count + report.modified_count != entities.len() as u64 {
            report.log_error("error creating/updating entities, did not get acknowledgment for all");
        }
        Ok(report)
    }

    pub async fn get_entity(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        path: &str,
    ) -> StoreResult<Option<EntityDefinition>> {
        let filter = entity_path_filter(group_id, artifact_id, version_id, path);
        Ok(self.store.find_one(filter).await?.map(|stored| stored.entity))
    }

    /// Every stored entity of an artifact, across versions.
    pub async fn get_stored_entities(&self, group_id: &str, artifact_id: &str) -> StoreResult<Vec<StoredEntity>> {
        self.store
            .find_where(QueryBuilder::new().artifact(group_id, artifact_id))
            .await
    }

    pub async fn get_version_stored_entities(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> StoreResult<Vec<StoredEntity>> {
        self.store
            .find_where(QueryBuilder::new().artifact_version(group_id, artifact_id, version_id))
            .await
    }

    pub async fn get_versioned_stored_entities(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        versioned: bool,
    ) -> StoreResult<Vec<StoredEntity>> {
        self.store
            .find_where(versioned_filter(group_id, artifact_id, version_id, versioned))
            .await
    }

    pub async fn get_all_entities(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> StoreResult<Vec<EntityDefinition>> {
        let stored = self
            .get_version_stored_entities(group_id, artifact_id, version_id)
            .await?;
        Ok(stored.into_iter().map(|s| s.entity).collect())
    }

    pub async fn get_entities(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        versioned: bool,
    ) -> StoreResult<Vec<EntityDefinition>> {
        let stored = self
            .get_versioned_stored_entities(group_id, artifact_id, version_id, versioned)
            .await?;
        Ok(stored.into_iter().map(|s| s.entity).collect())
    }

    /// Entities of one package, optionally including sub-packages, optionally
    /// restricted to a set of classifier paths.
    #[allow(clippy::too_many_arguments)]
    pub async fn get_entities_by_package(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        package: &str,
        versioned: bool,
        classifier_paths: &[String],
        include_sub_packages: bool,
    ) -> StoreResult<Vec<EntityDefinition>> {
        let filter = versioned_filter(group_id, artifact_id, version_id, versioned);
        let filter = if include_sub_packages {
            filter.prefix(ENTITY_PACKAGE, package)
        } else {
            filter.equal(ENTITY_PACKAGE, package)
        };

        let entities = self.store.find_where(filter).await?;
        Ok(entities
            .into_iter()
            .map(|s| s.entity)
            .filter(|e| classifier_paths.is_empty() || classifier_paths.contains(&e.classifier_path))
            .collect())
    }

    /// Entities of a classifier in the given project versions.
    pub async fn find_released_entities_by_classifier_in(
        &self,
        classifier: &str,
        project_versions: &[ProjectVersion],
        options: &ClassifierQuery,
    ) -> StoreResult<Vec<StoredEntity>> {
        let groups: Vec<QueryBuilder> = project_versions
            .iter()
            .map(|pv| QueryBuilder::new().artifact_version(&pv.group_id, &pv.artifact_id, &pv.version_id))
            .collect();
        let filter = QueryBuilder::new()
            .equal(ENTITY_CLASSIFIER_PATH, classifier)
            .flag(VERSIONED_ENTITY, options.versioned)
            .any_of(&groups);
        self.search_with_options(filter, options).await
    }

    /// Entities of a classifier on the master snapshot of every project.
    pub async fn find_latest_entities_by_classifier_matching(
        &self,
        classifier: &str,
        options: &ClassifierQuery,
    ) -> StoreResult<Vec<StoredEntity>> {
        let filter = QueryBuilder::new()
            .equal(ENTITY_CLASSIFIER_PATH, classifier)
            .flag(VERSIONED_ENTITY, options.versioned)
            .equal(fields::VERSION_ID, MASTER_SNAPSHOT);
        self.search_with_options(filter, options).await
    }

    /// Entities of a classifier in every version other than the master snapshot.
    pub async fn find_released_entities_by_classifier(
        &self,
        classifier: &str,
        summary: bool,
        versioned: bool,
    ) -> StoreResult<Vec<StoredEntity>> {
        let filter = QueryBuilder::new()
            .equal(ENTITY_CLASSIFIER_PATH, classifier)
            .flag(VERSIONED_ENTITY, versioned)
            .not_equal(fields::VERSION_ID, MASTER_SNAPSHOT);
        Ok(summarize(self.store.find_where(filter).await?, summary))
    }

    pub async fn find_latest_entities_by_classifier(
        &self,
        classifier: &str,
        summary: bool,
        versioned: bool,
    ) -> StoreResult<Vec<StoredEntity>> {
        let filter = QueryBuilder::new()
            .equal(ENTITY_CLASSIFIER_PATH, classifier)
            .equal(fields::VERSION_ID, MASTER_SNAPSHOT)
            .flag(VERSIONED_ENTITY, versioned);
        Ok(summarize(self.store.find_where(filter).await?, summary))
    }

    /// Entities of a classifier in every version of every project.
    pub async fn find_all_entities_by_classifier(
        &self,
        classifier: &str,
        summary: bool,
        versioned: bool,
    ) -> StoreResult<Vec<StoredEntity>> {
        let filter = QueryBuilder::new()
            .equal(ENTITY_CLASSIFIER_PATH, classifier)
            .flag(VERSIONED_ENTITY, versioned);
        Ok(summarize(self.store.find_where(filter).await?, summary))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn find_entities_by_classifier(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        classifier: &str,
        summary: bool,
        versioned: bool,
    ) -> StoreResult<Vec<StoredEntity>> {
        let filter = QueryBuilder::new()
            .artifact_version(group_id, artifact_id, version_id)
            .equal(ENTITY_CLASSIFIER_PATH, classifier)
            .flag(VERSIONED_ENTITY, versioned);
        Ok(summarize(self.store.find_where(filter).await?, summary))
    }

    // Without a search term the limit goes into the query. With one, every
    // match is loaded and the limit is applied after the path filter.
    async fn search_with_options(
        &self,
        filter: QueryBuilder,
        options: &ClassifierQuery,
    ) -> StoreResult<Vec<StoredEntity>> {
        let mut query = SearchQuery::new(filter.build());
        if let (Some(limit), None) = (options.limit, &options.search) {
            query = query.limit(0, limit);
        }
        let entities = summarize(self.store.find(&query).await?, options.summary);

        let Some(search) = options.search.as_deref() else {
            return Ok(entities);
        };
        let needle = search.to_lowercase();
        Ok(entities
            .into_iter()
            .filter(|e| e.entity.path.to_lowercase().contains(&needle))
            .take(options.limit.unwrap_or(usize::MAX))
            .collect())
    }

    pub async fn delete(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        versioned: bool,
    ) -> StoreResult<StoreOperationResult> {
        let deleted = self
            .store
            .delete_by_query(versioned_filter(group_id, artifact_id, version_id, versioned))
            .await?;
        Ok(StoreOperationResult::deleted(deleted))
    }

    /// Delete every entity of an artifact, across versions.
    pub async fn delete_all(&self, group_id: &str, artifact_id: &str) -> StoreResult<StoreOperationResult> {
        let deleted = self
            .store
            .delete_by_query(QueryBuilder::new().artifact(group_id, artifact_id))
            .await?;
        Ok(StoreOperationResult::deleted(deleted))
    }

    pub async fn get_all_stored_entities(&self) -> StoreResult<Vec<StoredEntity>> {
        self.store.find_all().await
    }

    pub async fn get_entity_count(&self, group_id: &str, artifact_id: &str) -> StoreResult<usize> {
        self.store
            .count(QueryBuilder::new().artifact(group_id, artifact_id))
            .await
    }

    /// Entities stored against any version other than the master snapshot.
    pub async fn get_version_entity_count(&self) -> StoreResult<usize> {
        self.store
            .count(QueryBuilder::new().not_equal(fields::VERSION_ID, MASTER_SNAPSHOT))
            .await
    }

    pub async fn get_version_entity_count_for(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> StoreResult<usize> {
        self.store
            .count(QueryBuilder::new().artifact_version(group_id, artifact_id, version_id))
            .await
    }

    /// Distinct `(groupId, artifactId)` pairs that have stored entities.
    pub async fn get_stored_entities_coordinates(&self) -> StoreResult<Vec<(String, String)>> {
        let aggregation = Aggregation::new(query::WILDCARD)
            .apply_format("%s:%s", &[fields::GROUP_ID, fields::ARTIFACT_ID], COORDINATE)
            .group_by_count(&[COORDINATE], "count");
        let rows = self.store.aggregate(&aggregation).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.fields.get(COORDINATE)?.as_str())
            .filter_map(|coordinate| coordinate.split_once(':'))
            .map(|(group_id, artifact_id)| (group_id.to_string(), artifact_id.to_string()))
            .collect())
    }
}

fn summarize(entities: Vec<StoredEntity>, summary: bool) -> Vec<StoredEntity> {
    if summary {
        entities.iter().map(StoredEntity::summary).collect()
    } else {
        entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_joins_coordinates_and_path() {
        let entity = StoredEntity::new(
            "org.finos",
            "model",
            "1.0.0",
            EntityDefinition::new("model::Person", "meta::pure::metamodel::type::Class", Default::default()),
        );
        assert_eq!(Entities::key(&entity), "entities:org.finos:model:1.0.0:model::Person");
        assert_eq!(
            Entities::key_filter(&entity).build(),
            "@groupId:{ org\\.finos } @artifactId:{ model } @versionId:{ 1\\.0\\.0 } @entity_path:{ model\\:\\:Person } "
        );
    }

    #[test]
    fn test_limit_zero_means_unlimited() {
        assert_eq!(ClassifierQuery::new().limit(0).limit, None);
        assert_eq!(ClassifierQuery::new().limit(3).limit, Some(3));
    }
}
