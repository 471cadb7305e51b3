//! Collection registry and index administration.

use crate::engine::{Collection, ensure_index};
use crate::error::{StoreError, StoreResult};
use crate::query;
use crate::repos::{
    ArtifactFiles, Entities, FileGenerations, ProjectVersions, Projects, QueryMetrics,
    RefreshStatuses, ScheduleInstances, Schedules,
};
use crate::substrate::{IndexDefinition, Substrate};
use std::sync::Arc;

/// A collection known to the registry.
#[derive(Clone, Debug)]
pub struct RegisteredCollection {
    pub name: &'static str,
    pub index: String,
    pub definition: IndexDefinition,
}

/// Every collection the process manages, in registration order.
///
/// Built explicitly at startup. Crates that add collections register them
/// before the registry is handed to [`AdminStore`].
#[derive(Clone, Debug, Default)]
pub struct CollectionRegistry {
    collections: Vec<RegisteredCollection>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every collection defined in this crate.
    pub fn depot() -> Self {
        Self::new()
            .with::<Projects>()
            .with::<ProjectVersions>()
            .with::<Entities>()
            .with::<FileGenerations>()
            .with::<ArtifactFiles>()
            .with::<RefreshStatuses>()
            .with::<Schedules>()
            .with::<ScheduleInstances>()
            .with::<QueryMetrics>()
    }

    /// Register `C`. Registering the same collection twice is a no-op.
    pub fn register<C: Collection>(&mut self) -> &mut Self {
        if self.get(C::NAME).is_none() {
            self.collections.push(RegisteredCollection {
                name: C::NAME,
                index: C::index_name(),
                definition: C::index_definition(),
            });
        }
        self
    }

    pub fn with<C: Collection>(mut self) -> Self {
        self.register::<C>();
        self
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredCollection> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.collections.iter().map(|c| c.name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredCollection> {
        self.collections.iter()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

/// Index management over every registered collection.
#[derive(Clone)]
pub struct AdminStore {
    substrate: Arc<dyn Substrate>,
    registry: Arc<CollectionRegistry>,
}

impl AdminStore {
    pub fn new(substrate: Arc<dyn Substrate>, registry: Arc<CollectionRegistry>) -> Self {
        Self {
            substrate,
            registry,
        }
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    pub fn get_all_collections(&self) -> Vec<String> {
        self.registry.names().into_iter().map(String::from).collect()
    }

    /// Index names present in the substrate, registered or not.
    pub async fn get_all_indexes(&self) -> StoreResult<Vec<String>> {
        self.substrate.list_indexes().await
    }

    /// Create the index of every registered collection that lacks one.
    ///
    /// Returns the index name of every registered collection, whether it was
    /// created by this call or already present.
    pub async fn create_indexes(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::with_capacity(self.registry.len());
        let mut created = 0;
        for collection in self.registry.iter() {
            if ensure_index(self.substrate.as_ref(), &collection.index, &collection.definition).await? {
                created += 1;
            }
            names.push(collection.index.clone());
        }
        tracing::info!(
            collections = names.len(),
            created,
            "Indexes ready"
        );
        Ok(names)
    }

    /// Drop the index of `collection`. Documents are kept.
    pub async fn delete_index(&self, collection: &str) -> StoreResult<String> {
        let index = query::index_name(collection);
        if !self.substrate.index_exists(&index).await? {
            return Err(StoreError::UnknownIndex(index));
        }
        self.substrate.drop_index(&index).await?;
        tracing::info!(collection = collection, index = %index, "Dropped index");
        Ok(index)
    }
}
