//! Substrate double that refuses writes under one key prefix.

use async_trait::async_trait;
use depot_store::substrate::{
    AggregateRow, Aggregation, IndexDefinition, SearchQuery, SearchResult, SetMode, Substrate,
};
use depot_store::{StoreError, StoreResult};
use serde_json::Value;
use std::sync::Arc;

/// Delegates to `inner` but rejects `json_set` for keys under `prefix`.
pub struct RejectingWrites {
    inner: Arc<dyn Substrate>,
    prefix: String,
}

#[allow(dead_code)]
impl RejectingWrites {
    pub fn new(inner: Arc<dyn Substrate>, prefix: &str) -> Self {
        Self {
            inner,
            prefix: prefix.to_string(),
        }
    }
}

#[async_trait]
impl Substrate for RejectingWrites {
    async fn create_index(&self, name: &str, definition: &IndexDefinition) -> StoreResult<()> {
        self.inner.create_index(name, definition).await
    }

    async fn index_exists(&self, name: &str) -> StoreResult<bool> {
        self.inner.index_exists(name).await
    }

    async fn drop_index(&self, name: &str) -> StoreResult<()> {
        self.inner.drop_index(name).await
    }

    async fn list_indexes(&self) -> StoreResult<Vec<String>> {
        self.inner.list_indexes().await
    }

    async fn json_set(&self, key: &str, value: &Value, mode: SetMode) -> StoreResult<bool> {
        if key.starts_with(&self.prefix) {
            return Err(StoreError::Substrate {
                key: key.to_string(),
                message: "write rejected".to_string(),
            });
        }
        self.inner.json_set(key, value, mode).await
    }

    async fn json_get(&self, key: &str) -> StoreResult<Option<Value>> {
        self.inner.json_get(key).await
    }

    async fn unlink(&self, key: &str) -> StoreResult<u64> {
        self.inner.unlink(key).await
    }

    async fn search(&self, index: &str, query: &SearchQuery) -> StoreResult<SearchResult> {
        self.inner.search(index, query).await
    }

    async fn aggregate(
        &self,
        index: &str,
        aggregation: &Aggregation,
    ) -> StoreResult<Vec<AggregateRow>> {
        self.inner.aggregate(index, aggregation).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
}
