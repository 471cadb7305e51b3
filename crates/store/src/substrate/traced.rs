//! Substrate wrapper that logs every call.

use super::{AggregateRow, Aggregation, IndexDefinition, SearchQuery, SearchResult, SetMode, Substrate};
use crate::error::StoreResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Emits a debug event with the elapsed time for each substrate call.
pub struct TracedSubstrate {
    inner: Arc<dyn Substrate>,
}

impl TracedSubstrate {
    pub fn new(inner: Arc<dyn Substrate>) -> Self {
        Self { inner }
    }
}

fn record<T>(operation: &'static str, subject: &str, started: Instant, result: &StoreResult<T>) {
    let elapsed_us = started.elapsed().as_micros() as u64;
    match result {
        Ok(_) => tracing::debug!(operation, subject, elapsed_us, "substrate call"),
        Err(e) => tracing::debug!(operation, subject, elapsed_us, error = %e, "substrate call failed"),
    }
}

#[async_trait]
impl Substrate for TracedSubstrate {
    async fn create_index(&self, name: &str, definition: &IndexDefinition) -> StoreResult<()> {
        let started = Instant::now();
        let result = self.inner.create_index(name, definition).await;
        record("create_index", name, started, &result);
        result
    }

    async fn index_exists(&self, name: &str) -> StoreResult<bool> {
        let started = Instant::now();
        let result = self.inner.index_exists(name).await;
        record("index_exists", name, started, &result);
        result
    }

    async fn drop_index(&self, name: &str) -> StoreResult<()> {
        let started = Instant::now();
        let result = self.inner.drop_index(name).await;
        record("drop_index", name, started, &result);
        result
    }

    async fn list_indexes(&self) -> StoreResult<Vec<String>> {
        let started = Instant::now();
        let result = self.inner.list_indexes().await;
        record("list_indexes", "*", started, &result);
        result
    }

    async fn json_set(&self, key: &str, value: &Value, mode: SetMode) -> StoreResult<bool> {
        let started = Instant::now();
        let result = self.inner.json_set(key, value, mode).await;
        record(
            match mode {
                SetMode::Always => "json_set",
                SetMode::IfAbsent => "json_set_nx",
            },
            key,
            started,
            &result,
        );
        result
    }

    async fn json_get(&self, key: &str) -> StoreResult<Option<Value>> {
        let started = Instant::now();
        let result = self.inner.json_get(key).await;
        record("json_get", key, started, &result);
        result
    }

    async fn unlink(&self, key: &str) -> StoreResult<u64> {
        let started = Instant::now();
        let result = self.inner.unlink(key).await;
        record("unlink", key, started, &result);
        result
    }

    #[tracing::instrument(level = "debug", skip(self, query), fields(filter = %query.filter))]
    async fn search(&self, index: &str, query: &SearchQuery) -> StoreResult<SearchResult> {
        let started = Instant::now();
        let result = self.inner.search(index, query).await;
        record("search", index, started, &result);
        result
    }

    #[tracing::instrument(level = "debug", skip(self, aggregation), fields(filter = %aggregation.filter, steps = aggregation.steps.len()))]
    async fn aggregate(
        &self,
        index: &str,
        aggregation: &Aggregation,
    ) -> StoreResult<Vec<AggregateRow>> {
        let started = Instant::now();
        let result = self.inner.aggregate(index, aggregation).await;
        record("aggregate", index, started, &result);
        result
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
}
