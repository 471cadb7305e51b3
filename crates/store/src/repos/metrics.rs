//! Version query metrics.
//!
//! Every query appends an observation. Consolidation collapses the history of
//! a coordinate down to its most recent observation.

use super::coordinate_fields;
use crate::engine::{Collection, DocumentStore};
use crate::error::StoreResult;
use crate::query::{self, QueryBuilder, fields};
use crate::substrate::{Aggregation, SchemaField, Substrate};
use depot_core::{ProjectVersion, VersionQueryMetric};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const COLLECTION: &str = "query-metrics";
pub const LAST_QUERY_TIME: &str = "lastQueryTime";

const COORDINATE: &str = "coordinate";

/// Collection strategy for [`VersionQueryMetric`].
pub struct QueryMetrics;

impl Collection for QueryMetrics {
    type Record = VersionQueryMetric;
    const NAME: &'static str = COLLECTION;

    fn schema() -> Vec<SchemaField> {
        let mut schema = coordinate_fields();
        schema.push(SchemaField::sortable_numeric(LAST_QUERY_TIME));
        schema
    }

    // Append-only: observations sharing a millisecond must not collide.
    fn key(metric: &VersionQueryMetric) -> String {
        let time = metric.last_query_time.to_string();
        let nanos = depot_core::dates::now_nanos().to_string();
        query::compound_key(&[
            COLLECTION,
            &metric.group_id,
            &metric.artifact_id,
            &metric.version_id,
            &time,
            &nanos,
        ])
    }

    fn key_filter(metric: &VersionQueryMetric) -> QueryBuilder {
        QueryBuilder::new().artifact_version(&metric.group_id, &metric.artifact_id, &metric.version_id)
    }
}

/// Query metrics repository.
#[derive(Clone)]
pub struct QueryMetricsRepo {
    store: DocumentStore<QueryMetrics>,
}

impl QueryMetricsRepo {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            store: DocumentStore::new(substrate),
        }
    }

    pub fn store(&self) -> &DocumentStore<QueryMetrics> {
        &self.store
    }

    pub async fn get_all(&self) -> StoreResult<Vec<VersionQueryMetric>> {
        self.store.find_all().await
    }

    /// Every observation of one version.
    pub async fn get(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> StoreResult<Vec<VersionQueryMetric>> {
        self.store
            .find_where(QueryBuilder::new().artifact_version(group_id, artifact_id, version_id))
            .await
    }

    /// Append an observation of the version being queried now.
    pub async fn record(&self, group_id: &str, artifact_id: &str, version_id: &str) -> StoreResult<VersionQueryMetric> {
        let metric = VersionQueryMetric::new(group_id, artifact_id, version_id, depot_core::dates::now_millis());
        self.record_metric(&metric).await
    }

    pub async fn record_metric(&self, metric: &VersionQueryMetric) -> StoreResult<VersionQueryMetric> {
        self.store
            .insert(&QueryMetrics::key(metric), false, false, metric)
            .await
    }

    /// Delete observations of the same coordinate strictly older than `metric`.
    pub async fn consolidate(&self, metric: &VersionQueryMetric) -> StoreResult<u64> {
        let filter = QueryMetrics::key_filter(metric).less_than(LAST_QUERY_TIME, metric.last_query_time);
        self.store.delete_by_query(filter).await
    }

    /// Consolidate every coordinate against its most recent observation.
    pub async fn consolidate_all(&self) -> StoreResult<u64> {
        let mut latest: BTreeMap<ProjectVersion, VersionQueryMetric> = BTreeMap::new();
        for metric in self.store.find_all().await? {
            match latest.get(&metric.coordinate()) {
                Some(current) if current.last_query_time >= metric.last_query_time => {}
                _ => {
                    latest.insert(metric.coordinate(), metric);
                }
            }
        }

        let mut deleted = 0;
        for metric in latest.values() {
            deleted += self.consolidate(metric).await?;
        }
        tracing::info!(coordinates = latest.len(), deleted, "Consolidated query metrics");
        Ok(deleted)
    }

    /// Observations at or before `cutoff` (epoch millis).
    pub async fn find_metrics_before(&self, cutoff: i64) -> StoreResult<Vec<VersionQueryMetric>> {
        self.store
            .find_where(QueryBuilder::new().less_than_or_equal(LAST_QUERY_TIME, cutoff))
            .await
    }

    /// Delete observations at or before `cutoff` (epoch millis).
    pub async fn delete_metrics_before(&self, cutoff: i64) -> StoreResult<u64> {
        self.store
            .delete_by_query(QueryBuilder::new().less_than_or_equal(LAST_QUERY_TIME, cutoff))
            .await
    }

    /// Distinct coordinates that have at least one observation.
    pub async fn get_all_stored_entities_coordinates(&self) -> StoreResult<Vec<ProjectVersion>> {
        let aggregation = Aggregation::new(query::WILDCARD)
            .apply_format(
                "%s:%s:%s",
                &[fields::GROUP_ID, fields::ARTIFACT_ID, fields::VERSION_ID],
                COORDINATE,
            )
            .group_by_count(&[COORDINATE], "count");
        let rows = self.store.aggregate(&aggregation).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.fields.get(COORDINATE)?.as_str())
            .filter_map(ProjectVersion::parse)
            .collect())
    }
}
