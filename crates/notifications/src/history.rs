//! Handled notification history.

use crate::error::NotificationResult;
use depot_core::{MetadataEventStatus, MetadataNotification};
use depot_store::query::{self, QueryBuilder, fields};
use depot_store::substrate::{SchemaField, SearchQuery, SortField, Substrate};
use depot_store::{Collection, DocumentStore};
use std::sync::Arc;

pub const COLLECTION: &str = "notifications";
pub const EVENT_ID: &str = "eventId";
pub const PARENT_EVENT_ID: &str = "parentEventId";
pub const STATUS: &str = "status";

/// Collection strategy for handled notifications. One row per coordinate;
/// the latest outcome overwrites the previous one.
pub struct NotificationHistory;

impl Collection for NotificationHistory {
    type Record = MetadataNotification;
    const NAME: &'static str = COLLECTION;

    fn schema() -> Vec<SchemaField> {
        vec![
            SchemaField::sortable_tag(fields::ID),
            SchemaField::sortable_tag(fields::GROUP_ID),
            SchemaField::sortable_tag(fields::ARTIFACT_ID),
            SchemaField::sortable_tag(fields::VERSION_ID),
            SchemaField::sortable_tag(EVENT_ID),
            SchemaField::sortable_tag(PARENT_EVENT_ID),
            SchemaField::sortable_tag(STATUS),
            SchemaField::sortable_numeric(fields::UPDATED),
        ]
    }

    fn key(event: &MetadataNotification) -> String {
        query::compound_key(&[
            COLLECTION,
            &event.group_id,
            &event.artifact_id,
            &event.version_id,
        ])
    }

    fn key_filter(event: &MetadataNotification) -> QueryBuilder {
        QueryBuilder::new().artifact_version(&event.group_id, &event.artifact_id, &event.version_id)
    }
}

/// Optional filters for [`NotificationsHistory::find`]. Times are epoch millis
/// compared against the last update; `to` defaults to now.
#[derive(Clone, Debug, Default)]
pub struct NotificationFilter {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version_id: Option<String>,
    pub event_id: Option<String>,
    pub parent_event_id: Option<String>,
    pub success: Option<bool>,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl NotificationFilter {
    fn to_query(&self) -> QueryBuilder {
        let to = self.to.unwrap_or_else(depot_core::dates::now_millis);
        let mut query = QueryBuilder::new().less_than_or_equal(fields::UPDATED, to);
        if let Some(from) = self.from {
            query = query.greater_than_or_equal(fields::UPDATED, from);
        }
        for (field, value) in [
            (fields::GROUP_ID, &self.group_id),
            (fields::ARTIFACT_ID, &self.artifact_id),
            (fields::VERSION_ID, &self.version_id),
            (EVENT_ID, &self.event_id),
            (PARENT_EVENT_ID, &self.parent_event_id),
        ] {
            if let Some(value) = value {
                query = query.equal(field, value);
            }
        }
        if let Some(success) = self.success {
            query = query.equal(STATUS, MetadataEventStatus::from_success(success).as_str());
        }
        query
    }
}

/// Notification history repository.
#[derive(Clone)]
pub struct NotificationsHistory {
    store: DocumentStore<NotificationHistory>,
}

impl NotificationsHistory {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            store: DocumentStore::new(substrate),
        }
    }

    pub fn store(&self) -> &DocumentStore<NotificationHistory> {
        &self.store
    }

    pub async fn get_all(&self) -> NotificationResult<Vec<MetadataNotification>> {
        Ok(self.store.find_all().await?)
    }

    pub async fn get(&self, event_id: &str) -> NotificationResult<Option<MetadataNotification>> {
        Ok(self
            .store
            .find_one(QueryBuilder::new().equal(EVENT_ID, event_id))
            .await?)
    }

    /// Matching notifications, most recently updated first.
    pub async fn find(&self, filter: &NotificationFilter) -> NotificationResult<Vec<MetadataNotification>> {
        let query = SearchQuery::new(filter.to_query().build()).sort_by(SortField::desc(fields::UPDATED));
        Ok(self.store.find(&query).await?)
    }

    pub async fn create_or_update(&self, event: &MetadataNotification) -> NotificationResult<MetadataNotification> {
        Ok(self.store.create_or_update(true, true, event).await?)
    }

    /// Delete one row by its id.
    pub async fn delete(&self, id: &str) -> NotificationResult<u64> {
        Ok(self.store.delete_by_key(id).await?)
    }

    /// Delete rows last updated more than `days` days ago.
    pub async fn delete_old_notifications(&self, days: u32) -> NotificationResult<u64> {
        let cutoff = depot_core::dates::days_ago_millis(days);
        let deleted = self
            .store
            .delete_by_query(QueryBuilder::new().less_than(fields::UPDATED, cutoff))
            .await?;
        tracing::info!(days, deleted, "Deleted old notifications");
        Ok(deleted)
    }
}
