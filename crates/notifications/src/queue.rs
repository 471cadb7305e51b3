//! Pending notification queue.
//!
//! Events wait here until a worker claims them. Claiming is deleting: every
//! worker scans the queue and unlinks each row it sees, and only the worker
//! whose unlink removed the row processes the event. No other lock guards
//! the queue.

use crate::error::{NotificationError, NotificationResult};
use depot_core::MetadataNotification;
use depot_store::query::{self, QueryBuilder, fields};
use depot_store::substrate::{Aggregation, SchemaField, SortField, Substrate};
use depot_store::{Collection, DocumentStore};
use std::sync::Arc;

pub const COLLECTION: &str = "notifications_queue";
pub const EVENT_PRIORITY: &str = "eventPriority";

/// Collection strategy for pending events.
pub struct PendingNotifications;

impl Collection for PendingNotifications {
    type Record = MetadataNotification;
    const NAME: &'static str = COLLECTION;

    fn schema() -> Vec<SchemaField> {
        vec![
            SchemaField::sortable_tag(fields::ID),
            SchemaField::sortable_tag(fields::GROUP_ID),
            SchemaField::sortable_tag(fields::ARTIFACT_ID),
            SchemaField::sortable_tag(fields::VERSION_ID),
            SchemaField::sortable_numeric(EVENT_PRIORITY),
            SchemaField::sortable_numeric(fields::CREATED),
        ]
    }

    fn key(event: &MetadataNotification) -> String {
        let nanos = depot_core::dates::now_nanos().to_string();
        query::compound_key(&[
            COLLECTION,
            &event.group_id,
            &event.artifact_id,
            &event.version_id,
            &nanos,
        ])
    }

    fn key_filter(event: &MetadataNotification) -> QueryBuilder {
        match &event.event_id {
            Some(event_id) => QueryBuilder::new().equal(fields::ID, event_id),
            None => QueryBuilder::new().artifact_version(
                &event.group_id,
                &event.artifact_id,
                &event.version_id,
            ),
        }
    }
}

// Priority ascending, then oldest first.
fn queue_order(filter: &str) -> Aggregation {
    Aggregation::new(filter)
        .filter_exists(fields::ID)
        .sort_by(vec![
            SortField::asc(EVENT_PRIORITY),
            SortField::asc(fields::CREATED),
        ])
}

/// Pending notification queue.
#[derive(Clone)]
pub struct NotificationsQueue {
    store: DocumentStore<PendingNotifications>,
}

impl NotificationsQueue {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            store: DocumentStore::new(substrate),
        }
    }

    pub fn store(&self) -> &DocumentStore<PendingNotifications> {
        &self.store
    }

    /// Queue an event and return its event id.
    ///
    /// An event without an id is pending for its coordinate: a second push
    /// for the same coordinate merges into the existing row. The first push
    /// of a new event takes the row key as its event id.
    pub async fn push(&self, event: &MetadataNotification) -> NotificationResult<String> {
        let stored = self.store.create_or_update(true, true, event).await?;
        if let Some(event_id) = stored.event_id {
            return Ok(event_id);
        }

        let row_key = stored.id.clone().ok_or_else(|| NotificationError::Handler {
            event: event.coordinate().to_string(),
            message: "queued event has no row key".to_string(),
        })?;
        let identified = stored.with_event_id(row_key.clone());
        self.store.create_or_update(true, true, &identified).await?;
        tracing::debug!(event_id = %row_key, "Queued event");
        Ok(row_key)
    }

    /// Claim every pending event, in queue order.
    ///
    /// An event is returned only if this call's unlink removed its row. Rows
    /// removed by a concurrent caller are skipped.
    pub async fn pull_all(&self) -> NotificationResult<Vec<MetadataNotification>> {
        let pending = self
            .store
            .find_by_aggregation(queue_order(query::WILDCARD))
            .await?;

        let mut claimed = Vec::with_capacity(pending.len());
        for event in pending {
            let Some(key) = event.id.as_deref() else {
                continue;
            };
            if self.store.delete_by_key(key).await? == 0 {
                tracing::debug!(key = %key, "Event claimed by another worker");
                continue;
            }
            claimed.push(event);
        }
        Ok(claimed)
    }

    /// The event the next pull would process first, without claiming it.
    pub async fn get_first_in_queue(&self) -> NotificationResult<Option<MetadataNotification>> {
        let aggregation = queue_order(query::WILDCARD).limit(0, 1);
        Ok(self
            .store
            .find_by_aggregation(aggregation)
            .await?
            .into_iter()
            .next())
    }

    pub async fn get(&self, event_id: &str) -> NotificationResult<Option<MetadataNotification>> {
        Ok(self
            .store
            .find_one(QueryBuilder::new().equal(fields::ID, event_id))
            .await?)
    }

    pub async fn get_all(&self) -> NotificationResult<Vec<MetadataNotification>> {
        Ok(self.store.find_all().await?)
    }

    pub async fn size(&self) -> NotificationResult<usize> {
        Ok(self.store.count(QueryBuilder::new()).await?)
    }

    /// Drop every pending event.
    pub async fn delete_all(&self) -> NotificationResult<u64> {
        let aggregation = Aggregation::new(query::WILDCARD)
            .load(&[fields::ID])
            .filter_exists(fields::GROUP_ID);
        Ok(self.store.delete_by_aggregation(&aggregation).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_store::MemorySubstrate;

    async fn queue() -> NotificationsQueue {
        let queue = NotificationsQueue::new(Arc::new(MemorySubstrate::new()));
        queue.store().create_index().await.unwrap();
        queue
    }

    #[tokio::test]
    async fn test_push_assigns_event_id_from_key() {
        let queue = queue().await;
        let event_id = queue
            .push(&MetadataNotification::new("g", "a", "1.0.0"))
            .await
            .unwrap();
        assert!(event_id.starts_with("notifications_queue:g:a:1.0.0:"));

        let stored = queue.get(&event_id).await.unwrap().unwrap();
        assert_eq!(stored.event_id.as_deref(), Some(event_id.as_str()));
        assert_eq!(stored.id.as_deref(), Some(event_id.as_str()));
        assert_eq!(queue.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_push_without_id_merges_same_coordinate() {
        let queue = queue().await;
        let first = queue
            .push(&MetadataNotification::new("g", "a", "1.0.0"))
            .await
            .unwrap();
        let second = queue
            .push(&MetadataNotification::new("g", "a", "1.0.0").with_priority(1))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(queue.size().await.unwrap(), 1);
        assert_eq!(queue.get(&first).await.unwrap().unwrap().event_priority, 1);
    }

    #[tokio::test]
    async fn test_first_in_queue_is_lowest_priority_then_oldest() {
        let queue = queue().await;
        let low = queue
            .push(&MetadataNotification::new("g", "a", "1.0.0").with_priority(2))
            .await
            .unwrap();
        let older = queue
            .push(&MetadataNotification::new("g", "a", "2.0.0").with_priority(1))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let newer = queue
            .push(&MetadataNotification::new("g", "a", "3.0.0").with_priority(1))
            .await
            .unwrap();

        let first = queue.get_first_in_queue().await.unwrap().unwrap();
        assert_eq!(first.event_id.as_deref(), Some(older.as_str()));

        let order: Vec<_> = queue
            .pull_all()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|e| e.event_id)
            .collect();
        assert_eq!(order, vec![older, newer, low]);
        assert!(queue.get_first_in_queue().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_all() {
        let queue = queue().await;
        for version in ["1.0.0", "2.0.0", "3.0.0"] {
            queue
                .push(&MetadataNotification::new("g", "a", version))
                .await
                .unwrap();
        }
        assert_eq!(queue.delete_all().await.unwrap(), 3);
        assert_eq!(queue.size().await.unwrap(), 0);
        assert!(queue.pull_all().await.unwrap().is_empty());
    }
}
