//! Queue manager: validates incoming events and drives their processing.

use crate::error::NotificationResult;
use crate::handler::NotificationHandler;
use crate::history::NotificationsHistory;
use crate::queue::NotificationsQueue;
use depot_core::MetadataNotification;
use depot_store::substrate::Substrate;
use std::sync::Arc;

/// Entry point for pushing and handling notifications.
#[derive(Clone)]
pub struct NotificationsManager {
    queue: NotificationsQueue,
    history: NotificationsHistory,
    handler: Arc<dyn NotificationHandler>,
}

impl NotificationsManager {
    pub fn new(substrate: Arc<dyn Substrate>, handler: Arc<dyn NotificationHandler>) -> Self {
        Self {
            queue: NotificationsQueue::new(substrate.clone()),
            history: NotificationsHistory::new(substrate),
            handler,
        }
    }

    pub fn queue(&self) -> &NotificationsQueue {
        &self.queue
    }

    pub fn history(&self) -> &NotificationsHistory {
        &self.history
    }

    /// Validate and queue an event, returning its event id.
    pub async fn notify(&self, event: &MetadataNotification) -> NotificationResult<String> {
        event.validate()?;
        let event_id = self.queue.push(event).await?;
        tracing::info!(
            event_id = %event_id,
            coordinate = %event.coordinate(),
            priority = event.event_priority,
            "Queued notification"
        );
        Ok(event_id)
    }

    /// Claim every pending event, process it and record the outcome.
    ///
    /// Returns the number of events this call claimed. Events claimed by a
    /// concurrent caller are not counted. Claimed events are already off the
    /// queue, so a failure to record one outcome is logged and the rest of
    /// the batch is still processed.
    pub async fn handle(&self) -> NotificationResult<usize> {
        let claimed = self.queue.pull_all().await?;
        let count = claimed.len();

        for event in claimed {
            let event_id = event.event_id.clone();
            let coordinate = event.coordinate();
            let errors = match self.handler.handle(&event).await {
                Ok(errors) => errors,
                Err(e) => vec![e.to_string()],
            };
            if errors.is_empty() {
                tracing::info!(coordinate = %event.coordinate(), "Handled notification");
            } else {
                tracing::warn!(
                    coordinate = %event.coordinate(),
                    errors = ?errors,
                    "Notification handled with errors"
                );
            }
            // the history row is keyed by coordinate; the queue row id does not carry over
            let mut outcome = event.complete(errors);
            outcome.id = None;
            if let Err(e) = self.history.create_or_update(&outcome).await {
                tracing::error!(
                    event_id = ?event_id,
                    coordinate = %coordinate,
                    status = ?outcome.status,
                    errors = ?outcome.errors,
                    error = %e,
                    "Failed to record notification outcome"
                );
            }
        }
        Ok(count)
    }

    /// Purge history older than `days` days.
    pub async fn delete_old_notifications(&self, days: u32) -> NotificationResult<u64> {
        self.history.delete_old_notifications(days).await
    }

    pub async fn queue_size(&self) -> NotificationResult<usize> {
        self.queue.size().await
    }
}
