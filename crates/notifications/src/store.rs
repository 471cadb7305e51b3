//! Index management for the notification collections.

use crate::error::NotificationResult;
use crate::history::NotificationHistory;
use crate::queue::PendingNotifications;
use depot_store::engine::ensure_index;
use depot_store::substrate::Substrate;
use depot_store::{Collection, CollectionRegistry};
use std::sync::Arc;

/// Creates the notification indexes and registers the notification
/// collections with the depot registry.
#[derive(Clone)]
pub struct NotificationsStore {
    substrate: Arc<dyn Substrate>,
}

impl NotificationsStore {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self { substrate }
    }

    /// Add the history and pending queue collections to `registry`.
    pub fn register(registry: &mut CollectionRegistry) {
        registry
            .register::<NotificationHistory>()
            .register::<PendingNotifications>();
    }

    /// Create both indexes if missing and return their names.
    pub async fn create_indexes(&self) -> NotificationResult<Vec<String>> {
        let mut names = Vec::with_capacity(2);
        for (name, definition) in [
            (NotificationHistory::index_name(), NotificationHistory::index_definition()),
            (PendingNotifications::index_name(), PendingNotifications::index_definition()),
        ] {
            ensure_index(self.substrate.as_ref(), &name, &definition).await?;
            names.push(name);
        }
        Ok(names)
    }
}
