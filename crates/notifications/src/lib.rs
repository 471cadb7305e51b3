//! Notification queue for the metadata depot.
//!
//! Notifications ask the depot to (re)process an artifact version. They wait
//! in a pending queue ordered by priority and age, are claimed by workers
//! through atomic deletes, and end up in a history collection with their
//! outcome.

pub mod error;
pub mod handler;
pub mod history;
pub mod manager;
pub mod queue;
pub mod store;

pub use error::{NotificationError, NotificationResult};
pub use handler::{NotificationHandler, VersionRegistrar};
pub use history::{NotificationFilter, NotificationsHistory};
pub use manager::NotificationsManager;
pub use queue::NotificationsQueue;
pub use store::NotificationsStore;
