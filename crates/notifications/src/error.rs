//! Error types for the notification queue.

use depot_store::StoreError;
use thiserror::Error;

/// Notification error type.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("handler failed for {event}: {message}")]
    Handler { event: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<depot_core::Error> for NotificationError {
    fn from(err: depot_core::Error) -> Self {
        NotificationError::Store(err.into())
    }
}

/// Result type alias for notification operations.
pub type NotificationResult<T> = std::result::Result<T, NotificationError>;
