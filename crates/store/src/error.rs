//! Document store error types.

use thiserror::Error;

/// Document store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("found {matches} matches for {query} in collection {collection}")]
    Consistency {
        collection: String,
        query: String,
        matches: usize,
    },

    #[error("unknown index: {0}")]
    UnknownIndex(String),

    #[error("index already exists: {0}")]
    IndexExists(String),

    #[error("invalid query: {0}")]
    Query(String),

    #[error("substrate rejected operation on key '{key}': {message}")]
    Substrate { key: String, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<depot_core::Error> for StoreError {
    fn from(err: depot_core::Error) -> Self {
        match err {
            depot_core::Error::Config(msg) => StoreError::Config(msg),
            other => StoreError::Validation(other.to_string()),
        }
    }
}

/// Result type for document store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_become_validation_errors() {
        let err: StoreError = depot_core::Error::InvalidVersion("1.a.2".to_string()).into();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(err.to_string().contains("1.a.2"));
    }

    #[test]
    fn test_consistency_message_names_collection() {
        let err = StoreError::Consistency {
            collection: "projects".to_string(),
            query: "@groupId:{ g } ".to_string(),
            matches: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("projects"));
        assert!(msg.contains("2 matches"));
    }
}
