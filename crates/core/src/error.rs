//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid groupId: {0}")]
    InvalidGroupId(String),

    #[error("invalid artifactId: {0}")]
    InvalidArtifactId(String),

    #[error("invalid versionId: {0}")]
    InvalidVersion(String),

    #[error("invalid entity path: {0}")]
    InvalidEntityPath(String),

    #[error("invalid project: {0}")]
    InvalidProject(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
