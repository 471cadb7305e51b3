//! Document store for the metadata depot.
//!
//! This crate provides:
//! - A substrate abstraction over secondary-indexed JSON documents
//!   (in-memory and SQLite backends)
//! - A query condition builder producing the substrate filter syntax
//! - A generic document engine parameterized by a per-collection strategy
//! - Domain repositories built on that engine
//! - Index administration over an explicit collection registry

pub mod admin;
pub mod engine;
pub mod error;
pub mod query;
pub mod repos;
pub mod substrate;

pub use admin::{AdminStore, CollectionRegistry, RegisteredCollection};
pub use engine::{Collection, DocumentStore};
pub use error::{StoreError, StoreResult};
pub use query::QueryBuilder;
pub use substrate::{MemorySubstrate, SqliteSubstrate, Substrate, TracedSubstrate};

use depot_core::config::{StoreConfig, SubstrateConfig};
use std::sync::Arc;

/// Create a substrate from configuration.
pub async fn from_config(config: &StoreConfig) -> StoreResult<Arc<dyn Substrate>> {
    config.validate().map_err(StoreError::Config)?;

    let substrate: Arc<dyn Substrate> = match &config.backend {
        SubstrateConfig::Memory => {
            tracing::info!("Using in-memory substrate");
            Arc::new(MemorySubstrate::new())
        }
        SubstrateConfig::Sqlite {
            path,
            query_timeout_secs,
        } => {
            tracing::info!(path = %path.display(), "Using SQLite substrate");
            Arc::new(SqliteSubstrate::new(path, *query_timeout_secs).await?)
        }
    };

    if config.tracing {
        Ok(Arc::new(TracedSubstrate::new(substrate)))
    } else {
        Ok(substrate)
    }
}
