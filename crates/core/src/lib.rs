//! Core domain types and shared logic for the metadata depot.
//!
//! This crate defines the records persisted by the store crates:
//! - Coordinate and version validation
//! - Entities, projects and project versions
//! - File generations, query metrics and schedule bookkeeping
//! - Metadata notifications
//! - Application configuration

pub mod artifact;
pub mod config;
pub mod coordinate;
pub mod dates;
pub mod entity;
pub mod error;
pub mod generation;
pub mod metrics;
pub mod notification;
pub mod project;
pub mod schedule;
pub mod version;

pub use artifact::{ArtifactFile, RefreshStatus};
pub use entity::{EntityDefinition, StoredEntity};
pub use error::{Error, Result};
pub use generation::{FileGeneration, StoredFileGeneration};
pub use metrics::VersionQueryMetric;
pub use notification::{MetadataEventStatus, MetadataNotification};
pub use project::{ProjectVersion, ProjectVersionData, StoreProjectData, StoreProjectVersionData};
pub use schedule::{ScheduleInfo, ScheduleInstance};
