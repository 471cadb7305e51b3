//! Domain repositories over the document engine.

pub mod artifacts;
pub mod entities;
pub mod generations;
pub mod metrics;
pub mod projects;
pub mod schedules;
pub mod versions;

pub use artifacts::{ArtifactFiles, ArtifactFilesRepo, RefreshStatusFilter, RefreshStatusRepo, RefreshStatuses};
pub use entities::{ClassifierQuery, Entities, EntitiesRepo};
pub use generations::{FileGenerations, FileGenerationsRepo};
pub use metrics::{QueryMetrics, QueryMetricsRepo};
pub use projects::{Projects, ProjectsRepo};
pub use schedules::{ScheduleInstances, ScheduleInstancesRepo, Schedules, SchedulesRepo};
pub use versions::{ProjectVersions, ProjectVersionsRepo};

use crate::query::fields;
use crate::substrate::SchemaField;
use serde::{Deserialize, Serialize};

/// Outcome of a batch write or delete.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOperationResult {
    pub inserted_count: u64,
    pub modified_count: u64,
    pub deleted_count: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl StoreOperationResult {
    pub fn deleted(count: u64) -> Self {
        Self {
            deleted_count: count,
            ..Self::default()
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn log_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn combine(&mut self, other: StoreOperationResult) {
        self.inserted_count += other.inserted_count;
        self.modified_count += other.modified_count;
        self.deleted_count += other.deleted_count;
        self.errors.extend(other.errors);
    }
}

/// `groupId`, `artifactId` and `versionId` as sortable tags.
pub(crate) fn coordinate_fields() -> Vec<SchemaField> {
    vec![
        SchemaField::sortable_tag(fields::GROUP_ID),
        SchemaField::sortable_tag(fields::ARTIFACT_ID),
        SchemaField::sortable_tag(fields::VERSION_ID),
    ]
}
