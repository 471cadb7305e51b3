//! Version query metrics.

use crate::project::ProjectVersion;
use serde::{Deserialize, Serialize};

/// One observation of a version being queried.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionQueryMetric {
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
    /// Epoch milliseconds of the query.
    pub last_query_time: i64,
}

impl VersionQueryMetric {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version_id: impl Into<String>,
        last_query_time: i64,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version_id: version_id.into(),
            last_query_time,
        }
    }

    pub fn coordinate(&self) -> ProjectVersion {
        ProjectVersion::new(&self.group_id, &self.artifact_id, &self.version_id)
    }
}
