//! Artifact files and refresh bookkeeping.

use serde::{Deserialize, Serialize};

/// A downloaded artifact file and its checksum.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactFile {
    pub path: String,
    pub check_sum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
}

impl ArtifactFile {
    pub fn new(path: impl Into<String>, check_sum: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            check_sum: check_sum.into(),
            created: None,
            updated: None,
        }
    }
}

/// Marks an artifact version as being refreshed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
}

impl RefreshStatus {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version_id: version_id.into(),
            event_id: None,
            parent_event_id: None,
            created: None,
            updated: None,
        }
    }

    pub fn with_events(mut self, event_id: Option<String>, parent_event_id: Option<String>) -> Self {
        self.event_id = event_id;
        self.parent_event_id = parent_event_id;
        self
    }
}
