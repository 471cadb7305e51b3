//! Metadata notifications: events asking the depot to (re)process an artifact version.

use crate::error::Result;
use crate::project::ProjectVersion;
use crate::{coordinate, version};
use serde::{Deserialize, Serialize};

/// Default priority for events pushed without one. Lower runs first.
pub const DEFAULT_EVENT_PRIORITY: i32 = 5;

/// Terminal outcome of a handled notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetadataEventStatus {
    Success,
    Failed,
}

impl MetadataEventStatus {
    /// Wire name, as stored in the `status` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_success(success: bool) -> Self {
        if success { Self::Success } else { Self::Failed }
    }
}

/// A pending or recorded notification.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataNotification {
    /// Row key in the collection holding the notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Stable event identity, assigned on first push when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<String>,
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
    #[serde(default = "default_event_priority")]
    pub event_priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MetadataEventStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
}

fn default_event_priority() -> i32 {
    DEFAULT_EVENT_PRIORITY
}

impl MetadataNotification {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            event_id: None,
            parent_event_id: None,
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version_id: version_id.into(),
            event_priority: DEFAULT_EVENT_PRIORITY,
            status: None,
            errors: Vec::new(),
            created: None,
            updated: None,
        }
    }

    pub fn with_priority(mut self, event_priority: i32) -> Self {
        self.event_priority = event_priority;
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn with_parent_event_id(mut self, parent_event_id: impl Into<String>) -> Self {
        self.parent_event_id = Some(parent_event_id.into());
        self
    }

    /// Record a terminal outcome. Errors mark the event as failed.
    pub fn complete(mut self, errors: Vec<String>) -> Self {
        self.status = Some(MetadataEventStatus::from_success(errors.is_empty()));
        self.errors = errors;
        self
    }

    pub fn coordinate(&self) -> ProjectVersion {
        ProjectVersion::new(&self.group_id, &self.artifact_id, &self.version_id)
    }

    /// Events must name a valid coordinate and version before they are queued.
    pub fn validate(&self) -> Result<()> {
        coordinate::validate_coordinates(&self.group_id, &self.artifact_id)?;
        version::validate(&self.version_id)
    }
}
