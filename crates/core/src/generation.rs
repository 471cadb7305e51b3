//! Generated files attached to an artifact version.

use serde::{Deserialize, Serialize};

/// A single generated file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileGeneration {
    pub path: String,
    pub content: String,
}

impl FileGeneration {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A generated file stored against an artifact version.
///
/// `path` is the model element the file was generated from, `file.path` the
/// file's own location.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileGeneration {
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub generation_type: Option<String>,
    pub file: FileGeneration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
}

impl StoredFileGeneration {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version_id: impl Into<String>,
        file: FileGeneration,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version_id: version_id.into(),
            path: None,
            generation_type: None,
            file,
            created: None,
            updated: None,
        }
    }

    pub fn with_element_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_type(mut self, generation_type: impl Into<String>) -> Self {
        self.generation_type = Some(generation_type.into());
        self
    }
}
