//! Stored entities.
//!
//! An entity is a model element identified by a `::`-separated path
//! (`meta::pure::profiles::doc`). The last segment is the element name, the
//! rest is its package.

use crate::error::{Error, Result};
use crate::{coordinate, version};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Separator between package segments in entity paths.
pub const PACKAGE_SEPARATOR: &str = "::";

/// Content key holding the entity package.
pub const PACKAGE_KEY: &str = "package";

fn is_valid_path_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '~'))
}

/// Check an entity path: at least one package segment and a name.
pub fn is_valid_entity_path(path: &str) -> bool {
    let segments: Vec<&str> = path.split(PACKAGE_SEPARATOR).collect();
    segments.len() >= 2 && segments.iter().all(|s| is_valid_path_segment(s))
}

/// Package portion of an entity path, if it has one.
pub fn package_of(path: &str) -> Option<&str> {
    path.rsplit_once(PACKAGE_SEPARATOR).map(|(package, _)| package)
}

/// An entity definition as produced by the model compiler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
    pub path: String,
    pub classifier_path: String,
    #[serde(default)]
    pub content: Map<String, Value>,
}

impl EntityDefinition {
    /// Build a definition, filling the `package` content key from the path when absent.
    pub fn new(
        path: impl Into<String>,
        classifier_path: impl Into<String>,
        mut content: Map<String, Value>,
    ) -> Self {
        let path = path.into();
        if !content.contains_key(PACKAGE_KEY)
            && let Some(package) = package_of(&path)
        {
            content.insert(PACKAGE_KEY.to_string(), Value::String(package.to_string()));
        }
        Self {
            path,
            classifier_path: classifier_path.into(),
            content,
        }
    }

    /// The entity package, as recorded in its content.
    pub fn package(&self) -> Option<&str> {
        self.content.get(PACKAGE_KEY).and_then(Value::as_str)
    }
}

/// An entity stored against an artifact version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntity {
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
    #[serde(default)]
    pub versioned_entity: bool,
    pub entity: EntityDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
}

impl StoredEntity {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version_id: impl Into<String>,
        entity: EntityDefinition,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version_id: version_id.into(),
            versioned_entity: false,
            entity,
            created: None,
            updated: None,
        }
    }

    pub fn versioned(mut self, versioned_entity: bool) -> Self {
        self.versioned_entity = versioned_entity;
        self
    }

    /// Copy without the entity content, used for summary listings.
    pub fn summary(&self) -> Self {
        let mut summary = self.clone();
        summary.entity.content = Map::new();
        summary
    }

    /// Validate coordinates, version and entity path, collecting every violation.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !coordinate::is_valid_group_id(&self.group_id) {
            errors.push(Error::InvalidGroupId(self.group_id.clone()).to_string());
        }
        if !coordinate::is_valid_artifact_id(&self.artifact_id) {
            errors.push(Error::InvalidArtifactId(self.artifact_id.clone()).to_string());
        }
        if !version::is_valid(&self.version_id) {
            errors.push(Error::InvalidVersion(self.version_id.clone()).to_string());
        }
        if !is_valid_entity_path(&self.entity.path) {
            errors.push(Error::InvalidEntityPath(self.entity.path.clone()).to_string());
        }
        errors
    }

    /// Validate, failing with the first violation.
    pub fn validate(&self) -> Result<()> {
        coordinate::validate_coordinates(&self.group_id, &self.artifact_id)?;
        version::validate(&self.version_id)?;
        if !is_valid_entity_path(&self.entity.path) {
            return Err(Error::InvalidEntityPath(self.entity.path.clone()));
        }
        Ok(())
    }
}
