//! Project registrations and project versions.

use crate::error::{Error, Result};
use crate::{coordinate, version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A `(groupId, artifactId, versionId)` coordinate triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVersion {
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
}

impl ProjectVersion {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version_id: version_id.into(),
        }
    }

    /// Parse a colon-joined `groupId:artifactId:versionId` coordinate.
    pub fn parse(coordinate: &str) -> Option<Self> {
        let mut parts = coordinate.split(':');
        let group_id = parts.next().filter(|s| !s.is_empty())?;
        let artifact_id = parts.next().filter(|s| !s.is_empty())?;
        let version_id = parts.next().filter(|s| !s.is_empty())?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(group_id, artifact_id, version_id))
    }
}

impl fmt::Display for ProjectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version_id)
    }
}

/// A registered project: binds a coordinate pair to a project identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreProjectData {
    pub project_id: String,
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
}

impl StoreProjectData {
    pub fn new(
        project_id: impl Into<String>,
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            default_branch: None,
            latest_version: None,
            created: None,
            updated: None,
        }
    }

    /// A project needs a non-blank identifier and valid coordinates.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty()
            || !coordinate::is_valid_group_id(&self.group_id)
            || !coordinate::is_valid_artifact_id(&self.artifact_id)
        {
            return Err(Error::InvalidProject(format!(
                "invalid project [{}] or invalid groupId [{}] or artifactId [{}]",
                self.project_id, self.group_id, self.artifact_id
            )));
        }
        Ok(())
    }
}

/// Per-version bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVersionData {
    /// Excluded versions do not take part in queries.
    #[serde(default)]
    pub excluded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ProjectVersion>,
}

/// A discovered version of a registered project.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreProjectVersionData {
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
    #[serde(default)]
    pub version_data: ProjectVersionData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
}

impl StoreProjectVersionData {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version_id: version_id.into(),
            version_data: ProjectVersionData::default(),
            created: None,
            updated: None,
        }
    }

    /// Mark the version as excluded with a reason.
    pub fn excluded(mut self, reason: impl Into<String>) -> Self {
        self.version_data.excluded = true;
        self.version_data.exclusion_reason = Some(reason.into());
        self
    }

    pub fn is_excluded(&self) -> bool {
        self.version_data.excluded
    }

    pub fn coordinate(&self) -> ProjectVersion {
        ProjectVersion::new(&self.group_id, &self.artifact_id, &self.version_id)
    }

    pub fn validate(&self) -> Result<()> {
        coordinate::validate_coordinates(&self.group_id, &self.artifact_id)?;
        version::validate(&self.version_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_colon_joined_coordinates() {
        let pv = ProjectVersion::parse("org.finos:depot:1.0.0").unwrap();
        assert_eq!(pv, ProjectVersion::new("org.finos", "depot", "1.0.0"));
        assert_eq!(pv.to_string(), "org.finos:depot:1.0.0");
        assert!(ProjectVersion::parse("g:a").is_none());
        assert!(ProjectVersion::parse("g::1.0.0").is_none());
        assert!(ProjectVersion::parse("g:a:1:2").is_none());
    }

    #[test]
    fn project_requires_identifier_and_coordinates() {
        assert!(StoreProjectData::new("P1", "g", "a").validate().is_ok());
        assert!(StoreProjectData::new(" ", "g", "a").validate().is_err());
        assert!(StoreProjectData::new("P1", "G", "a").validate().is_err());
    }

    #[test]
    fn excluded_flag_lives_under_version_data() {
        let data = StoreProjectVersionData::new("g", "a", "1.0.0").excluded("broken build");
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["versionData"]["excluded"], true);
        assert_eq!(value["versionData"]["exclusionReason"], "broken build");
        assert!(data.is_excluded());
    }

    #[test]
    fn equality_is_field_by_field() {
        let a = StoreProjectVersionData::new("g", "a", "1.0.0");
        let mut b = a.clone();
        assert_eq!(a, b);
        b.updated = Some(1);
        assert_ne!(a, b);
    }
}
