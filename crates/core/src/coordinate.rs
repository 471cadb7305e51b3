//! Maven-style coordinate validation.
//!
//! A groupId is a dot-separated list of segments (`org.finos.legend`), an
//! artifactId is a dash-separated list of segments (`depot-store`). Every
//! segment starts with a lowercase ASCII letter followed by lowercase letters,
//! digits or underscores.

use crate::error::{Error, Result};

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {
            chars.all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
        }
        _ => false,
    }
}

/// Check a groupId such as `org.finos.legend`.
pub fn is_valid_group_id(group_id: &str) -> bool {
    !group_id.is_empty() && group_id.split('.').all(is_valid_segment)
}

/// Check an artifactId such as `legend-depot`.
pub fn is_valid_artifact_id(artifact_id: &str) -> bool {
    !artifact_id.is_empty() && artifact_id.split('-').all(is_valid_segment)
}

/// Validate a `(groupId, artifactId)` pair.
pub fn validate_coordinates(group_id: &str, artifact_id: &str) -> Result<()> {
    if !is_valid_group_id(group_id) {
        return Err(Error::InvalidGroupId(group_id.to_string()));
    }
    if !is_valid_artifact_id(artifact_id) {
        return Err(Error::InvalidArtifactId(artifact_id.to_string()));
    }
    Ok(())
}
