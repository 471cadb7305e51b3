//! Version identifiers and validation.
//!
//! A depot version is one of:
//! - a release version `x.y.z`
//! - an alias: `latest` (last released version) or `head` (latest unreleased revision)
//! - a branch snapshot `<branch>-SNAPSHOT`

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Suffix marking a branch snapshot version.
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Alias for the last released version.
pub const LATEST_VERSION_ALIAS: &str = "latest";

/// Alias for the latest unreleased revision.
pub const HEAD_VERSION_ALIAS: &str = "head";

/// Default branch name.
pub const MASTER_BRANCH: &str = "master";

/// Snapshot version of the default branch. Entities stored under this version
/// are the "latest" (unreleased) ones.
pub const MASTER_SNAPSHOT: &str = "master-SNAPSHOT";

/// Human readable description used in validation messages.
pub const VALID_VERSION_ID_TXT: &str = "a valid version string: x.y.z, master-SNAPSHOT or alias: \
     latest = last released version, head = latest unreleased revision";

/// Build the snapshot version of a branch.
pub fn branch_snapshot(branch: &str) -> String {
    format!("{branch}{SNAPSHOT_SUFFIX}")
}

/// A parsed `x.y.z` release version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VersionId {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionId {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for VersionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(Error::InvalidVersion(s.to_string()));
        }

        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            // u32::from_str accepts a leading '+', which is not a valid version component
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::InvalidVersion(s.to_string()));
            }
            *slot = part
                .parse()
                .map_err(|_| Error::InvalidVersion(s.to_string()))?;
        }

        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl PartialOrd for VersionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

/// True if the version is a branch snapshot (`<branch>-SNAPSHOT`).
pub fn is_snapshot_version(version_id: &str) -> bool {
    version_id
        .strip_suffix(SNAPSHOT_SUFFIX)
        .is_some_and(|branch| !branch.is_empty())
}

/// True if the version is a release version `x.y.z`.
pub fn is_valid_release_version(version_id: &str) -> bool {
    version_id.parse::<VersionId>().is_ok()
}

/// True if the version is one of the aliases.
pub fn is_alias(version_id: &str) -> bool {
    version_id == LATEST_VERSION_ALIAS || version_id == HEAD_VERSION_ALIAS
}

/// True if the version is a release, an alias or a branch snapshot.
pub fn is_valid(version_id: &str) -> bool {
    !version_id.is_empty()
        && (is_snapshot_version(version_id)
            || is_valid_release_version(version_id)
            || is_alias(version_id))
}

/// Validate a version string.
pub fn validate(version_id: &str) -> Result<()> {
    if is_valid(version_id) {
        Ok(())
    } else {
        Err(Error::InvalidVersion(format!(
            "'{version_id}', expected {VALID_VERSION_ID_TXT}"
        )))
    }
}
