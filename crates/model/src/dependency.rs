//! Dependency coordinates as declared in a descriptor.

use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

pub const RELEASE: &str = "RELEASE";
pub const LATEST: &str = "LATEST";
pub const SNAPSHOT_SUFFIX: &str = "SNAPSHOT";

/// A `groupId`/`artifactId`/`version` triple.
///
/// Two coordinates are the same dependency when group and artifact match; the
/// version takes no part in equality or hashing. An empty version means the
/// version is managed elsewhere.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Dependency {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    /// `group/artifact`
    pub fn name(&self) -> String {
        format!("{}/{}", self.group_id, self.artifact_id)
    }

    pub fn has_version(&self) -> bool {
        !self.version.is_empty()
    }

    /// True for versions that do not pin a reproducible artifact.
    pub fn is_dynamic(&self) -> bool {
        is_dynamic_version(&self.version)
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: version.into(),
        }
    }
}

pub fn is_dynamic_version(version: &str) -> bool {
    version == RELEASE || version == LATEST || version.ends_with(SNAPSHOT_SUFFIX)
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.group_id == other.group_id && self.artifact_id == other.artifact_id
    }
}

impl Eq for Dependency {}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_id.hash(state);
        self.artifact_id.hash(state);
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}:{}", self.group_id, self.artifact_id)
        } else {
            write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
        }
    }
}
