//! In-memory model of one project descriptor.

use crate::dependency::Dependency;
use crate::resolve::contains_token;
use serde::Serialize;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

pub const AGGREGATOR_PACKAGING: &str = "pom";

/// One descriptor as extracted from its document.
///
/// Identity is `groupId` + `artifactId`; the version is ignored, so two
/// descriptors that differ only in version are the same module. Parent
/// coordinates are the literal `<parent>` block; the linked parent node lives
/// in [`crate::tree::PomTree`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct Pom {
    pub(crate) path: PathBuf,
    #[serde(skip)]
    pub(crate) raw: String,
    pub(crate) group_id: String,
    pub(crate) artifact_id: String,
    pub(crate) version: String,
    pub(crate) packaging: String,
    pub(crate) parent_group_id: String,
    pub(crate) parent_artifact_id: String,
    pub(crate) parent_version: String,
    #[serde(rename = "properties")]
    pub(crate) raw_properties: BTreeMap<String, String>,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) modules: Vec<String>,
    pub(crate) repository_urls: Vec<String>,
    pub(crate) test_configurations: BTreeMap<String, String>,
    #[serde(skip)]
    resolved_properties: OnceCell<BTreeMap<String, String>>,
}

impl Pom {
    /// A descriptor with no content, used when extraction fails.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Canonicalised document text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn packaging(&self) -> &str {
        &self.packaging
    }

    pub fn parent_group_id(&self) -> &str {
        &self.parent_group_id
    }

    pub fn parent_artifact_id(&self) -> &str {
        &self.parent_artifact_id
    }

    pub fn parent_version(&self) -> &str {
        &self.parent_version
    }

    pub fn identity(&self) -> (&str, &str) {
        (&self.group_id, &self.artifact_id)
    }

    pub fn parent_identity(&self) -> (&str, &str) {
        (&self.parent_group_id, &self.parent_artifact_id)
    }

    /// `group:artifact`
    pub fn name(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// True iff all three parent coordinates are present.
    pub fn has_parent(&self) -> bool {
        !self.parent_group_id.is_empty()
            && !self.parent_artifact_id.is_empty()
            && !self.parent_version.is_empty()
    }

    pub fn is_aggregator(&self) -> bool {
        self.packaging == AGGREGATOR_PACKAGING
    }

    /// An empty identity is how a failed extraction shows up.
    pub fn is_empty(&self) -> bool {
        self.group_id.is_empty()
    }

    pub fn raw_properties(&self) -> &BTreeMap<String, String> {
        &self.raw_properties
    }

    pub fn raw_property(&self, name: &str) -> Option<&str> {
        self.raw_properties.get(name).map(String::as_str)
    }

    /// Properties whose values carry no interpolation token, computed once.
    ///
    /// Values that still reference `${...}` are left out rather than resolved;
    /// see [`crate::resolve::resolved_property`] for chain-aware lookups.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        self.resolved_properties.get_or_init(|| {
            self.raw_properties
                .iter()
                .filter(|(_, value)| !contains_token(value))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()
        })
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties().get(name).map(String::as_str)
    }

    /// Declared dependencies in document order, including managed ones.
    pub fn raw_dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn repository_urls(&self) -> &[String] {
        &self.repository_urls
    }

    pub fn test_configurations(&self) -> &BTreeMap<String, String> {
        &self.test_configurations
    }

    pub(crate) fn add_repository_url(&mut self, url: &str) {
        let url = if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{}/", url)
        };
        if !self.repository_urls.contains(&url) {
            self.repository_urls.push(url);
        }
    }
}

impl PartialEq for Pom {
    fn eq(&self, other: &Self) -> bool {
        self.group_id == other.group_id && self.artifact_id == other.artifact_id
    }
}

impl Eq for Pom {}

impl Hash for Pom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_id.hash(state);
        self.artifact_id.hash(state);
    }
}

impl fmt::Display for Pom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}
