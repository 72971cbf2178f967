//! Features and artifact coordinates

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::str::FromStr;

use crate::traits::ResolverError;

/// Artifact coordinate `group:artifact:version`
///
/// The slash form `group/artifact/version` is accepted as input as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

impl ArtifactId {
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
        }
    }
}

impl FromStr for ArtifactId {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parts: Vec<&str> = if s.contains('/') {
            s.split('/').collect()
        } else {
            s.split(':').collect()
        };

        match parts.as_slice() {
            [group, artifact, version] if parts.iter().all(|p| !p.is_empty()) => {
                Ok(Self::new(*group, *artifact, *version))
            }
            _ => Err(ResolverError::InvalidArtifactId(s.to_string())),
        }
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

impl Serialize for ArtifactId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ArtifactId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A named aggregate of modules and configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    /// Feature identity
    pub id: ArtifactId,
    /// Human-readable title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Module artifacts contained in this feature
    #[serde(default)]
    pub bundles: Vec<ArtifactId>,
    /// Configurations keyed by PID
    #[serde(default)]
    pub configurations: BTreeMap<String, serde_json::Value>,
}

impl Feature {
    pub fn new(id: ArtifactId) -> Self {
        Self {
            id,
            title: None,
            bundles: Vec::new(),
            configurations: BTreeMap::new(),
        }
    }

    pub fn with_bundle(mut self, bundle: ArtifactId) -> Self {
        self.bundles.push(bundle);
        self
    }

    /// Load a feature from its JSON descriptor
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ResolverError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl PartialEq for Feature {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Feature {}

impl Hash for Feature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
