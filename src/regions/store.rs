//! Region membership index
//!
//! Read-only view over the four membership property files. Built once, then
//! shared between resolve calls behind an `Arc`.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info};

use crate::config::RegionConfig;
use crate::model::namespace::GLOBAL_REGION;
use crate::model::{ModuleIdentity, Version};
use crate::regions::properties::{load_properties, split_list};
use crate::traits::ResolverError;

/// Frozen feature, region and package membership maps
///
/// A missing entry means the store says nothing about that key, which the
/// region filter treats as unclassified.
#[derive(Debug, Clone, Default)]
pub struct MembershipIndex {
    /// (symbolic name, version) to the artifact ids carrying that identity
    identities: HashMap<(String, Version), Vec<String>>,
    /// artifact id to features
    bundle_features: HashMap<String, BTreeSet<String>>,
    /// feature to regions
    feature_regions: HashMap<String, BTreeSet<String>>,
    /// region to packages
    region_packages: HashMap<String, BTreeSet<String>>,
}

impl MembershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index from the configured directory
    pub fn from_config(config: &RegionConfig) -> Result<Self, ResolverError> {
        Self::load(&config.data_dir(), config)
    }

    /// Load the index from `dir` using the file names of `config`
    ///
    /// Absent files are empty maps. Malformed `symbolicName~version` entries
    /// are rejected.
    pub fn load(dir: &Path, config: &RegionConfig) -> Result<Self, ResolverError> {
        let mut index = Self::new();

        let id_file = dir.join(&config.id_bsnver_file);
        for (artifact, bsnver) in load_properties(&id_file)?.unwrap_or_default() {
            let (bsn, version) = parse_bsnver(&bsnver).map_err(|reason| {
                ResolverError::InvalidMembership {
                    file: id_file.clone(),
                    reason: format!("{}: {}", artifact, reason),
                }
            })?;
            index = index.with_identity(artifact, bsn, version);
        }

        for (artifact, features) in load_properties(&dir.join(&config.bundles_file))?.unwrap_or_default() {
            index = index.with_bundle_features(artifact, split_list(&features));
        }
        for (feature, regions) in load_properties(&dir.join(&config.features_file))?.unwrap_or_default() {
            index = index.with_feature_regions(feature, split_list(&regions));
        }
        for (region, packages) in load_properties(&dir.join(&config.regions_file))?.unwrap_or_default() {
            index = index.with_region_packages(region, split_list(&packages));
        }

        info!(
            "Loaded region membership from {:?}: {} identities, {} bundles, {} features, {} regions",
            dir,
            index.identities.len(),
            index.bundle_features.len(),
            index.feature_regions.len(),
            index.region_packages.len()
        );
        Ok(index)
    }

    /// Record that `artifact` carries the identity `symbolic_name~version`
    pub fn with_identity(mut self, artifact: impl Into<String>, symbolic_name: impl Into<String>, version: Version) -> Self {
        let aliases = self
            .identities
            .entry((symbolic_name.into(), version))
            .or_default();
        let artifact = artifact.into();
        if !aliases.contains(&artifact) {
            aliases.push(artifact);
        }
        self
    }

    pub fn with_bundle_features<I, S>(mut self, artifact: impl Into<String>, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bundle_features
            .entry(artifact.into())
            .or_default()
            .extend(features.into_iter().map(Into::into));
        self
    }

    pub fn with_feature_regions<I, S>(mut self, feature: impl Into<String>, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_regions
            .entry(feature.into())
            .or_default()
            .extend(regions.into_iter().map(Into::into));
        self
    }

    pub fn with_region_packages<I, S>(mut self, region: impl Into<String>, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.region_packages
            .entry(region.into())
            .or_default()
            .extend(packages.into_iter().map(Into::into));
        self
    }

    /// Artifact ids carrying `identity`
    pub fn aliases_of(&self, identity: &ModuleIdentity) -> &[String] {
        self.identities
            .get(&(identity.symbolic_name.clone(), identity.version.clone()))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Union of the features of every alias of `identity`
    pub fn features_of(&self, identity: &ModuleIdentity) -> BTreeSet<&str> {
        let features: BTreeSet<&str> = self
            .aliases_of(identity)
            .iter()
            .filter_map(|artifact| self.bundle_features.get(artifact))
            .flatten()
            .map(String::as_str)
            .collect();
        debug!("Features of {}: {:?}", identity, features);
        features
    }

    /// Regions of `feature`; `None` when the feature has no region entry
    pub fn regions_of(&self, feature: &str) -> Option<&BTreeSet<String>> {
        self.feature_regions.get(feature)
    }

    /// Packages of `region`; `None` when the region is unknown
    pub fn packages_of(&self, region: &str) -> Option<&BTreeSet<String>> {
        self.region_packages.get(region)
    }

    /// Package listed in the reserved global region
    pub fn is_global(&self, package: &str) -> bool {
        self.packages_of(GLOBAL_REGION)
            .map_or(false, |packages| packages.contains(package))
    }

    /// Package visible globally or through one of `regions`
    pub fn is_visible_in<'a>(&self, package: &str, mut regions: impl Iterator<Item = &'a str>) -> bool {
        self.is_global(package)
            || regions.any(|region| {
                self.packages_of(region)
                    .map_or(false, |packages| packages.contains(package))
            })
    }
}

fn parse_bsnver(value: &str) -> Result<(String, Version), String> {
    let (bsn, version) = value
        .split_once('~')
        .ok_or_else(|| format!("expected symbolicName~version, got {}", value))?;
    let bsn = bsn.trim();
    if bsn.is_empty() {
        return Err(format!("empty symbolic name in {}", value));
    }
    let version = version.parse::<Version>().map_err(|e| e.to_string())?;
    Ok((bsn.to_string(), version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn identity(name: &str, version: Version) -> ModuleIdentity {
        ModuleIdentity::new("g", name, version)
    }

    #[test]
    fn test_features_union_over_aliases() {
        let index = MembershipIndex::new()
            .with_identity("g:a:1", "org.a", Version::new(1, 0, 0))
            .with_identity("g:a-shaded:1", "org.a", Version::new(1, 0, 0))
            .with_bundle_features("g:a:1", ["f1"])
            .with_bundle_features("g:a-shaded:1", ["f2", "f1"]);

        let features = index.features_of(&identity("org.a", Version::new(1, 0, 0)));
        assert_eq!(features.into_iter().collect::<Vec<_>>(), vec!["f1", "f2"]);
        assert!(index
            .features_of(&identity("org.a", Version::new(2, 0, 0)))
            .is_empty());
    }

    #[test]
    fn test_visibility_lookup() {
        let index = MembershipIndex::new()
            .with_region_packages("global", ["org.slf4j"])
            .with_region_packages("r1", ["org.p"]);
        assert!(index.is_global("org.slf4j"));
        assert!(index.is_visible_in("org.p", ["r1"].into_iter()));
        assert!(!index.is_visible_in("org.p", ["r2"].into_iter()));
        assert!(index.is_visible_in("org.slf4j", std::iter::empty()));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("idbsnver.properties"),
            "g\\:a\\:1=org.a~1.0.0\n",
        )
        .unwrap();
        fs::write(dir.path().join("bundles.properties"), "g\\:a\\:1=f1,f2\n").unwrap();
        fs::write(dir.path().join("features.properties"), "f1=r1\n").unwrap();
        // regions.properties intentionally absent

        let index = MembershipIndex::load(dir.path(), &RegionConfig::default()).unwrap();
        let features = index.features_of(&identity("org.a", Version::new(1, 0, 0)));
        assert_eq!(features.len(), 2);
        assert!(index.regions_of("f1").unwrap().contains("r1"));
        assert!(index.regions_of("f2").is_none());
        assert!(index.packages_of("r1").is_none());
    }

    #[test]
    fn test_malformed_identity_entry() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("idbsnver.properties"), "a=no-tilde\n").unwrap();
        let err = MembershipIndex::load(dir.path(), &RegionConfig::default()).unwrap_err();
        assert!(matches!(err, ResolverError::InvalidMembership { .. }));
    }
}
