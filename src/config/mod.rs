//! Configuration management for feature-resolver
//!
//! Handles configuration loading and validation for the orderer, the
//! synthetic modules it adds, and the region membership store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::filter::DEFAULT_FILTER_CACHE_CAPACITY;
use crate::model::{ArtifactId, Version};
use crate::regions::UnclassifiedPolicy;
use crate::registry::manifest::ExportEntry;
use crate::utils::env_opt;

/// Environment variable overriding [`RegionConfig::data_dir`]
pub const REGIONS_DIR_ENV: &str = "FEATURE_RESOLVER_REGIONS_DIR";

/// Module repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRepositoryConfig {
    /// Directory containing module manifests
    #[serde(default = "default_modules_dir")]
    pub modules_dir: String,

    /// Reject manifests that fail validation instead of logging a warning
    #[serde(default)]
    pub strict_validation: bool,
}

fn default_modules_dir() -> String {
    "modules".to_string()
}

impl Default for ModuleRepositoryConfig {
    fn default() -> Self {
        Self {
            modules_dir: "modules".to_string(),
            strict_validation: false,
        }
    }
}

/// The platform module every other module may wire to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkConfig {
    #[serde(default = "default_framework_name")]
    pub symbolic_name: String,

    #[serde(default = "default_framework_version")]
    pub version: String,

    /// Packages exported by the platform
    #[serde(default = "default_framework_exports")]
    pub exports: Vec<ExportEntry>,
}

fn default_framework_name() -> String {
    "org.apache.felix.framework".to_string()
}

fn default_framework_version() -> String {
    "6.0.1".to_string()
}

fn export(name: &str, version: &str) -> ExportEntry {
    ExportEntry {
        name: name.to_string(),
        version: version.to_string(),
    }
}

fn default_framework_exports() -> Vec<ExportEntry> {
    vec![
        export("org.osgi.dto", "1.1.0"),
        export("org.osgi.framework", "1.9.0"),
        export("org.osgi.framework.dto", "1.8.0"),
        export("org.osgi.framework.hooks.resolver", "1.0.0"),
        export("org.osgi.framework.hooks.service", "1.1.0"),
        export("org.osgi.framework.launch", "1.2.0"),
        export("org.osgi.framework.namespace", "1.1.0"),
        export("org.osgi.framework.startlevel", "1.0.0"),
        export("org.osgi.framework.wiring", "1.2.0"),
        export("org.osgi.resource", "1.0.0"),
        export("org.osgi.service.packageadmin", "1.2.0"),
        export("org.osgi.service.resolver", "1.1.0"),
        export("org.osgi.service.startlevel", "1.1.0"),
        export("org.osgi.service.url", "1.0.0"),
        export("org.osgi.util.tracker", "1.5.2"),
    ]
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            symbolic_name: default_framework_name(),
            version: default_framework_version(),
            exports: default_framework_exports(),
        }
    }
}

/// Launcher API module, always part of the candidate pool
///
/// Its manifest is taken from the module repository when present; the
/// exports listed here are used otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchApiConfig {
    #[serde(default = "default_launch_api_artifact")]
    pub artifact: String,

    #[serde(default = "default_launch_api_exports")]
    pub exports: Vec<ExportEntry>,
}

fn default_launch_api_artifact() -> String {
    "org.apache.sling:org.apache.sling.launchpad.api:1.2.0".to_string()
}

fn default_launch_api_exports() -> Vec<ExportEntry> {
    vec![export("org.apache.sling.launchpad.api", "1.2.0")]
}

impl Default for LaunchApiConfig {
    fn default() -> Self {
        Self {
            artifact: default_launch_api_artifact(),
            exports: default_launch_api_exports(),
        }
    }
}

/// Region membership store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Directory holding the property files
    #[serde(default = "default_regions_dir")]
    pub data_dir: String,

    /// `artifactId = symbolicName~version`
    #[serde(default = "default_id_bsnver_file")]
    pub id_bsnver_file: String,

    /// `artifactId = feature,...`
    #[serde(default = "default_bundles_file")]
    pub bundles_file: String,

    /// `featureId = region,...`
    #[serde(default = "default_features_file")]
    pub features_file: String,

    /// `regionId = package,...`
    #[serde(default = "default_regions_file")]
    pub regions_file: String,

    /// How providers without classification are treated
    #[serde(default)]
    pub unclassified: UnclassifiedPolicy,
}

fn default_regions_dir() -> String {
    "regions".to_string()
}

fn default_id_bsnver_file() -> String {
    "idbsnver.properties".to_string()
}

fn default_bundles_file() -> String {
    "bundles.properties".to_string()
}

fn default_features_file() -> String {
    "features.properties".to_string()
}

fn default_regions_file() -> String {
    "regions.properties".to_string()
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            data_dir: default_regions_dir(),
            id_bsnver_file: default_id_bsnver_file(),
            bundles_file: default_bundles_file(),
            features_file: default_features_file(),
            regions_file: default_regions_file(),
            unclassified: UnclassifiedPolicy::default(),
        }
    }
}

impl RegionConfig {
    /// Config reading the default file names from `dir`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            data_dir: dir.as_ref().to_string_lossy().into_owned(),
            ..Self::default()
        }
    }

    /// Effective data directory, the environment override winning
    pub fn data_dir(&self) -> PathBuf {
        env_opt(REGIONS_DIR_ENV)
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&self.data_dir))
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (field, name) in [
            ("id_bsnver_file", &self.id_bsnver_file),
            ("bundles_file", &self.bundles_file),
            ("features_file", &self.features_file),
            ("regions_file", &self.regions_file),
        ] {
            if name.trim().is_empty() {
                return Err(anyhow::anyhow!("regions.{} must not be empty", field));
            }
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "feature_resolver=debug"); RUST_LOG wins
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (needs the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub modules: ModuleRepositoryConfig,

    #[serde(default)]
    pub framework: FrameworkConfig,

    #[serde(default)]
    pub launch_api: LaunchApiConfig,

    /// Region visibility filtering; disabled when absent
    #[serde(default)]
    pub regions: Option<RegionConfig>,

    #[serde(default)]
    pub logging: Option<LoggingConfig>,

    /// Number of compiled filters kept in memory
    #[serde(default = "default_filter_cache_capacity")]
    pub filter_cache_capacity: u64,
}

fn default_filter_cache_capacity() -> u64 {
    DEFAULT_FILTER_CACHE_CAPACITY
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            modules: ModuleRepositoryConfig::default(),
            framework: FrameworkConfig::default(),
            launch_api: LaunchApiConfig::default(),
            regions: None,
            logging: None,
            filter_cache_capacity: DEFAULT_FILTER_CACHE_CAPACITY,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ResolverConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ResolverConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.modules.modules_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("modules.modules_dir must not be empty"));
        }

        if self.framework.symbolic_name.trim().is_empty() {
            return Err(anyhow::anyhow!("framework.symbolic_name must not be empty"));
        }
        self.framework
            .version
            .parse::<Version>()
            .map_err(|e| anyhow::anyhow!("framework.version: {}", e))?;

        self.launch_api
            .artifact
            .parse::<ArtifactId>()
            .map_err(|e| anyhow::anyhow!("launch_api.artifact: {}", e))?;

        for export in self.framework.exports.iter().chain(&self.launch_api.exports) {
            export
                .version
                .parse::<Version>()
                .map_err(|e| anyhow::anyhow!("export {}: {}", export.name, e))?;
        }

        if self.filter_cache_capacity == 0 {
            return Err(anyhow::anyhow!(
                "filter_cache_capacity must be greater than 0"
            ));
        }

        if let Some(ref regions) = self.regions {
            regions.validate()?;
        }

        Ok(())
    }
}
