//! Module manifest parsing
//!
//! Handles parsing module.toml manifests and turning them into graph modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::model::module::{bundle_capability, package_capability};
use crate::model::namespace::{
    BUNDLE_NAMESPACE, BUNDLE_VERSION_ATTRIBUTE, FILTER_DIRECTIVE, HOST_NAMESPACE,
    PACKAGE_NAMESPACE, RESOLUTION_DIRECTIVE, RESOLUTION_OPTIONAL, VERSION_ATTRIBUTE,
};
use crate::model::{
    AttributeValue, Attributes, Capability, Directives, Module, ModuleIdentity, PackageExport,
    Requirement, Version, VersionRange,
};
use crate::traits::ResolverError;

/// Module manifest (module.toml structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Symbolic name, unique per version
    pub symbolic_name: String,
    /// Module version (`major.minor.micro[.qualifier]`)
    pub version: String,
    /// Artifact group
    #[serde(default)]
    pub group: Option<String>,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Exported packages
    #[serde(default)]
    pub exports: Vec<ExportEntry>,
    /// Imported packages
    #[serde(default)]
    pub imports: Vec<ImportEntry>,
    /// Host this fragment attaches to
    #[serde(default)]
    pub fragment_host: Option<HostEntry>,
    /// Capabilities outside the package/bundle namespaces
    #[serde(default)]
    pub capabilities: Vec<GenericEntry>,
    /// Requirements outside the package/host namespaces
    #[serde(default)]
    pub requirements: Vec<GenericEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportEntry {
    pub name: String,
    #[serde(default = "default_export_version")]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEntry {
    pub name: String,
    /// Version range, `[1.0,2.0)` or a bare lower bound
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEntry {
    pub symbolic_name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Capability or requirement in an arbitrary namespace
///
/// Attribute keys may carry a type suffix: `size:Long`, `version:Version`,
/// `names:List<String>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericEntry {
    pub namespace: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub directives: BTreeMap<String, String>,
}

fn default_export_version() -> String {
    "0.0.0".to_string()
}

impl ModuleManifest {
    /// Load manifest from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ResolverError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ResolverError::InvalidManifest(format!(
                "Failed to read manifest file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ResolverError> {
        let manifest: ModuleManifest = toml::from_str(contents).map_err(|e| {
            ResolverError::InvalidManifest(format!("Failed to parse manifest TOML: {}", e))
        })?;

        if manifest.symbolic_name.trim().is_empty() {
            return Err(ResolverError::InvalidManifest(
                "Symbolic name cannot be empty".to_string(),
            ));
        }

        Ok(manifest)
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment_host.is_some()
    }

    pub fn identity(&self) -> Result<ModuleIdentity, ResolverError> {
        Ok(ModuleIdentity::new(
            self.group.clone().unwrap_or_default(),
            self.symbolic_name.trim(),
            self.version.parse()?,
        ))
    }

    /// Convert to a graph module
    ///
    /// Non-fragments also provide the bundle and host capabilities under their
    /// symbolic name, so that other modules and fragments can target them.
    pub fn to_module(&self) -> Result<Module, ResolverError> {
        let identity = self.identity()?;

        let mut capabilities = Vec::new();
        for export in &self.exports {
            let export = PackageExport::new(export.name.trim(), export.version.parse()?);
            capabilities.push(package_capability(&identity, &export));
        }
        if !self.is_fragment() {
            capabilities.push(bundle_capability(BUNDLE_NAMESPACE, &identity));
            capabilities.push(bundle_capability(HOST_NAMESPACE, &identity));
        }
        for entry in &self.capabilities {
            capabilities.push(Capability::new(
                entry.namespace.as_str(),
                typed_attributes(&entry.attributes)?,
                entry.directives.clone(),
            ));
        }

        let mut requirements = Vec::new();
        for import in &self.imports {
            requirements.push(import_requirement(import)?);
        }
        if let Some(host) = &self.fragment_host {
            requirements.push(host_requirement(host)?);
        }
        for entry in &self.requirements {
            requirements.push(Requirement::new(
                entry.namespace.as_str(),
                typed_attributes(&entry.attributes)?,
                entry.directives.clone(),
            ));
        }

        Ok(Module::new(identity, capabilities, requirements))
    }
}

fn parse_range(range: Option<&str>) -> Result<Option<VersionRange>, ResolverError> {
    range
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::parse)
        .transpose()
}

/// `(&(osgi.wiring.package=name)<range>)`, or just the name clause
fn import_requirement(import: &ImportEntry) -> Result<Requirement, ResolverError> {
    let name = import.name.trim();
    let clause = format!("({}={})", PACKAGE_NAMESPACE, name);
    let filter = match parse_range(import.version.as_deref())? {
        Some(range) => format!("(&{}{})", clause, range.to_filter_string(VERSION_ATTRIBUTE)),
        None => clause,
    };

    let mut directives = Directives::new();
    directives.insert(FILTER_DIRECTIVE.to_string(), filter);
    if import.optional {
        directives.insert(RESOLUTION_DIRECTIVE.to_string(), RESOLUTION_OPTIONAL.to_string());
    }
    Ok(Requirement::new(PACKAGE_NAMESPACE, Attributes::new(), directives))
}

/// Host requirement of a fragment
///
/// The host's symbolic name is kept as an attribute too, for lookups that
/// don't evaluate the filter.
fn host_requirement(host: &HostEntry) -> Result<Requirement, ResolverError> {
    let name = host.symbolic_name.trim();
    let clause = format!("({}={})", HOST_NAMESPACE, name);
    let filter = match parse_range(host.version.as_deref())? {
        Some(range) => format!(
            "(&{}{})",
            clause,
            range.to_filter_string(BUNDLE_VERSION_ATTRIBUTE)
        ),
        None => clause,
    };

    let mut attributes = Attributes::new();
    attributes.insert(HOST_NAMESPACE.to_string(), AttributeValue::from(name));
    let mut directives = Directives::new();
    directives.insert(FILTER_DIRECTIVE.to_string(), filter);
    Ok(Requirement::new(HOST_NAMESPACE, attributes, directives))
}

/// Convert raw TOML attribute values, honouring `key:Type` suffixes
fn typed_attributes(raw: &BTreeMap<String, toml::Value>) -> Result<Attributes, ResolverError> {
    let mut attributes = Attributes::new();
    for (key, value) in raw {
        let (name, kind) = match key.split_once(':') {
            Some((name, kind)) => (name.trim(), Some(kind.trim())),
            None => (key.trim(), None),
        };
        let typed = match (kind, value) {
            (Some("Version"), v) => AttributeValue::Version(scalar(name, v)?.parse::<Version>()?),
            (Some("Long"), toml::Value::Integer(i)) => AttributeValue::Long(*i),
            (Some("Long"), v) => AttributeValue::Long(scalar(name, v)?.trim().parse().map_err(|_| {
                ResolverError::InvalidManifest(format!("Attribute {} is not a Long", name))
            })?),
            (Some("String"), v) => AttributeValue::String(scalar(name, v)?),
            (Some("List<String>"), toml::Value::Array(items)) | (None, toml::Value::Array(items)) => {
                AttributeValue::List(
                    items
                        .iter()
                        .map(|item| scalar(name, item))
                        .collect::<Result<_, _>>()?,
                )
            }
            (Some("List<String>"), v) => AttributeValue::List(
                scalar(name, v)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            (Some(other), _) => {
                return Err(ResolverError::InvalidManifest(format!(
                    "Unsupported attribute type {} for {}",
                    other, name
                )))
            }
            (None, toml::Value::Integer(i)) => AttributeValue::Long(*i),
            (None, v) => AttributeValue::String(scalar(name, v)?),
        };
        attributes.insert(name.to_string(), typed);
    }
    Ok(attributes)
}

fn scalar(name: &str, value: &toml::Value) -> Result<String, ResolverError> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        _ => Err(ResolverError::InvalidManifest(format!(
            "Attribute {} must be a scalar value",
            name
        ))),
    }
}
