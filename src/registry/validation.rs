//! Manifest validation
//!
//! Validates module manifests for structure and syntax before they reach the
//! resolver.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::filter::Filter;
use crate::model::{Version, VersionRange};
use crate::registry::manifest::ModuleManifest;

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Manifest is valid
    Valid,
    /// Manifest is invalid with specific errors
    Invalid(Vec<String>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Manifest validator
pub struct ManifestValidator {
    /// Maximum manifest size (bytes)
    max_manifest_size: u64,
}

impl ManifestValidator {
    pub fn new() -> Self {
        Self {
            max_manifest_size: 64 * 1024, // 64 KB max
        }
    }

    pub fn max_manifest_size(&self) -> u64 {
        self.max_manifest_size
    }

    /// Validate a module manifest
    pub fn validate(&self, manifest: &ModuleManifest) -> ValidationResult {
        let mut errors = Vec::new();

        if !is_valid_symbolic_name(&manifest.symbolic_name) {
            errors.push(format!(
                "Invalid symbolic name: {} (dot-separated alphanumeric tokens expected)",
                manifest.symbolic_name
            ));
        }

        if manifest.version.parse::<Version>().is_err() {
            errors.push(format!("Invalid version format: {}", manifest.version));
        }

        let mut exported = HashSet::new();
        for export in &manifest.exports {
            if !is_valid_symbolic_name(&export.name) {
                errors.push(format!("Invalid export package name: {}", export.name));
            }
            if !exported.insert(export.name.trim()) {
                errors.push(format!("Package {} exported more than once", export.name));
            }
            if export.version.parse::<Version>().is_err() {
                errors.push(format!(
                    "Invalid version {} for export {}",
                    export.version, export.name
                ));
            }
        }

        for import in &manifest.imports {
            if !is_valid_symbolic_name(&import.name) {
                errors.push(format!("Invalid import package name: {}", import.name));
            }
            if let Some(range) = &import.version {
                if range.parse::<VersionRange>().is_err() {
                    errors.push(format!("Invalid version range {} for import {}", range, import.name));
                }
            }
        }

        if let Some(host) = &manifest.fragment_host {
            if !is_valid_symbolic_name(&host.symbolic_name) {
                errors.push(format!("Invalid fragment host: {}", host.symbolic_name));
            }
            if let Some(range) = &host.version {
                if range.parse::<VersionRange>().is_err() {
                    errors.push(format!("Invalid version range {} for fragment host", range));
                }
            }
        }

        for entry in manifest.capabilities.iter().chain(&manifest.requirements) {
            if entry.namespace.trim().is_empty() {
                errors.push("Capability or requirement with empty namespace".to_string());
            }
        }

        for requirement in &manifest.requirements {
            if let Some(filter) = requirement.directives.get("filter") {
                if let Err(e) = Filter::parse(filter) {
                    errors.push(e.to_string());
                }
            }
        }

        if errors.is_empty() {
            debug!("Manifest validation passed for module: {}", manifest.symbolic_name);
            ValidationResult::Valid
        } else {
            warn!(
                "Manifest validation failed for module {}: {:?}",
                manifest.symbolic_name, errors
            );
            ValidationResult::Invalid(errors)
        }
    }
}

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Dot-separated tokens of alphanumerics, dashes and underscores
fn is_valid_symbolic_name(name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() || name.len() > 255 {
        return false;
    }
    name.split('.').all(|token| {
        !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(toml: &str) -> ModuleManifest {
        ModuleManifest::from_toml_str(toml).unwrap()
    }

    #[test]
    fn test_valid_manifest() {
        let m = manifest(
            r#"
symbolic_name = "org.example.a"
version = "1.0.0"
[[exports]]
name = "org.example.a"
[[imports]]
name = "org.example.b"
version = "[1,2)"
"#,
        );
        assert_eq!(ManifestValidator::new().validate(&m), ValidationResult::Valid);
    }

    #[test]
    fn test_collects_every_error() {
        let m = manifest(
            r#"
symbolic_name = "org..bad"
version = "x.y"
[[exports]]
name = "p"
[[exports]]
name = "p"
[[imports]]
name = "q"
version = "[2,1)"
[[requirements]]
namespace = "osgi.extender"
directives = { filter = "(osgi.extender=x" }
"#,
        );
        match ManifestValidator::new().validate(&m) {
            ValidationResult::Invalid(errors) => assert_eq!(errors.len(), 5),
            ValidationResult::Valid => panic!("expected invalid manifest"),
        }
    }

    #[test]
    fn test_symbolic_names() {
        assert!(is_valid_symbolic_name("org.apache.sling.api"));
        assert!(is_valid_symbolic_name("my-module_2"));
        assert!(!is_valid_symbolic_name(""));
        assert!(!is_valid_symbolic_name(".leading"));
        assert!(!is_valid_symbolic_name("with space"));
    }
}
