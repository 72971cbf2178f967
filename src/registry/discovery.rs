//! Module discovery
//!
//! Locates module manifests for artifacts and scans module directories.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ModuleRepositoryConfig;
use crate::model::{ArtifactId, Module};
use crate::registry::manifest::ModuleManifest;
use crate::registry::validation::{ManifestValidator, ValidationResult};
use crate::traits::{ModuleMetadataProvider, ResolverError};

/// Name of the manifest file inside a module directory
pub const MANIFEST_FILE_NAME: &str = "module.toml";

/// Located and parsed module metadata
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Artifact the metadata belongs to
    pub artifact: ArtifactId,
    /// Path of the manifest file
    pub location: PathBuf,
    /// Parsed manifest
    pub manifest: ModuleManifest,
}

impl ModuleDescriptor {
    pub fn to_module(&self) -> Result<Module, ResolverError> {
        self.manifest.to_module()
    }
}

/// Metadata provider backed by a directory of TOML manifests
///
/// An artifact `g:a:v` is looked up as `<dir>/<g as path>/<a>/<v>/module.toml`
/// first, then as `<dir>/<a>-<v>.toml`.
#[derive(Debug, Clone)]
pub struct DirectoryMetadataProvider {
    /// Base directory to scan for modules
    modules_dir: PathBuf,
    /// Reject manifests that fail validation instead of warning
    strict: bool,
}

impl DirectoryMetadataProvider {
    pub fn new<P: AsRef<Path>>(modules_dir: P) -> Self {
        Self {
            modules_dir: modules_dir.as_ref().to_path_buf(),
            strict: false,
        }
    }

    /// Provider for the configured module repository
    pub fn from_config(config: &ModuleRepositoryConfig) -> Self {
        Self::new(&config.modules_dir).with_strict_validation(config.strict_validation)
    }

    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    /// Candidate manifest paths for `artifact`, in lookup order
    pub fn candidates(&self, artifact: &ArtifactId) -> Vec<PathBuf> {
        let mut repository_path = self.modules_dir.clone();
        for segment in artifact.group.split('.').filter(|s| !s.is_empty()) {
            repository_path.push(segment);
        }
        repository_path.push(&artifact.artifact);
        repository_path.push(&artifact.version);
        repository_path.push(MANIFEST_FILE_NAME);

        vec![
            repository_path,
            self.modules_dir
                .join(format!("{}-{}.toml", artifact.artifact, artifact.version)),
        ]
    }

    /// Discover all modules in the modules directory
    ///
    /// Every `*.toml` file directly in the directory and every `module.toml`
    /// below it is parsed. Unparseable manifests are logged and skipped.
    pub fn discover_modules(&self) -> Result<Vec<ModuleDescriptor>, ResolverError> {
        info!("Discovering modules in {:?}", self.modules_dir);

        if !self.modules_dir.exists() {
            debug!("Modules directory does not exist: {:?}", self.modules_dir);
            return Ok(Vec::new());
        }

        let mut manifests = Vec::new();
        for entry in fs::read_dir(&self.modules_dir)? {
            let path = entry?.path();
            if path.is_dir() {
                collect_manifests(&path, &mut manifests)?;
            } else if path.extension().map_or(false, |ext| ext == "toml") {
                manifests.push(path);
            }
        }
        manifests.sort();

        let mut modules = Vec::new();
        for path in manifests {
            match self.load(&path) {
                Ok(manifest) => {
                    let artifact = ArtifactId::new(
                        manifest.group.clone().unwrap_or_default(),
                        manifest.symbolic_name.clone(),
                        manifest.version.clone(),
                    );
                    modules.push(ModuleDescriptor {
                        artifact,
                        location: path,
                        manifest,
                    });
                }
                Err(e) => {
                    warn!("Failed to load manifest {:?}: {}", path, e);
                    continue;
                }
            }
        }

        info!("Discovered {} modules", modules.len());
        Ok(modules)
    }

    fn load(&self, path: &Path) -> Result<ModuleManifest, ResolverError> {
        let validator = ManifestValidator::new();
        let size = fs::metadata(path)?.len();
        if size > validator.max_manifest_size() {
            return Err(ResolverError::InvalidManifest(format!(
                "{} is {} bytes, limit is {}",
                path.display(),
                size,
                validator.max_manifest_size()
            )));
        }

        let manifest = ModuleManifest::from_file(path)?;
        match validator.validate(&manifest) {
            ValidationResult::Valid => {
                debug!("Manifest validated: {}", manifest.symbolic_name);
            }
            ValidationResult::Invalid(errors) if self.strict => {
                return Err(ResolverError::InvalidManifest(errors.join("; ")));
            }
            ValidationResult::Invalid(_) => {
                // already logged by the validator; lenient mode keeps going
            }
        }
        Ok(manifest)
    }
}

impl ModuleMetadataProvider for DirectoryMetadataProvider {
    fn describe(&self, artifact: &ArtifactId) -> Result<ModuleDescriptor, ResolverError> {
        let searched = self.candidates(artifact);
        let location = searched
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .ok_or_else(|| ResolverError::MissingModuleFile {
                artifact: artifact.clone(),
                searched: searched.clone(),
            })?;

        debug!("Found manifest for {} at {:?}", artifact, location);
        let manifest = self.load(&location)?;
        Ok(ModuleDescriptor {
            artifact: artifact.clone(),
            location,
            manifest,
        })
    }
}

fn collect_manifests(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ResolverError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_manifests(&path, out)?;
        } else if path.file_name().map_or(false, |n| n == MANIFEST_FILE_NAME) {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MANIFEST: &str = "symbolic_name = \"org.example.a\"\nversion = \"1.0.0\"\ngroup = \"org.example\"\n";

    #[test]
    fn test_describe_repository_layout() {
        let dir = TempDir::new().unwrap();
        let module_dir = dir.path().join("org/example/a/1.0.0");
        fs::create_dir_all(&module_dir).unwrap();
        fs::write(module_dir.join(MANIFEST_FILE_NAME), MANIFEST).unwrap();

        let provider = DirectoryMetadataProvider::new(dir.path());
        let artifact: ArtifactId = "org.example:a:1.0.0".parse().unwrap();
        let descriptor = provider.describe(&artifact).unwrap();
        assert_eq!(descriptor.manifest.symbolic_name, "org.example.a");
        assert_eq!(descriptor.location, module_dir.join(MANIFEST_FILE_NAME));
    }

    #[test]
    fn test_describe_flat_layout() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a-1.0.0.toml"), MANIFEST).unwrap();

        let provider = DirectoryMetadataProvider::new(dir.path());
        let artifact: ArtifactId = "org.example:a:1.0.0".parse().unwrap();
        assert!(provider.describe(&artifact).is_ok());
    }

    #[test]
    fn test_describe_missing_lists_searched_paths() {
        let dir = TempDir::new().unwrap();
        let provider = DirectoryMetadataProvider::new(dir.path());
        let artifact: ArtifactId = "org.example:nope:1".parse().unwrap();
        match provider.describe(&artifact) {
            Err(ResolverError::MissingModuleFile { searched, .. }) => assert_eq!(searched.len(), 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_strict_mode_rejects_invalid_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a-1.toml"),
            "symbolic_name = \"bad name\"\nversion = \"1\"\n",
        )
        .unwrap();
        let artifact: ArtifactId = "g:a:1".parse().unwrap();

        let lenient = DirectoryMetadataProvider::new(dir.path());
        assert!(lenient.describe(&artifact).is_ok());

        let strict = DirectoryMetadataProvider::new(dir.path()).with_strict_validation(true);
        assert!(matches!(
            strict.describe(&artifact),
            Err(ResolverError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_discover_skips_broken_manifests() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a-1.0.0.toml"), MANIFEST).unwrap();
        fs::write(dir.path().join("broken.toml"), "not = [valid").unwrap();
        let nested = dir.path().join("nested/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            nested.join(MANIFEST_FILE_NAME),
            "symbolic_name = \"b\"\nversion = \"2\"\n",
        )
        .unwrap();

        let found = DirectoryMetadataProvider::new(dir.path())
            .discover_modules()
            .unwrap();
        let names: Vec<_> = found.iter().map(|d| d.manifest.symbolic_name.as_str()).collect();
        assert_eq!(names, vec!["org.example.a", "b"]);
    }

    #[test]
    fn test_discover_missing_dir_is_empty() {
        let provider = DirectoryMetadataProvider::new("/nonexistent/feature-resolver/modules");
        assert!(provider.discover_modules().unwrap().is_empty());
    }
}
