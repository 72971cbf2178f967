#![allow(dead_code)]

use feature_resolver::{
    ArtifactId, DirectoryMetadataProvider, Feature, Module, ModuleManifest,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Module manifest text exporting and importing the given packages
pub fn manifest(symbolic_name: &str, exports: &[&str], imports: &[&str]) -> String {
    let mut toml = format!("symbolic_name = \"{}\"\nversion = \"1.0.0\"\n", symbolic_name);
    for export in exports {
        toml.push_str(&format!("\n[[exports]]\nname = \"{}\"\nversion = \"1.0.0\"\n", export));
    }
    for import in imports {
        toml.push_str(&format!("\n[[imports]]\nname = \"{}\"\nversion = \"[1.0,2.0)\"\n", import));
    }
    toml
}

/// Fragment manifest attaching to `host`
pub fn fragment_manifest(symbolic_name: &str, host: &str) -> String {
    format!(
        "symbolic_name = \"{}\"\nversion = \"1.0.0\"\n\n[fragment_host]\nsymbolic_name = \"{}\"\n",
        symbolic_name, host
    )
}

pub fn module(symbolic_name: &str, exports: &[&str], imports: &[&str]) -> Module {
    ModuleManifest::from_toml_str(&manifest(symbolic_name, exports, imports))
        .and_then(|m| m.to_module())
        .expect("test manifest")
}

pub fn artifact(name: &str) -> ArtifactId {
    ArtifactId::new("org.example", name, "1.0.0")
}

pub fn feature(name: &str, bundles: &[&str]) -> Feature {
    bundles.iter().fold(
        Feature::new(ArtifactId::new("org.example.features", name, "1.0.0")),
        |feature, bundle| feature.with_bundle(artifact(bundle)),
    )
}

/// Directory of module manifests in the flat `<artifact>-<version>.toml` layout
pub struct ModuleRepo {
    pub temp_dir: TempDir,
}

impl ModuleRepo {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("temp dir"),
        }
    }

    pub fn add(&self, artifact_name: &str, manifest: &str) -> &Self {
        fs::write(
            self.temp_dir.path().join(format!("{}-1.0.0.toml", artifact_name)),
            manifest,
        )
        .expect("write manifest");
        self
    }

    pub fn provider(&self) -> DirectoryMetadataProvider {
        DirectoryMetadataProvider::new(self.temp_dir.path())
    }
}

pub fn write_properties(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("write properties");
}
