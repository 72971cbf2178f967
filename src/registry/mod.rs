//! Module registry and ordering
//!
//! Handles manifest parsing and validation, metadata lookup for artifacts,
//! and dependency ordering of modules and features.

pub mod dependencies;
pub mod discovery;
pub mod manifest;
pub mod validation;

pub use dependencies::DependencyOrderer;
pub use discovery::{DirectoryMetadataProvider, ModuleDescriptor};
pub use manifest::ModuleManifest;
pub use validation::{ManifestValidator, ValidationResult};
