//! Capability graph model
//!
//! Typed value objects for modules, their capabilities and requirements, and
//! the features that group them.

pub mod capability;
pub mod feature;
pub mod module;
pub mod namespace;
pub mod version;

pub use capability::{AttributeValue, Attributes, Capability, Directives, Requirement};
pub use feature::{ArtifactId, Feature};
pub use module::{Module, ModuleGraph, ModuleId, ModuleIdentity, ModuleKind, PackageExport};
pub use version::{Version, VersionRange};
