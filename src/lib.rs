//! Feature Resolver - module dependency ordering and region visibility control
//!
//! This crate orders deployable modules (and the features that group them) so
//! that every module starts after the modules it wires to, and filters which
//! package providers a module may wire to based on feature/region membership.
//!
//! ## Components
//!
//! 1. `model` - capability graph: versions, capabilities, requirements, modules
//! 2. `filter` - match-expression parser and cached predicate engine
//! 3. `resolver` - self-contained resolution engine producing wires
//! 4. `registry` - manifests, metadata lookup and the dependency orderer
//! 5. `regions` - membership index and the region visibility hook
//!
//! ## Design Principles
//!
//! 1. **No singletons**: engines and orderers are explicit values
//! 2. **Arena graph**: capabilities refer to their module by [`ModuleId`]
//! 3. **Loud failures**: malformed filters and unresolvable modules abort ordering
//! 4. **Read-only sharing**: membership data is loaded once and shared via `Arc`
//!
//! ## Example
//!
//! ```rust,no_run
//! use feature_resolver::{DependencyOrderer, DirectoryMetadataProvider, Feature, ResolverConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ResolverConfig::from_toml_file(std::path::Path::new("resolver.toml"))?;
//! config.validate()?;
//! let orderer = DependencyOrderer::from_config(&config)?;
//! let provider = DirectoryMetadataProvider::from_config(&config.modules);
//! let features = vec![Feature::from_json_file("feature.json")?];
//! let ordered = orderer.order_features(&features, &provider)?;
//! # let _ = ordered;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod filter;
pub mod model;
pub mod regions;
pub mod registry;
pub mod resolver;
pub mod traits;
pub mod utils;

// Re-export commonly used types
pub use config::{LoggingConfig, RegionConfig, ResolverConfig};
pub use filter::{Filter, FilterAdapter, PredicateEngine};
pub use model::{
    ArtifactId, AttributeValue, Attributes, Capability, Directives, Feature, Module, ModuleGraph,
    ModuleId, ModuleIdentity, ModuleKind, PackageExport, Requirement, Version, VersionRange,
};
pub use regions::{MembershipIndex, RegionFilter, UnclassifiedPolicy};
pub use registry::{DependencyOrderer, DirectoryMetadataProvider, ModuleDescriptor, ModuleManifest};
pub use resolver::{OrderingContext, Resolution, ResolutionEngine, Wire};
pub use traits::{ModuleMetadataProvider, ResolveContext, ResolverError, ResolverHook};

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, ResolverError>;
