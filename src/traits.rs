//! Resolver traits and errors
//!
//! Defines the seams between the resolution engine and its collaborators:
//! the resolve context, resolver hooks and module metadata providers.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::namespace::EFFECTIVE_RESOLVE;
use crate::model::{ArtifactId, Capability, Module, ModuleGraph, ModuleId, Requirement};
use crate::registry::discovery::ModuleDescriptor;

/// Everything the resolution engine needs to know about one resolve call
///
/// Mirrors the context a module framework hands to its resolver: which
/// modules must resolve, where providers come from, and which requirements
/// count.
pub trait ResolveContext {
    /// Modules that must resolve for the call to succeed
    fn mandatory_resources(&self) -> Vec<ModuleId>;

    /// Look up a module of the candidate pool
    fn module(&self, id: ModuleId) -> Option<&Module>;

    /// Capabilities that may satisfy `requirement`, in preference order
    fn find_providers(&self, requirement: &Requirement) -> Result<Vec<Capability>, ResolverError>;

    /// Whether `requirement` takes part in resolution
    ///
    /// True unless the `effective` directive names something other than `resolve`.
    fn is_effective(&self, requirement: &Requirement) -> bool {
        requirement.effective() == EFFECTIVE_RESOLVE
    }

    /// Insert a capability that is not declared by any static module
    ///
    /// Returns the index it was inserted at.
    fn insert_hosted_capability(&self, capabilities: &mut Vec<Capability>, hosted: Capability) -> usize {
        capabilities.insert(0, hosted);
        0
    }
}

/// Hook invoked for every requirement-to-candidates match event
///
/// Implementations may only remove candidates. They can be called from
/// several resolve calls at once and must not hold mutable state.
pub trait ResolverHook: Send + Sync {
    fn filter_matches(
        &self,
        graph: &ModuleGraph,
        requirement: &Requirement,
        candidates: &mut Vec<Capability>,
    );
}

/// Source of module metadata for declared artifacts
pub trait ModuleMetadataProvider: Send + Sync {
    /// Locate and parse the metadata of `artifact`
    ///
    /// Fails with [`ResolverError::MissingModuleFile`] when no backing file exists.
    fn describe(&self, artifact: &ArtifactId) -> Result<ModuleDescriptor, ResolverError>;
}

/// Resolver errors
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Malformed filter {filter}: {reason}")]
    MalformedFilter { filter: String, reason: String },

    #[error(
        "Module {module} cannot be resolved, unsatisfied requirements: [{}]",
        .unsatisfied.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
    )]
    UnresolvableModule {
        module: String,
        unsatisfied: Vec<Requirement>,
    },

    #[error("Unable to find file for {artifact} (searched {searched:?})")]
    MissingModuleFile {
        artifact: ArtifactId,
        searched: Vec<PathBuf>,
    },

    #[error("Fragment {module} declares {count} host requirements, only one is supported")]
    MultipleHostRequirements { module: String, count: usize },

    #[error("Invalid module manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Invalid artifact id: {0}")]
    InvalidArtifactId(String),

    #[error("Invalid membership file {file:?}: {reason}")]
    InvalidMembership { file: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolverError {
    /// Requirements left unsatisfied, for resolution failures
    pub fn unsatisfied(&self) -> &[Requirement] {
        match self {
            ResolverError::UnresolvableModule { unsatisfied, .. } => unsatisfied,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for ResolverError {
    fn from(e: serde_json::Error) -> Self {
        ResolverError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for ResolverError {
    fn from(e: toml::de::Error) -> Self {
        ResolverError::Serialization(e.to_string())
    }
}
