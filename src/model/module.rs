//! Modules and the module arena
//!
//! A [`Module`] is an immutable bag of capabilities and requirements. Modules
//! are placed into a [`ModuleGraph`], which hands out [`ModuleId`]s and stamps
//! every capability/requirement with its owner so that back-references are
//! plain indices rather than live references.

use std::fmt;
use tracing::debug;

use crate::model::capability::{Attributes, Capability, Directives, Requirement};
use crate::model::feature::ArtifactId;
use crate::model::namespace::{
    BUNDLE_NAMESPACE, BUNDLE_SYMBOLIC_NAME_ATTRIBUTE, BUNDLE_VERSION_ATTRIBUTE, HOST_NAMESPACE,
    PACKAGE_NAMESPACE, VERSION_ATTRIBUTE,
};
use crate::model::version::Version;

/// Index of a module inside a [`ModuleGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub usize);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Coordinates identifying a module
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleIdentity {
    pub group: String,
    pub symbolic_name: String,
    pub version: Version,
}

impl ModuleIdentity {
    pub fn new(group: impl Into<String>, symbolic_name: impl Into<String>, version: Version) -> Self {
        Self {
            group: group.into(),
            symbolic_name: symbolic_name.into(),
            version,
        }
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.symbolic_name, self.version)
    }
}

/// What kind of resource a module is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// Regular deployable module
    Bundle,
    /// The platform/system module; everything may see its capabilities
    Framework,
    /// Placeholder added by the resolver itself (e.g. the launch API)
    Synthetic,
}

/// A package exported by a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageExport {
    pub name: String,
    pub version: Version,
}

impl PackageExport {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

/// A deployable module with its typed contracts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Module {
    identity: ModuleIdentity,
    kind: ModuleKind,
    capabilities: Vec<Capability>,
    requirements: Vec<Requirement>,
    feature: Option<ArtifactId>,
}

impl Module {
    /// Create a regular module from already-built capability and requirement lists
    pub fn new(
        identity: ModuleIdentity,
        capabilities: Vec<Capability>,
        requirements: Vec<Requirement>,
    ) -> Self {
        Self {
            identity,
            kind: ModuleKind::Bundle,
            capabilities,
            requirements,
            feature: None,
        }
    }

    /// Create a synthetic module that only exports packages
    pub fn synthetic(identity: ModuleIdentity, kind: ModuleKind, exports: &[PackageExport]) -> Self {
        let capabilities = exports
            .iter()
            .map(|export| package_capability(&identity, export))
            .collect();
        Self {
            identity,
            kind,
            capabilities,
            requirements: Vec::new(),
            feature: None,
        }
    }

    /// Attach the (weak) owning feature reference
    pub fn with_feature(mut self, feature: ArtifactId) -> Self {
        self.feature = Some(feature);
        self
    }

    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    pub fn symbolic_name(&self) -> &str {
        &self.identity.symbolic_name
    }

    pub fn version(&self) -> &Version {
        &self.identity.version
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn feature(&self) -> Option<&ArtifactId> {
        self.feature.as_ref()
    }

    /// Capabilities in `namespace`, or all of them for `None`, in declaration order
    pub fn capabilities(&self, namespace: Option<&str>) -> Vec<&Capability> {
        self.capabilities
            .iter()
            .filter(|c| namespace.map_or(true, |ns| c.namespace() == ns))
            .collect()
    }

    /// Requirements in `namespace`, or all of them for `None`, in declaration order
    pub fn requirements(&self, namespace: Option<&str>) -> Vec<&Requirement> {
        self.requirements
            .iter()
            .filter(|r| namespace.map_or(true, |ns| r.namespace() == ns))
            .collect()
    }

    /// A fragment attaches to a host instead of standing alone
    pub fn is_fragment(&self) -> bool {
        self.requirements
            .iter()
            .any(|r| r.namespace() == HOST_NAMESPACE)
    }

    fn stamp(&mut self, id: ModuleId) {
        for cap in &mut self.capabilities {
            cap.set_owner(id);
        }
        for req in &mut self.requirements {
            req.set_owner(id);
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identity)
    }
}

/// Package capability as produced for an export of `identity`
pub(crate) fn package_capability(identity: &ModuleIdentity, export: &PackageExport) -> Capability {
    let mut attrs = Attributes::new();
    attrs.insert(PACKAGE_NAMESPACE.to_string(), export.name.as_str().into());
    attrs.insert(VERSION_ATTRIBUTE.to_string(), export.version.clone().into());
    attrs.insert(
        BUNDLE_SYMBOLIC_NAME_ATTRIBUTE.to_string(),
        identity.symbolic_name.as_str().into(),
    );
    attrs.insert(
        BUNDLE_VERSION_ATTRIBUTE.to_string(),
        identity.version.clone().into(),
    );
    Capability::new(PACKAGE_NAMESPACE, attrs, Directives::new())
}

/// Bundle capability identifying `identity` by symbolic name
pub(crate) fn bundle_capability(namespace: &str, identity: &ModuleIdentity) -> Capability {
    debug_assert!(namespace == BUNDLE_NAMESPACE || namespace == HOST_NAMESPACE);
    let mut attrs = Attributes::new();
    attrs.insert(namespace.to_string(), identity.symbolic_name.as_str().into());
    attrs.insert(
        BUNDLE_VERSION_ATTRIBUTE.to_string(),
        identity.version.clone().into(),
    );
    Capability::new(namespace, attrs, Directives::new())
}

/// Arena of modules taking part in one resolution run
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a module and return its id
    ///
    /// Structurally equal modules are interchangeable: inserting one that is
    /// already present returns the existing id.
    pub fn insert(&mut self, mut module: Module) -> ModuleId {
        if let Some(existing) = self.find(&module) {
            debug!("Module {} already present as {}", module, existing);
            return existing;
        }
        let id = ModuleId(self.modules.len());
        module.stamp(id);
        self.modules.push(module);
        id
    }

    /// Id of a module structurally equal to `module`
    pub fn find(&self, module: &Module) -> Option<ModuleId> {
        self.modules
            .iter()
            .position(|m| m == module)
            .map(ModuleId)
    }

    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// All ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        (0..self.modules.len()).map(ModuleId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Module)> + '_ {
        self.modules.iter().enumerate().map(|(i, m)| (ModuleId(i), m))
    }

    /// Namespace-indexed capability lookup
    ///
    /// `module == None` yields nothing; `namespace == None` yields every
    /// capability of the module in declaration order.
    pub fn capabilities(&self, module: Option<ModuleId>, namespace: Option<&str>) -> Vec<&Capability> {
        module
            .and_then(|id| self.get(id))
            .map(|m| m.capabilities(namespace))
            .unwrap_or_default()
    }
}
