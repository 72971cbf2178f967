//! Module dependency ordering
//!
//! Computes a start order for a set of modules from the wires the resolution
//! engine produces, then reports the features owning those modules in that
//! order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ResolverConfig;
use crate::filter::FilterAdapter;
use crate::model::namespace::{BUNDLE_NAMESPACE, HOST_NAMESPACE};
use crate::model::{
    ArtifactId, Capability, Feature, Module, ModuleGraph, ModuleId, ModuleIdentity, ModuleKind,
    PackageExport, Requirement, Version,
};
use crate::regions::RegionFilter;
use crate::registry::manifest::ExportEntry;
use crate::resolver::{Resolution, ResolutionEngine};
use crate::traits::{ModuleMetadataProvider, ResolverError};

/// Dependency orderer
///
/// Holds no per-call state; every `order` call starts from scratch.
#[derive(Debug, Clone)]
pub struct DependencyOrderer {
    engine: ResolutionEngine,
    framework: Module,
    launch_api: Module,
    launch_api_artifact: ArtifactId,
    hosted: Vec<Capability>,
}

impl DependencyOrderer {
    /// Orderer with the default framework and launch API modules
    pub fn new(engine: ResolutionEngine) -> Self {
        let defaults = ResolverConfig::default();
        let framework = Module::synthetic(
            ModuleIdentity::new(
                "",
                defaults.framework.symbolic_name.as_str(),
                defaults.framework.version.parse().unwrap_or_default(),
            ),
            ModuleKind::Framework,
            &lenient_exports(&defaults.framework.exports),
        );
        let launch_api_artifact = defaults.launch_api.artifact.parse().unwrap_or_else(|_| {
            ArtifactId::new("org.apache.sling", "org.apache.sling.launchpad.api", "1.2.0")
        });
        let launch_api = launch_api_module(
            &launch_api_artifact,
            &lenient_exports(&defaults.launch_api.exports),
        );
        Self {
            engine,
            framework,
            launch_api,
            launch_api_artifact,
            hosted: Vec::new(),
        }
    }

    /// Orderer configured from `config`
    ///
    /// Installs a [`RegionFilter`] on the engine when regions are configured.
    pub fn from_config(config: &ResolverConfig) -> Result<Self, ResolverError> {
        let predicate = FilterAdapter::with_capacity(config.filter_cache_capacity);
        let mut engine = ResolutionEngine::with_predicate(Arc::new(predicate));
        if let Some(regions) = &config.regions {
            engine = engine.with_hook(Arc::new(RegionFilter::from_config(regions)?));
        }

        let launch_api_artifact: ArtifactId = config.launch_api.artifact.parse()?;
        let exports = exports_of(&config.launch_api.exports)?;
        Ok(Self {
            engine,
            framework: framework_module(config)?,
            launch_api: launch_api_module(&launch_api_artifact, &exports),
            launch_api_artifact,
            hosted: Vec::new(),
        })
    }

    /// Replace the framework module
    pub fn with_framework(mut self, identity: ModuleIdentity, exports: &[PackageExport]) -> Self {
        self.framework = Module::synthetic(identity, ModuleKind::Framework, exports);
        self
    }

    /// Replace the exports used when the launch API has no manifest
    pub fn with_launch_api_exports(mut self, exports: &[PackageExport]) -> Self {
        self.launch_api = launch_api_module(&self.launch_api_artifact, exports);
        self
    }

    /// Capability injected by the host environment, provided by the framework
    pub fn with_hosted_capability(mut self, capability: Capability) -> Self {
        self.hosted.push(capability);
        self
    }

    /// Engine used for every resolve call
    pub fn engine(&self) -> &ResolutionEngine {
        &self.engine
    }

    /// Order opaque handles by the dependencies of their modules
    ///
    /// Each handle is reported once, at the position of its first module.
    /// Structurally equal modules collapse into one; the first handle wins.
    pub fn order<T, I>(&self, entries: I) -> Result<Vec<T>, ResolverError>
    where
        T: Clone + PartialEq,
        I: IntoIterator<Item = (Module, T)>,
    {
        self.order_with_launch_api(entries, self.launch_api.clone())
    }

    /// Order features by the modules they contain
    ///
    /// Every bundle's metadata is looked up before any resolution happens, so
    /// a missing manifest fails the call early.
    pub fn order_features(
        &self,
        features: &[Feature],
        provider: &dyn ModuleMetadataProvider,
    ) -> Result<Vec<Feature>, ResolverError> {
        let mut entries = Vec::new();
        for feature in features {
            for bundle in &feature.bundles {
                let module = provider.describe(bundle)?.to_module()?;
                entries.push((module.with_feature(feature.id.clone()), feature.clone()));
            }
        }

        let launch_api = match provider.describe(&self.launch_api_artifact) {
            Ok(descriptor) => descriptor.to_module()?,
            Err(ResolverError::MissingModuleFile { .. }) => {
                debug!(
                    "No manifest for {}, using configured exports",
                    self.launch_api_artifact
                );
                self.launch_api.clone()
            }
            Err(e) => return Err(e),
        };

        self.order_with_launch_api(entries, launch_api)
    }

    fn order_with_launch_api<T, I>(&self, entries: I, launch_api: Module) -> Result<Vec<T>, ResolverError>
    where
        T: Clone + PartialEq,
        I: IntoIterator<Item = (Module, T)>,
    {
        let mut graph = ModuleGraph::new();
        let mut handles: HashMap<ModuleId, T> = HashMap::new();
        for (module, handle) in entries {
            let id = graph.insert(module);
            handles.entry(id).or_insert(handle);
        }
        if handles.is_empty() {
            return Ok(Vec::new());
        }

        for (_, module) in graph.iter() {
            host_requirement(module)?;
        }

        graph.insert(launch_api);
        let framework = graph.insert(self.framework.clone());
        let hosted: Vec<Capability> = self
            .hosted
            .iter()
            .map(|capability| capability.hosted_by(framework))
            .collect();

        info!("Ordering {} modules", handles.len());

        let mut ordering = Ordering::default();
        for id in graph.ids() {
            if ordering.contains(id) {
                continue;
            }
            let context = self.engine.context_with_hosted(&graph, id, &hosted);
            let resolution = self.engine.resolve(&context)?;
            ordering.merge(resolution);
        }

        self.promote_fragments(&graph, &mut ordering.modules)?;

        let mut ordered: Vec<T> = Vec::new();
        for id in &ordering.modules {
            if let Some(handle) = handles.get(id) {
                if !ordered.contains(handle) {
                    ordered.push(handle.clone());
                }
            }
        }

        info!("Ordered {} modules into {} entries", ordering.modules.len(), ordered.len());
        Ok(ordered)
    }

    /// Move every fragment to immediately before its host
    fn promote_fragments(&self, graph: &ModuleGraph, ordered: &mut Vec<ModuleId>) -> Result<(), ResolverError> {
        let fragments: Vec<(ModuleId, Requirement)> = ordered
            .iter()
            .filter_map(|id| graph.get(*id).map(|module| (*id, module)))
            .filter_map(|(id, module)| match host_requirement(module) {
                Ok(Some(requirement)) => Some(Ok((id, requirement.clone()))),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<_, _>>()?;

        for (fragment, requirement) in fragments {
            let mut host = None;
            for id in ordered.iter() {
                if *id == fragment {
                    continue;
                }
                if let Some(module) = graph.get(*id) {
                    if self.is_host(module, &requirement)? {
                        host = Some(*id);
                        break;
                    }
                }
            }
            let Some(host) = host else {
                debug!("No host found for fragment {}", fragment);
                continue;
            };

            let (Some(frag_idx), Some(host_idx)) = (position(ordered, fragment), position(ordered, host)) else {
                continue;
            };
            if frag_idx + 1 == host_idx {
                continue;
            }
            ordered.remove(frag_idx);
            let host_idx = position(ordered, host).unwrap_or(host_idx);
            ordered.insert(host_idx, fragment);
            debug!("Moved fragment {} before host {}", fragment, host);
        }
        Ok(())
    }

    /// Whether `module` is the host `requirement` names
    ///
    /// Evaluates the requirement filter against host capabilities, falling
    /// back to comparing the named symbolic name with bundle capabilities.
    fn is_host(&self, module: &Module, requirement: &Requirement) -> Result<bool, ResolverError> {
        if requirement.filter().is_some() {
            for capability in module.capabilities(Some(HOST_NAMESPACE)) {
                if self.engine.predicate().matches(requirement, capability.attributes())? {
                    return Ok(true);
                }
            }
        }

        let Some(name) = requirement.attribute(HOST_NAMESPACE).and_then(|v| v.as_str()) else {
            return Ok(false);
        };
        Ok(module
            .capabilities(Some(BUNDLE_NAMESPACE))
            .iter()
            .any(|c| c.attribute(BUNDLE_NAMESPACE).and_then(|v| v.as_str()) == Some(name)))
    }
}

impl Default for DependencyOrderer {
    fn default() -> Self {
        Self::new(ResolutionEngine::new())
    }
}

/// The single host requirement of a fragment
fn host_requirement(module: &Module) -> Result<Option<&Requirement>, ResolverError> {
    let hosts = module.requirements(Some(HOST_NAMESPACE));
    match hosts.len() {
        0 => Ok(None),
        1 => Ok(Some(hosts[0])),
        count => Err(ResolverError::MultipleHostRequirements {
            module: module.to_string(),
            count,
        }),
    }
}

fn position(ordered: &[ModuleId], id: ModuleId) -> Option<usize> {
    ordered.iter().position(|m| *m == id)
}

fn exports_of(entries: &[ExportEntry]) -> Result<Vec<PackageExport>, ResolverError> {
    entries
        .iter()
        .map(|e| Ok(PackageExport::new(e.name.trim(), e.version.parse()?)))
        .collect()
}

/// Defaults are known to parse; anything that doesn't is left out
fn lenient_exports(entries: &[ExportEntry]) -> Vec<PackageExport> {
    entries
        .iter()
        .filter_map(|e| e.version.parse().ok().map(|v| PackageExport::new(e.name.trim(), v)))
        .collect()
}

fn framework_module(config: &ResolverConfig) -> Result<Module, ResolverError> {
    let identity = ModuleIdentity::new(
        "",
        config.framework.symbolic_name.trim(),
        config.framework.version.parse()?,
    );
    Ok(Module::synthetic(
        identity,
        ModuleKind::Framework,
        &exports_of(&config.framework.exports)?,
    ))
}

fn launch_api_module(artifact: &ArtifactId, exports: &[PackageExport]) -> Module {
    let version = artifact.version.parse().unwrap_or_else(|_| Version::empty());
    Module::synthetic(
        ModuleIdentity::new(artifact.group.as_str(), artifact.artifact.as_str(), version),
        ModuleKind::Synthetic,
        exports,
    )
}

/// Module order assembled across resolve calls
#[derive(Debug, Default)]
struct Ordering {
    modules: Vec<ModuleId>,
    /// Providers each module is known to wire to
    providers: HashMap<ModuleId, Vec<ModuleId>>,
}

impl Ordering {
    fn contains(&self, id: ModuleId) -> bool {
        self.modules.contains(&id)
    }

    fn merge(&mut self, resolution: Resolution) {
        for (requirer, wires) in resolution {
            if !self.contains(requirer) {
                self.modules.push(requirer);
            }
            let known = self.providers.entry(requirer).or_default();
            for wire in wires.iter().filter(|w| !w.is_self_wire()) {
                if !known.contains(&wire.provider) {
                    known.push(wire.provider);
                }
            }
            let mut path = HashSet::new();
            let mut checked = HashSet::new();
            self.place_providers(requirer, &mut path, &mut checked);
        }
    }

    /// Put every known provider of `requirer` before it, transitively
    ///
    /// Providers are only ever moved earlier, so a move can only break the
    /// moved module's own placement. `checked` holds modules whose providers
    /// were placed and which have not moved since. `path` holds the modules
    /// being placed so that wiring cycles terminate.
    fn place_providers(
        &mut self,
        requirer: ModuleId,
        path: &mut HashSet<ModuleId>,
        checked: &mut HashSet<ModuleId>,
    ) {
        if !path.insert(requirer) {
            return;
        }
        let providers = self.providers.get(&requirer).cloned().unwrap_or_default();
        for provider in providers {
            let Some(current) = position(&self.modules, requirer) else {
                continue;
            };
            let moved = match position(&self.modules, provider) {
                Some(idx) if idx < current => false,
                Some(idx) => {
                    self.modules.remove(idx);
                    self.modules.insert(current, provider);
                    debug!("Moved {} before {}", provider, requirer);
                    true
                }
                None => {
                    self.modules.insert(current, provider);
                    true
                }
            };
            if moved {
                checked.remove(&provider);
            }
            if !checked.contains(&provider) {
                self.place_providers(provider, path, checked);
            }
        }
        path.remove(&requirer);
        checked.insert(requirer);
    }
}
