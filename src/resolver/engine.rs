//! Self-contained resolution engine
//!
//! Computes, for the mandatory modules of a [`ResolveContext`], the wires that
//! satisfy their requirements, pulling in providers transitively.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::filter::{FilterAdapter, PredicateEngine};
use crate::model::{Capability, Module, ModuleGraph, ModuleId};
use crate::resolver::context::OrderingContext;
use crate::resolver::wire::Wire;
use crate::traits::{ResolveContext, ResolverError, ResolverHook};

/// Wires per resolved module
///
/// Entries are kept in completion order: a module appears after the
/// providers it pulled in, except where a cycle made that impossible.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    entries: Vec<(ModuleId, Vec<Wire>)>,
}

impl Resolution {
    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &[Wire])> + '_ {
        self.entries.iter().map(|(id, wires)| (*id, wires.as_slice()))
    }

    pub fn wires(&self, module: ModuleId) -> Option<&[Wire]> {
        self.entries
            .iter()
            .find(|(id, _)| *id == module)
            .map(|(_, wires)| wires.as_slice())
    }

    pub fn contains(&self, module: ModuleId) -> bool {
        self.wires(module).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Resolution {
    type Item = (ModuleId, Vec<Wire>);
    type IntoIter = std::vec::IntoIter<(ModuleId, Vec<Wire>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Resolution engine
///
/// Owns the predicate engine and the resolver hooks; constructed by the
/// caller and passed to whoever needs to resolve.
#[derive(Clone)]
pub struct ResolutionEngine {
    predicate: Arc<dyn PredicateEngine>,
    hooks: Vec<Arc<dyn ResolverHook>>,
}

impl ResolutionEngine {
    /// Engine using the built-in filter adapter and no hooks
    pub fn new() -> Self {
        Self::with_predicate(Arc::new(FilterAdapter::new()))
    }

    pub fn with_predicate(predicate: Arc<dyn PredicateEngine>) -> Self {
        Self {
            predicate,
            hooks: Vec::new(),
        }
    }

    /// Register a hook that narrows provider candidates
    pub fn with_hook(mut self, hook: Arc<dyn ResolverHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn predicate(&self) -> &dyn PredicateEngine {
        self.predicate.as_ref()
    }

    pub fn hooks(&self) -> &[Arc<dyn ResolverHook>] {
        &self.hooks
    }

    /// Context resolving `mandatory` against every module of `graph`
    pub fn context<'a>(&'a self, graph: &'a ModuleGraph, mandatory: ModuleId) -> OrderingContext<'a> {
        OrderingContext::new(graph, mandatory, self.predicate.as_ref(), &self.hooks)
    }

    /// Like [`context`](Self::context), with capabilities injected by the host
    pub fn context_with_hosted<'a>(
        &'a self,
        graph: &'a ModuleGraph,
        mandatory: ModuleId,
        hosted: &'a [Capability],
    ) -> OrderingContext<'a> {
        self.context(graph, mandatory).with_hosted_capabilities(hosted)
    }

    /// Resolve every mandatory module of `context`
    ///
    /// Fails with [`ResolverError::UnresolvableModule`] when a mandatory
    /// module has a non-optional requirement no candidate can satisfy.
    pub fn resolve(&self, context: &dyn ResolveContext) -> Result<Resolution, ResolverError> {
        let mut session = Session::new(context);
        for id in context.mandatory_resources() {
            session.resolve_module(id)?;
        }
        info!(
            "Resolved {} module(s) for {} mandatory resource(s)",
            session.resolved.len(),
            context.mandatory_resources().len()
        );
        Ok(Resolution {
            entries: session.resolved,
        })
    }
}

impl Default for ResolutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// State of one resolve call
struct Session<'c> {
    context: &'c dyn ResolveContext,
    resolved: Vec<(ModuleId, Vec<Wire>)>,
    done: HashSet<ModuleId>,
    in_progress: HashSet<ModuleId>,
    /// Modules that fail whatever else is in progress; survive rollbacks
    failed: HashSet<ModuleId>,
}

/// Outcome of picking a provider for one requirement
enum Choice {
    Wired(Capability),
    /// `permanent` when every candidate's provider is in `Session::failed`
    Unavailable { permanent: bool },
}

impl<'c> Session<'c> {
    fn new(context: &'c dyn ResolveContext) -> Self {
        Self {
            context,
            resolved: Vec::new(),
            done: HashSet::new(),
            in_progress: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    fn is_settled(&self, id: ModuleId) -> bool {
        self.done.contains(&id) || self.in_progress.contains(&id)
    }

    fn resolve_module(&mut self, id: ModuleId) -> Result<(), ResolverError> {
        if self.is_settled(id) {
            return Ok(());
        }

        let context = self.context;
        let module = context
            .module(id)
            .ok_or_else(|| ResolverError::UnresolvableModule {
                module: id.to_string(),
                unsatisfied: Vec::new(),
            })?;

        self.in_progress.insert(id);
        let result = self.resolve_requirements(id, module);
        self.in_progress.remove(&id);

        let wires = result?;
        debug!("Resolved {} with {} wire(s)", module, wires.len());
        self.done.insert(id);
        self.resolved.push((id, wires));
        Ok(())
    }

    fn resolve_requirements(&mut self, id: ModuleId, module: &Module) -> Result<Vec<Wire>, ResolverError> {
        let mut wires = Vec::new();
        let mut unsatisfied = Vec::new();
        let mut permanent = false;

        for requirement in module.requirements(None) {
            if !self.context.is_effective(requirement) {
                debug!("Skipping non-effective requirement {} of {}", requirement, module);
                continue;
            }

            let candidates = self.context.find_providers(requirement)?;
            match self.choose(id, candidates)? {
                Choice::Wired(capability) => {
                    let provider = capability.owner().unwrap_or(id);
                    wires.push(Wire {
                        requirer: id,
                        requirement: requirement.clone(),
                        provider,
                        capability,
                    });
                }
                Choice::Unavailable { .. } if requirement.is_optional() => {
                    debug!("Optional requirement {} of {} left unsatisfied", requirement, module);
                }
                Choice::Unavailable { permanent: hopeless } => {
                    permanent |= hopeless;
                    unsatisfied.push(requirement.clone());
                }
            }
        }

        if unsatisfied.is_empty() {
            Ok(wires)
        } else {
            if permanent {
                debug!("{} cannot be resolved in any state, remembering", module);
                self.failed.insert(id);
            }
            Err(ResolverError::UnresolvableModule {
                module: module.to_string(),
                unsatisfied,
            })
        }
    }

    /// First candidate whose provider is settled or can be resolved
    ///
    /// Providers known to fail are skipped without another attempt.
    fn choose(&mut self, requirer: ModuleId, candidates: Vec<Capability>) -> Result<Choice, ResolverError> {
        let mut permanent = true;
        for candidate in candidates {
            let Some(provider) = candidate.owner() else {
                continue;
            };
            if provider == requirer || self.is_settled(provider) {
                return Ok(Choice::Wired(candidate));
            }
            if self.failed.contains(&provider) {
                continue;
            }

            let checkpoint = (self.resolved.len(), self.done.clone());
            match self.resolve_module(provider) {
                Ok(()) => return Ok(Choice::Wired(candidate)),
                Err(ResolverError::UnresolvableModule { module, .. }) => {
                    debug!("Provider {} is unresolvable, trying next candidate", module);
                    self.resolved.truncate(checkpoint.0);
                    self.done = checkpoint.1;
                    permanent &= self.failed.contains(&provider);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Choice::Unavailable { permanent })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::namespace::{PACKAGE_NAMESPACE, RESOLUTION_DIRECTIVE};
    use crate::model::{ModuleIdentity, ModuleKind, PackageExport, Requirement, Version};

    fn exporter(name: &str, packages: &[&str]) -> Module {
        let exports: Vec<PackageExport> = packages
            .iter()
            .map(|p| PackageExport::new(*p, Version::new(1, 0, 0)))
            .collect();
        Module::synthetic(
            ModuleIdentity::new("test", name, Version::new(1, 0, 0)),
            ModuleKind::Bundle,
            &exports,
        )
    }

    fn importer(name: &str, package: &str, optional: bool) -> Module {
        let mut req = Requirement::with_filter(
            PACKAGE_NAMESPACE,
            format!("(osgi.wiring.package={})", package),
        );
        if optional {
            let mut directives = req.directives().clone();
            directives.insert(RESOLUTION_DIRECTIVE.to_string(), "optional".to_string());
            req = Requirement::new(PACKAGE_NAMESPACE, req.attributes().clone(), directives);
        }
        Module::new(
            ModuleIdentity::new("test", name, Version::new(1, 0, 0)),
            Vec::new(),
            vec![req],
        )
    }

    #[test]
    fn test_resolves_transitive_provider() {
        let mut graph = ModuleGraph::new();
        let a = graph.insert(exporter("a", &["pa"]));
        let b = graph.insert(importer("b", "pa", false));

        let engine = ResolutionEngine::new();
        let resolution = engine.resolve(&engine.context(&graph, b)).unwrap();

        assert_eq!(resolution.len(), 2);
        let wires = resolution.wires(b).unwrap();
        assert_eq!(wires.len(), 1);
        assert_eq!(wires[0].provider, a);
        // provider completes first
        assert_eq!(resolution.iter().next().unwrap().0, a);
    }

    #[test]
    fn test_missing_mandatory_provider_fails() {
        let mut graph = ModuleGraph::new();
        let b = graph.insert(importer("b", "missing", false));

        let engine = ResolutionEngine::new();
        let err = engine.resolve(&engine.context(&graph, b)).unwrap_err();
        assert!(matches!(err, ResolverError::UnresolvableModule { .. }));
        assert_eq!(err.unsatisfied().len(), 1);
    }

    #[test]
    fn test_optional_requirement_is_skipped() {
        let mut graph = ModuleGraph::new();
        let b = graph.insert(importer("b", "missing", true));

        let engine = ResolutionEngine::new();
        let resolution = engine.resolve(&engine.context(&graph, b)).unwrap();
        assert_eq!(resolution.wires(b).unwrap().len(), 0);
    }

    #[test]
    fn test_falls_back_to_next_candidate() {
        let mut graph = ModuleGraph::new();
        // first exporter of "p" needs something nobody provides
        let broken = Module::new(
            ModuleIdentity::new("test", "broken", Version::new(1, 0, 0)),
            exporter("broken", &["p"]).capabilities(None).into_iter().cloned().collect(),
            vec![Requirement::with_filter(PACKAGE_NAMESPACE, "(osgi.wiring.package=nowhere)")],
        );
        graph.insert(broken);
        let good = graph.insert(exporter("good", &["p"]));
        let user = graph.insert(importer("user", "p", false));

        let engine = ResolutionEngine::new();
        let resolution = engine.resolve(&engine.context(&graph, user)).unwrap();
        assert_eq!(resolution.wires(user).unwrap()[0].provider, good);
        assert_eq!(resolution.len(), 2);
    }

    #[test]
    fn test_non_effective_requirement_ignored() {
        let mut graph = ModuleGraph::new();
        let mut directives = crate::model::Directives::new();
        directives.insert("filter".to_string(), "(osgi.wiring.package=nowhere)".to_string());
        directives.insert("effective".to_string(), "active".to_string());
        let module = Module::new(
            ModuleIdentity::new("test", "m", Version::new(1, 0, 0)),
            Vec::new(),
            vec![Requirement::new(PACKAGE_NAMESPACE, Default::default(), directives)],
        );
        let id = graph.insert(module);

        let engine = ResolutionEngine::new();
        assert!(engine.resolve(&engine.context(&graph, id)).is_ok());
    }

    #[test]
    fn test_hosted_capability_is_preferred() {
        let mut graph = ModuleGraph::new();
        let host = graph.insert(exporter("host", &[]));
        let regular = graph.insert(exporter("regular", &["p"]));
        let user = graph.insert(importer("user", "p", false));
        let hosted = vec![exporter("x", &["p"]).capabilities(None)[0].hosted_by(host)];

        let engine = ResolutionEngine::new();
        let resolution = engine
            .resolve(&engine.context_with_hosted(&graph, user, &hosted))
            .unwrap();
        let wire = &resolution.wires(user).unwrap()[0];
        assert_eq!(wire.provider, host);
        assert_ne!(wire.provider, regular);
    }

    /// `width` exporters of `p<layer>` per layer, each importing the next
    /// layer's package; the last layer imports a package nobody exports
    fn layered_graph(layers: usize, width: usize) -> (ModuleGraph, ModuleId) {
        let mut graph = ModuleGraph::new();
        for layer in 0..layers {
            let package = format!("p{}", layer);
            let below = if layer + 1 == layers {
                "missing".to_string()
            } else {
                format!("p{}", layer + 1)
            };
            for n in 0..width {
                let name = format!("m{}_{}", layer, n);
                graph.insert(Module::new(
                    ModuleIdentity::new("test", name.as_str(), Version::new(1, 0, 0)),
                    exporter(&name, &[package.as_str()]).capabilities(None).into_iter().cloned().collect(),
                    vec![Requirement::with_filter(
                        PACKAGE_NAMESPACE,
                        format!("(osgi.wiring.package={})", below),
                    )],
                ));
            }
        }
        let root = graph.insert(importer("root", "p0", true));
        (graph, root)
    }

    #[test]
    fn test_failed_providers_are_not_retried() {
        let (graph, root) = layered_graph(10, 4);

        let engine = ResolutionEngine::new();
        let started = std::time::Instant::now();
        let resolution = engine.resolve(&engine.context(&graph, root)).unwrap();

        assert!(
            started.elapsed() < std::time::Duration::from_secs(2),
            "took {:?}",
            started.elapsed()
        );
        assert_eq!(resolution.len(), 1);
        assert!(resolution.wires(root).unwrap().is_empty());
    }

    #[test]
    fn test_failure_in_layer_propagates_to_mandatory_importer() {
        let (mut graph, _) = layered_graph(3, 2);
        let user = graph.insert(importer("user", "p0", false));

        let engine = ResolutionEngine::new();
        let err = engine.resolve(&engine.context(&graph, user)).unwrap_err();
        assert!(matches!(err, ResolverError::UnresolvableModule { .. }));
    }

    #[test]
    fn test_cycle_resolves() {
        let mut graph = ModuleGraph::new();
        let a = Module::new(
            ModuleIdentity::new("test", "a", Version::new(1, 0, 0)),
            exporter("a", &["pa"]).capabilities(None).into_iter().cloned().collect(),
            vec![Requirement::with_filter(PACKAGE_NAMESPACE, "(osgi.wiring.package=pb)")],
        );
        let b = Module::new(
            ModuleIdentity::new("test", "b", Version::new(1, 0, 0)),
            exporter("b", &["pb"]).capabilities(None).into_iter().cloned().collect(),
            vec![Requirement::with_filter(PACKAGE_NAMESPACE, "(osgi.wiring.package=pa)")],
        );
        let a = graph.insert(a);
        let b = graph.insert(b);

        let engine = ResolutionEngine::new();
        let resolution = engine.resolve(&engine.context(&graph, a)).unwrap();
        assert_eq!(resolution.wires(a).unwrap()[0].provider, b);
        assert_eq!(resolution.wires(b).unwrap()[0].provider, a);
    }
}
