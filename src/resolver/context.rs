//! Default resolve context over a module graph

use std::sync::Arc;
use tracing::debug;

use crate::filter::PredicateEngine;
use crate::model::{Capability, Module, ModuleGraph, ModuleId, Requirement};
use crate::traits::{ResolveContext, ResolverError, ResolverHook};

/// Resolve context used while ordering modules
///
/// One module is mandatory; every module of the graph is a candidate
/// provider. Provider lookup runs the predicate engine, then adds matching
/// hosted capabilities at the front, then lets each hook narrow the list.
pub struct OrderingContext<'a> {
    graph: &'a ModuleGraph,
    mandatory: Vec<ModuleId>,
    pool: Vec<ModuleId>,
    predicate: &'a dyn PredicateEngine,
    hooks: &'a [Arc<dyn ResolverHook>],
    hosted: &'a [Capability],
}

impl<'a> OrderingContext<'a> {
    pub fn new(
        graph: &'a ModuleGraph,
        mandatory: ModuleId,
        predicate: &'a dyn PredicateEngine,
        hooks: &'a [Arc<dyn ResolverHook>],
    ) -> Self {
        Self {
            graph,
            mandatory: vec![mandatory],
            pool: graph.ids().collect(),
            predicate,
            hooks,
            hosted: &[],
        }
    }

    /// Capabilities injected by the host environment
    ///
    /// Each must already carry the id of the module hosting it.
    pub fn with_hosted_capabilities(mut self, hosted: &'a [Capability]) -> Self {
        self.hosted = hosted;
        self
    }

    pub fn graph(&self) -> &ModuleGraph {
        self.graph
    }
}

impl ResolveContext for OrderingContext<'_> {
    fn mandatory_resources(&self) -> Vec<ModuleId> {
        self.mandatory.clone()
    }

    fn module(&self, id: ModuleId) -> Option<&Module> {
        self.graph.get(id)
    }

    fn find_providers(&self, requirement: &Requirement) -> Result<Vec<Capability>, ResolverError> {
        let namespace = requirement.namespace();
        let mut providers = Vec::new();

        for id in &self.pool {
            for capability in self.graph.capabilities(Some(*id), Some(namespace)) {
                if self.predicate.matches(requirement, capability.attributes())? {
                    providers.push(capability.clone());
                }
            }
        }

        for hosted in self.hosted.iter().filter(|c| c.namespace() == namespace) {
            if self.predicate.matches(requirement, hosted.attributes())? {
                self.insert_hosted_capability(&mut providers, hosted.clone());
            }
        }

        let before = providers.len();
        for hook in self.hooks {
            hook.filter_matches(self.graph, requirement, &mut providers);
        }
        if providers.len() != before {
            debug!(
                "Hooks removed {} of {} candidates for {}",
                before - providers.len(),
                before,
                requirement
            );
        }

        Ok(providers)
    }
}
