//! Region visibility filter
//!
//! Removes package candidates a requester may not see according to the
//! membership index. Other namespaces pass through untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::RegionConfig;
use crate::model::namespace::PACKAGE_NAMESPACE;
use crate::model::{Capability, Module, ModuleGraph, ModuleKind, Requirement};
use crate::regions::store::MembershipIndex;
use crate::traits::{ResolverError, ResolverHook};

/// Treatment of providers the membership store knows nothing about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnclassifiedPolicy {
    /// Providers without feature or region entries are visible to everyone
    #[default]
    FailOpen,
    /// Such providers are only visible through the global or requester regions
    FailClosed,
}

/// Resolver hook enforcing region visibility
#[derive(Debug, Clone)]
pub struct RegionFilter {
    index: Arc<MembershipIndex>,
    policy: UnclassifiedPolicy,
}

impl RegionFilter {
    pub fn new(index: Arc<MembershipIndex>) -> Self {
        Self {
            index,
            policy: UnclassifiedPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: UnclassifiedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Load the membership index and policy from configuration
    pub fn from_config(config: &RegionConfig) -> Result<Self, ResolverError> {
        let index = MembershipIndex::from_config(config)?;
        Ok(Self::new(Arc::new(index)).with_policy(config.unclassified))
    }

    pub fn index(&self) -> &Arc<MembershipIndex> {
        &self.index
    }

    pub fn policy(&self) -> UnclassifiedPolicy {
        self.policy
    }

    /// Candidates of `requirement` its owner may wire to, in input order
    pub fn filter(
        &self,
        graph: &ModuleGraph,
        requirement: &Requirement,
        candidates: Vec<Capability>,
    ) -> Vec<Capability> {
        if requirement.namespace() != PACKAGE_NAMESPACE {
            return candidates;
        }

        let requester = requirement.owner().and_then(|id| graph.get(id));
        let req_features = requester
            .map(|module| self.index.features_of(module.identity()))
            .unwrap_or_default();
        let req_regions: BTreeSet<&str> = req_features
            .iter()
            .filter_map(|feature| self.index.regions_of(feature))
            .flatten()
            .map(String::as_str)
            .collect();

        candidates
            .into_iter()
            .filter(|capability| {
                let visible = self.is_visible(graph, requirement, requester, &req_features, &req_regions, capability);
                if !visible {
                    warn!(
                        "Hiding {} from {} by region membership",
                        capability,
                        requester.map(|m| m.to_string()).unwrap_or_else(|| "unknown module".to_string())
                    );
                }
                visible
            })
            .collect()
    }

    fn is_visible(
        &self,
        graph: &ModuleGraph,
        requirement: &Requirement,
        requester: Option<&Module>,
        req_features: &BTreeSet<&str>,
        req_regions: &BTreeSet<&str>,
        capability: &Capability,
    ) -> bool {
        let provider = capability.owner().and_then(|id| graph.get(id));

        if let Some(provider) = provider {
            if provider.kind() == ModuleKind::Framework {
                return true;
            }
            let same_id = capability.owner().is_some() && capability.owner() == requirement.owner();
            if same_id || requester.map_or(false, |r| r.identity() == provider.identity()) {
                return true;
            }
        }

        let cap_features = provider
            .map(|module| self.index.features_of(module.identity()))
            .unwrap_or_default();
        let fail_open = self.policy == UnclassifiedPolicy::FailOpen;

        if cap_features.is_empty() {
            if fail_open {
                debug!("{} is not part of any feature, visible", capability);
                return true;
            }
        } else {
            if !cap_features.is_disjoint(req_features) {
                return true;
            }
            if fail_open && cap_features.iter().any(|f| self.index.regions_of(f).is_none()) {
                debug!("{} belongs to a feature without regions, visible", capability);
                return true;
            }
        }

        match capability.attribute(PACKAGE_NAMESPACE).and_then(|v| v.as_str()) {
            Some(package) => self
                .index
                .is_visible_in(package, req_regions.iter().copied()),
            None => false,
        }
    }
}

impl ResolverHook for RegionFilter {
    fn filter_matches(&self, graph: &ModuleGraph, requirement: &Requirement, candidates: &mut Vec<Capability>) {
        let filtered = self.filter(graph, requirement, std::mem::take(candidates));
        *candidates = filtered;
    }
}
