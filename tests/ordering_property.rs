//! Property tests for ordering invariants

mod common;

use common::module;
use feature_resolver::model::namespace::PACKAGE_NAMESPACE;
use feature_resolver::{
    Capability, DependencyOrderer, MembershipIndex, ModuleGraph, RegionFilter, UnclassifiedPolicy,
    Version,
};
use proptest::prelude::*;
use std::sync::Arc;

/// Module count, import matrix (only `j < i` is used) and input permutation
fn dag() -> impl Strategy<Value = (usize, Vec<Vec<bool>>, Vec<usize>)> {
    (1usize..8).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec(prop::collection::vec(any::<bool>(), n), n),
            Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
        )
    })
}

fn entries(n: usize, imports: &[Vec<bool>], order: &[usize]) -> Vec<(feature_resolver::Module, usize)> {
    let packages: Vec<String> = (0..n).map(|i| format!("org.example.p{}", i)).collect();
    order
        .iter()
        .map(|&i| {
            let name = format!("m{}", i);
            let wanted: Vec<&str> = (0..i)
                .filter(|&j| imports[i][j])
                .map(|j| packages[j].as_str())
                .collect();
            (module(&name, &[packages[i].as_str()], &wanted), i)
        })
        .collect()
}

proptest! {
    #[test]
    fn providers_precede_requirers((n, imports, order) in dag()) {
        let orderer = DependencyOrderer::default();
        let ordered = orderer.order(entries(n, &imports, &order)).unwrap();

        prop_assert_eq!(ordered.len(), n);
        let position = |i: usize| ordered.iter().position(|&x| x == i).unwrap();
        for i in 0..n {
            for j in 0..i {
                if imports[i][j] {
                    prop_assert!(
                        position(j) < position(i),
                        "m{} must precede m{} in {:?}", j, i, ordered
                    );
                }
            }
        }

        let again = orderer.order(entries(n, &imports, &order)).unwrap();
        prop_assert_eq!(ordered, again);
    }

    #[test]
    fn own_packages_always_visible(
        regions in prop::collection::vec("[a-z]{1,6}", 0..4),
        fail_closed in any::<bool>(),
    ) {
        let index = MembershipIndex::new()
            .with_identity("org.example:self:1.0.0", "self", Version::new(1, 0, 0))
            .with_bundle_features("org.example:self:1.0.0", ["F"])
            .with_feature_regions("F", regions.iter().map(String::as_str))
            .with_region_packages("other", ["org.example.unrelated"]);
        let policy = if fail_closed {
            UnclassifiedPolicy::FailClosed
        } else {
            UnclassifiedPolicy::FailOpen
        };
        let filter = RegionFilter::new(Arc::new(index)).with_policy(policy);

        let mut graph = ModuleGraph::new();
        let id = graph.insert(module("self", &["org.example.own"], &["org.example.own"]));
        let requirement = graph.get(id).unwrap().requirements(Some(PACKAGE_NAMESPACE))[0].clone();
        let candidates: Vec<Capability> = graph
            .capabilities(Some(id), Some(PACKAGE_NAMESPACE))
            .into_iter()
            .cloned()
            .collect();

        prop_assert_eq!(filter.filter(&graph, &requirement, candidates).len(), 1);
    }
}
