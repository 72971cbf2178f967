//! Dependency ordering through the public API

mod common;

use common::*;
use feature_resolver::model::namespace::PACKAGE_NAMESPACE;
use feature_resolver::{
    AttributeValue, Attributes, Capability, DependencyOrderer, Directives, Module, ModuleIdentity,
    Requirement, ResolverError, Version,
};
use std::fs;

#[test]
fn test_chain_orders_providers_first() {
    let repo = ModuleRepo::new();
    repo.add("a", &manifest("a", &["org.example.a"], &[]))
        .add("b", &manifest("b", &["org.example.b"], &["org.example.a"]))
        .add("c", &manifest("c", &[], &["org.example.b"]));

    let features = vec![feature("FC", &["c"]), feature("FA", &["a"]), feature("FB", &["b"])];
    let ordered = DependencyOrderer::default()
        .order_features(&features, &repo.provider())
        .unwrap();

    let names: Vec<&str> = ordered.iter().map(|f| f.id.artifact.as_str()).collect();
    assert_eq!(names, vec!["FA", "FB", "FC"]);
}

#[test]
fn test_empty_input() {
    let orderer = DependencyOrderer::default();
    let ordered: Vec<&str> = orderer.order(Vec::<(Module, &str)>::new()).unwrap();
    assert!(ordered.is_empty());

    let repo = ModuleRepo::new();
    assert!(orderer.order_features(&[], &repo.provider()).unwrap().is_empty());
}

#[test]
fn test_feature_reported_once() {
    let repo = ModuleRepo::new();
    repo.add("a", &manifest("a", &["org.example.a"], &[]))
        .add("b", &manifest("b", &[], &["org.example.a"]));

    let features = vec![feature("F", &["a", "b"])];
    let ordered = DependencyOrderer::default()
        .order_features(&features, &repo.provider())
        .unwrap();
    assert_eq!(ordered.len(), 1);
}

#[test]
fn test_fragment_placed_immediately_before_host() {
    let host = module("host", &["org.example.host"], &[]);
    let user = module("user", &[], &["org.example.host"]);
    let fragment = feature_resolver::ModuleManifest::from_toml_str(&fragment_manifest("frag", "host"))
        .and_then(|m| m.to_module())
        .unwrap();

    let ordered = DependencyOrderer::default()
        .order(vec![(host, "host"), (user, "user"), (fragment, "frag")])
        .unwrap();
    assert_eq!(ordered, vec!["frag", "host", "user"]);
}

#[test]
fn test_fragment_without_host_is_unresolvable() {
    let lonely = feature_resolver::ModuleManifest::from_toml_str(&fragment_manifest("frag", "absent"))
        .and_then(|m| m.to_module())
        .unwrap();
    // the host requirement cannot be satisfied
    let err = DependencyOrderer::default()
        .order(vec![(lonely, "frag")])
        .unwrap_err();
    assert!(matches!(err, ResolverError::UnresolvableModule { .. }));
}

#[test]
fn test_optional_import_does_not_block() {
    let manifest = "symbolic_name = \"a\"\nversion = \"1.0.0\"\n\n[[imports]]\nname = \"org.nowhere\"\noptional = true\n";
    let module = feature_resolver::ModuleManifest::from_toml_str(manifest)
        .and_then(|m| m.to_module())
        .unwrap();
    assert_eq!(DependencyOrderer::default().order(vec![(module, 1)]).unwrap(), vec![1]);
}

#[test]
fn test_missing_provider_fails_with_unsatisfied_requirement() {
    let module = module("a", &[], &["org.nowhere"]);
    let err = DependencyOrderer::default()
        .order(vec![(module, "a")])
        .unwrap_err();
    match err {
        ResolverError::UnresolvableModule { module, unsatisfied } => {
            assert!(module.starts_with("a~"));
            assert_eq!(unsatisfied.len(), 1);
            assert!(unsatisfied[0].filter().unwrap().contains("org.nowhere"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_malformed_filter_aborts() {
    let module = Module::new(
        ModuleIdentity::new("g", "broken", Version::new(1, 0, 0)),
        Vec::new(),
        vec![Requirement::with_filter(PACKAGE_NAMESPACE, "(osgi.wiring.package=org.osgi.framework")],
    );
    let err = DependencyOrderer::default()
        .order(vec![(module, "broken")])
        .unwrap_err();
    assert!(matches!(err, ResolverError::MalformedFilter { .. }));
}

#[test]
fn test_missing_manifest_fails_before_resolution() {
    let repo = ModuleRepo::new();
    repo.add("a", &manifest("a", &["org.example.a"], &[]));

    let features = vec![feature("FA", &["a"]), feature("FX", &["not-there"])];
    let err = DependencyOrderer::default()
        .order_features(&features, &repo.provider())
        .unwrap_err();
    match err {
        ResolverError::MissingModuleFile { artifact, searched } => {
            assert_eq!(artifact.artifact, "not-there");
            assert!(!searched.is_empty());
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_framework_and_launch_api_packages_available() {
    let module = module(
        "a",
        &[],
        &["org.osgi.framework", "org.apache.sling.launchpad.api"],
    );
    assert_eq!(
        DependencyOrderer::default().order(vec![(module, "a")]).unwrap(),
        vec!["a"]
    );
}

#[test]
fn test_launch_api_manifest_taken_from_repository() {
    let repo = ModuleRepo::new();
    repo.add("a", &manifest("a", &[], &["org.apache.sling.launchpad.api.custom"]));
    fs::write(
        repo.temp_dir
            .path()
            .join("org.apache.sling.launchpad.api-1.2.0.toml"),
        manifest("org.apache.sling.launchpad.api", &["org.apache.sling.launchpad.api.custom"], &[]),
    )
    .unwrap();

    let ordered = DependencyOrderer::default()
        .order_features(&[feature("FA", &["a"])], &repo.provider())
        .unwrap();
    assert_eq!(ordered.len(), 1);
}

#[test]
fn test_hosted_capability_satisfies_requirement() {
    let mut attrs = Attributes::new();
    attrs.insert("osgi.ee".to_string(), AttributeValue::from("JavaSE"));
    attrs.insert(
        "version".to_string(),
        AttributeValue::Version(Version::new(11, 0, 0)),
    );
    let execution_env = Capability::new("osgi.ee", attrs, Directives::new());

    let module = Module::new(
        ModuleIdentity::new("g", "needs-ee", Version::new(1, 0, 0)),
        Vec::new(),
        vec![Requirement::with_filter(
            "osgi.ee",
            "(&(osgi.ee=JavaSE)(version>=1.8))",
        )],
    );

    assert!(DependencyOrderer::default().order(vec![(module.clone(), 1)]).is_err());
    let orderer = DependencyOrderer::default().with_hosted_capability(execution_env);
    assert_eq!(orderer.order(vec![(module, 1)]).unwrap(), vec![1]);
}

#[test]
fn test_ordering_is_idempotent() {
    let entries = || {
        vec![
            (module("c", &["pc"], &["pb", "pa"]), "c"),
            (module("a", &["pa"], &[]), "a"),
            (module("d", &[], &["pc"]), "d"),
            (module("b", &["pb"], &["pa"]), "b"),
        ]
    };
    let orderer = DependencyOrderer::default();
    let first = orderer.order(entries()).unwrap();
    let second = orderer.order(entries()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, vec!["a", "b", "c", "d"]);
}
