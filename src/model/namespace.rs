//! Well-known namespaces, attributes and directives

/// Package export/import namespace
pub const PACKAGE_NAMESPACE: &str = "osgi.wiring.package";
/// Bundle (require-bundle) namespace
pub const BUNDLE_NAMESPACE: &str = "osgi.wiring.bundle";
/// Fragment host namespace
pub const HOST_NAMESPACE: &str = "osgi.wiring.host";

pub const VERSION_ATTRIBUTE: &str = "version";
pub const BUNDLE_SYMBOLIC_NAME_ATTRIBUTE: &str = "bundle-symbolic-name";
pub const BUNDLE_VERSION_ATTRIBUTE: &str = "bundle-version";

pub const FILTER_DIRECTIVE: &str = "filter";
pub const RESOLUTION_DIRECTIVE: &str = "resolution";
pub const EFFECTIVE_DIRECTIVE: &str = "effective";

pub const RESOLUTION_OPTIONAL: &str = "optional";
pub const EFFECTIVE_RESOLVE: &str = "resolve";

/// Region whose packages are visible to every feature
pub const GLOBAL_REGION: &str = "global";
