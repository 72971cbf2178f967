//! Capabilities and requirements
//!
//! Both are namespaced attribute/directive bags. The owning module is kept as
//! an arena index and never takes part in equality or hashing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::model::module::ModuleId;
use crate::model::namespace::{
    EFFECTIVE_DIRECTIVE, EFFECTIVE_RESOLVE, FILTER_DIRECTIVE, RESOLUTION_DIRECTIVE,
    RESOLUTION_OPTIONAL,
};
use crate::model::version::Version;

/// Typed attribute value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeValue {
    String(String),
    Long(i64),
    Version(Version),
    List(Vec<String>),
}

impl AttributeValue {
    /// String form used for diagnostics and for untyped comparisons
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{}", s),
            AttributeValue::Long(n) => write!(f, "{}", n),
            AttributeValue::Version(v) => write!(f, "{}", v),
            AttributeValue::List(items) => write!(f, "{}", items.join(",")),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Long(n)
    }
}

impl From<Version> for AttributeValue {
    fn from(v: Version) -> Self {
        AttributeValue::Version(v)
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;
pub type Directives = BTreeMap<String, String>;

/// Something a module provides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    namespace: String,
    attributes: Attributes,
    directives: Directives,
    #[serde(skip)]
    owner: Option<ModuleId>,
}

impl Capability {
    pub fn new(namespace: impl Into<String>, attributes: Attributes, directives: Directives) -> Self {
        Self {
            namespace: namespace.into(),
            attributes,
            directives,
            owner: None,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Module this capability belongs to, once inserted into a graph
    pub fn owner(&self) -> Option<ModuleId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: ModuleId) {
        self.owner = Some(owner);
    }

    /// Copy of this capability attributed to another module
    pub fn hosted_by(&self, host: ModuleId) -> Self {
        let mut hosted = self.clone();
        hosted.owner = Some(host);
        hosted
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.attributes == other.attributes
            && self.directives == other.directives
    }
}

impl Eq for Capability {}

impl Hash for Capability {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.attributes.hash(state);
        self.directives.hash(state);
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.namespace)?;
        for (k, v) in &self.attributes {
            write!(f, ";{}={}", k, v)?;
        }
        Ok(())
    }
}

/// Something a module needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    namespace: String,
    attributes: Attributes,
    directives: Directives,
    #[serde(skip)]
    owner: Option<ModuleId>,
}

impl Requirement {
    pub fn new(namespace: impl Into<String>, attributes: Attributes, directives: Directives) -> Self {
        Self {
            namespace: namespace.into(),
            attributes,
            directives,
            owner: None,
        }
    }

    /// Requirement whose only directive is a filter
    pub fn with_filter(namespace: impl Into<String>, filter: impl Into<String>) -> Self {
        let mut directives = Directives::new();
        directives.insert(FILTER_DIRECTIVE.to_string(), filter.into());
        Self::new(namespace, Attributes::new(), directives)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Serialized match expression, if any
    pub fn filter(&self) -> Option<&str> {
        self.directives.get(FILTER_DIRECTIVE).map(|s| s.as_str())
    }

    /// `resolution:=optional`
    pub fn is_optional(&self) -> bool {
        self.directives
            .get(RESOLUTION_DIRECTIVE)
            .map(|r| r.trim() == RESOLUTION_OPTIONAL)
            .unwrap_or(false)
    }

    /// Value of the `effective` directive, `resolve` when absent
    pub fn effective(&self) -> &str {
        self.directives
            .get(EFFECTIVE_DIRECTIVE)
            .map(|s| s.trim())
            .unwrap_or(EFFECTIVE_RESOLVE)
    }

    /// Module that declared this requirement, once inserted into a graph
    pub fn owner(&self) -> Option<ModuleId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: ModuleId) {
        self.owner = Some(owner);
    }
}

impl PartialEq for Requirement {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.attributes == other.attributes
            && self.directives == other.directives
    }
}

impl Eq for Requirement {}

impl Hash for Requirement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.attributes.hash(state);
        self.directives.hash(state);
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.filter() {
            Some(filter) => write!(f, "{}{}", self.namespace, filter),
            None => write!(f, "{}", self.namespace),
        }
    }
}
