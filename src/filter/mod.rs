//! Filter predicate adapter
//!
//! Wraps the match-expression engine behind [`PredicateEngine`] so the resolver
//! only ever asks "does this requirement accept these attributes?".
//! Compiled filters are cached per filter string; the cache computes each
//! entry at most once even when several resolve calls race on it.

pub mod expr;
pub mod parser;

use moka::sync::Cache;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::model::{Attributes, Requirement};
use crate::traits::ResolverError;

pub use expr::{CompareOp, FilterExpr, ValuePart};

/// Default number of compiled filters kept in memory
pub const DEFAULT_FILTER_CACHE_CAPACITY: u64 = 10_000;

/// A parsed filter together with its source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    source: String,
    expr: FilterExpr,
}

impl Filter {
    pub fn parse(source: &str) -> Result<Self, ResolverError> {
        let expr = parser::parse_filter(source).map_err(|reason| ResolverError::MalformedFilter {
            filter: source.to_string(),
            reason,
        })?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn matches(&self, attributes: &Attributes) -> bool {
        self.expr.matches(attributes)
    }

    pub fn expr(&self) -> &FilterExpr {
        &self.expr
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for Filter {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Stable interface to the predicate engine used during resolution
pub trait PredicateEngine: Send + Sync {
    /// Whether `requirement` accepts a capability carrying `attributes`
    ///
    /// A malformed filter is an error, never a silent match or mismatch.
    fn matches(&self, requirement: &Requirement, attributes: &Attributes) -> Result<bool, ResolverError>;
}

/// Filter-based [`PredicateEngine`] with a concurrent compile cache
#[derive(Clone)]
pub struct FilterAdapter {
    cache: Cache<String, Arc<Filter>>,
}

impl FilterAdapter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FILTER_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            cache: Cache::new(capacity),
        }
    }

    /// Compiled form of `filter`, parsed at most once
    pub fn compile(&self, filter: &str) -> Result<Arc<Filter>, ResolverError> {
        self.cache
            .try_get_with(filter.to_string(), || {
                debug!("Compiling filter {}", filter);
                parser::parse_filter(filter).map(|expr| {
                    Arc::new(Filter {
                        source: filter.to_string(),
                        expr,
                    })
                })
            })
            .map_err(|reason: Arc<String>| {
                warn!("Rejecting malformed filter {}: {}", filter, reason);
                ResolverError::MalformedFilter {
                    filter: filter.to_string(),
                    reason: reason.to_string(),
                }
            })
    }
}

impl Default for FilterAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterAdapter")
            .field("cached", &self.cache.entry_count())
            .finish()
    }
}

impl PredicateEngine for FilterAdapter {
    fn matches(&self, requirement: &Requirement, attributes: &Attributes) -> Result<bool, ResolverError> {
        match requirement.filter() {
            // No filter: every capability in the namespace qualifies
            None => Ok(true),
            Some(filter) => Ok(self.compile(filter)?.matches(attributes)),
        }
    }
}
