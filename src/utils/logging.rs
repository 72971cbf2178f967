//! Logging initialization
//!
//! - Respects RUST_LOG environment variable
//! - Allows configuration via config file
//! - Optional JSON output behind the `json-logging` feature
//!
//! # Usage
//!
//! ```rust,no_run
//! use feature_resolver::utils::init_logging;
//!
//! init_logging(None); // Uses RUST_LOG or defaults to "info"
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::utils::env::env_opt;

/// Filter to install: RUST_LOG, then the config filter, then "info"
fn resolve_filter(filter: Option<&str>) -> EnvFilter {
    if env_opt("RUST_LOG").is_some() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::new(filter.unwrap_or("info"))
}

/// Initialize human-readable logging on stderr
///
/// # Arguments
/// * `filter` - Optional log filter from config (e.g., "info", "feature_resolver::registry=debug").
///              RUST_LOG takes precedence when set.
///
/// Calling it twice panics, as with any global subscriber.
pub fn init_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(env_opt("NO_COLOR").is_none()), // Respect NO_COLOR standard
        )
        .with(resolve_filter(filter))
        .init();
}

/// Initialize logging with JSON output, for log aggregation
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(resolve_filter(filter))
        .init();
}

/// Initialize logging from [`LoggingConfig`]
///
/// Falls back to plain output when JSON is requested but the
/// `json-logging` feature is not enabled.
pub fn init_logging_from_config(config: Option<&LoggingConfig>) {
    let filter = config.and_then(|c| c.filter.as_deref());

    if config.map(|c| c.json_format).unwrap_or(false) {
        #[cfg(feature = "json-logging")]
        {
            init_json_logging(filter);
        }
        #[cfg(not(feature = "json-logging"))]
        {
            init_logging(filter);
        }
    } else {
        init_logging(filter);
    }
}
