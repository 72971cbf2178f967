//! Environment variable utilities

/// Get environment variable as Option
///
/// Returns `Some(value)` if set, `None` if not set.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
