//! Environment overrides for component configuration.

use std::str::FromStr;

/// Parse `name` from the environment. Unset or unparsable values read as `None`
/// so callers fall back to their defaults.
pub fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

/// Boolean flag: `true`/`1`/`yes` (any case) enable it, anything else disables.
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}
