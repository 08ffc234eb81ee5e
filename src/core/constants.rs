//! Constants used throughout configurations.
//!
//! Centralizes magic strings and tuning values.

/// Settings file name (configurations.toml).
pub const SETTINGS_FILE: &str = "configurations.toml";

/// Environment variable overriding the settings file path.
pub const SETTINGS_ENV: &str = "CONFIGURATIONS_SETTINGS";

/// Environment variable holding the log filter for the CLI.
pub const LOG_ENV: &str = "CONFIGURATIONS_LOG";

/// Unresolved lookups tolerated before every source is refreshed.
pub const DEFAULT_MISS_THRESHOLD: usize = 5;

/// Cache key prefix marking a remote secret store as loaded.
pub const LOADED_SENTINEL_PREFIX: &str = "_loaded_";

/// Region used when neither the caller nor the environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Environment variables consulted, in order, for the default region.
pub const REGION_ENV_VARS: &[&str] = &["AWS_REGION", "REGION"];

/// Version stage requested from the secret store.
pub const SECRET_VERSION_STAGE: &str = "AWSCURRENT";

/// Attempts made by remote clients before giving up.
pub const REMOTE_MAX_ATTEMPTS: u32 = 3;

/// Connect and per-attempt timeout for remote clients, in milliseconds.
pub const REMOTE_TIMEOUT_MS: u64 = 5_000;

/// Resolve the region for remote clients.
///
/// An explicit region wins; otherwise `AWS_REGION`, then `REGION`, then
/// [`DEFAULT_REGION`].
pub fn resolve_region(explicit: Option<&str>) -> String {
    if let Some(region) = explicit.filter(|r| !r.is_empty()) {
        return region.to_string();
    }
    REGION_ENV_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|r| !r.is_empty()))
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}
