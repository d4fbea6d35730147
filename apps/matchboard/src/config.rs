use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::session::cache::{CacheConfig, DEFAULT_NAMESPACE};
use crate::session::view_state::StalenessPolicy;

/// Host configuration loaded from environment variables.
/// Every variable is optional; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Base URL of the stage persistence service. `None` runs with the local backend.
    pub stage_backend_url: Option<String>,
    pub stage_backend_timeout: Duration,
    /// Directory for the file backing store. `None` keeps session state in memory.
    pub session_store_dir: Option<PathBuf>,
    pub session_namespace: String,
    pub session_debounce: Duration,
    pub session_capacity: Option<NonZeroUsize>,
    pub session_fresh: Duration,
    pub session_stale: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            stage_backend_url: optional_env("STAGE_BACKEND_URL"),
            stage_backend_timeout: Duration::from_secs(parse_env("STAGE_BACKEND_TIMEOUT_SECS", 15)?),
            session_store_dir: optional_env("SESSION_STORE_DIR").map(PathBuf::from),
            session_namespace: optional_env("SESSION_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            session_debounce: Duration::from_millis(parse_env("SESSION_DEBOUNCE_MS", 100)?),
            session_capacity: optional_env("SESSION_CAPACITY")
                .map(|raw| {
                    raw.parse::<NonZeroUsize>()
                        .context("SESSION_CAPACITY must be a positive integer")
                })
                .transpose()?,
            session_fresh: Duration::from_secs(parse_env("SESSION_FRESH_SECS", 300)?),
            session_stale: Duration::from_secs(parse_env("SESSION_STALE_SECS", 600)?),
        })
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            namespace: self.session_namespace.clone(),
            debounce: self.session_debounce,
            capacity: self.session_capacity,
        }
    }

    pub fn staleness_policy(&self) -> StalenessPolicy {
        StalenessPolicy::new(self.session_fresh, self.session_stale)
    }
}

impl Default for Config {
    fn default() -> Self {
        let cache = CacheConfig::default();
        let staleness = StalenessPolicy::default();
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            stage_backend_url: None,
            stage_backend_timeout: Duration::from_secs(15),
            session_store_dir: None,
            session_namespace: cache.namespace,
            session_debounce: cache.debounce,
            session_capacity: cache.capacity,
            session_fresh: staleness.fresh,
            session_stale: staleness.stale,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let port: u16 = parse_env("MATCHBOARD_TEST_UNSET_PORT", 9000).unwrap();
        assert_eq!(port, 9000);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("MATCHBOARD_TEST_BAD_PORT", "eighty");
        let err = parse_env::<u16>("MATCHBOARD_TEST_BAD_PORT", 8080).unwrap_err();
        assert!(err.to_string().contains("MATCHBOARD_TEST_BAD_PORT"));
        std::env::remove_var("MATCHBOARD_TEST_BAD_PORT");
    }

    #[test]
    fn test_blank_optional_env_is_none() {
        std::env::set_var("MATCHBOARD_TEST_BLANK", "   ");
        assert_eq!(optional_env("MATCHBOARD_TEST_BLANK"), None);
        std::env::remove_var("MATCHBOARD_TEST_BLANK");
    }

    #[test]
    fn test_default_matches_cache_defaults() {
        let config = Config::default();
        let cache = config.cache_config();
        assert_eq!(cache.debounce, Duration::from_millis(100));
        assert_eq!(cache.namespace, "matchboard");
        assert!(cache.capacity.is_none());
        assert_eq!(config.staleness_policy(), StalenessPolicy::default());
    }
}
