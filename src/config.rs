//! HTTP client configuration.
//!
//! Defaults match a polite scraping profile (30 s timeout, 5 retries, 500 ms
//! base backoff capped at 10 s). An optional YAML file can override any
//! field:
//!
//! ```yaml
//! http:
//!   timeout_secs: 10
//!   user_agent: "MyScraper/1.0"
//!   retries: 3
//!   base_backoff_ms: 250
//!   max_backoff_ms: 5000
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
}

/// Settings for the shared HTTP client and its retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request deadline.
    pub timeout_secs: u64,
    /// User-Agent header; empty disables it.
    pub user_agent: String,
    /// Retries after the first attempt.
    pub retries: usize,
    /// First backoff delay.
    pub base_backoff_ms: u64,
    /// Backoff cap, jitter included.
    pub max_backoff_ms: u64,
    pub connect_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (QuoteApp)".to_string(),
            retries: 5,
            base_backoff_ms: 500,
            max_backoff_ms: 10_000,
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 10,
            pool_idle_timeout_secs: 90,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Config {
    /// Load the configuration, or the defaults when `path` is `None`.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), ?config.http, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.http.retries, 5);
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
        assert_eq!(config.http.base_backoff(), Duration::from_millis(500));
        assert_eq!(config.http.max_backoff(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("http:\n  retries: 2\n  user_agent: TestAgent/1.0\n").unwrap();
        assert_eq!(config.http.retries, 2);
        assert_eq!(config.http.user_agent, "TestAgent/1.0");
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.max_backoff_ms, 10_000);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(Config::from_yaml("http:\n  retries: many\n").is_err());
    }

    #[test]
    fn test_load_without_path() {
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/quote_harvest.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
