// Configuration utilities for queuesplice
//
// The configuration is a single JSON file. Service credentials live in the
// "services" subtree; top-level service sections are still accepted.

use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::helpers::retry::RetryPolicy;
use crate::helpers::spotify::SpotifyConfig;
use crate::logging::LoggingConfig;

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "queuesplice.json";

/// Errors raised while loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Timeout for every remote call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: default_timeout_secs() }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub retry: RetryPolicy,
    /// The complete document, used for service lookups
    pub raw: Value,
}

impl AppConfig {
    /// Load the configuration from `path`. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse a configuration document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: Value = serde_json::from_str(json)?;
        let section = |name: &str| raw.get(name).cloned().unwrap_or(Value::Null);

        let logging = match section("logging") {
            Value::Null => LoggingConfig::default(),
            value => serde_json::from_value(value)?,
        };
        let http = match section("http") {
            Value::Null => HttpConfig::default(),
            value => serde_json::from_value(value)?,
        };
        let retry = match section("retry") {
            Value::Null => RetryPolicy::default(),
            value => serde_json::from_value(value)?,
        };

        Ok(Self { logging, http, retry, raw })
    }

    /// Spotify settings from the config file with environment overrides applied
    pub fn spotify(&self) -> SpotifyConfig {
        let section = get_service_config(&self.raw, "spotify")
            .cloned()
            .unwrap_or(Value::Null);
        SpotifyConfig::from_json(&section).with_env_overrides()
    }
}

/// Helper function to get service configuration with backward compatibility
///
/// This function first tries to find the service in the "services" structure,
/// then falls back to the old top-level structure.
///
/// # Example
/// ```rust
/// use serde_json::json;
/// use queuesplice::config::get_service_config;
///
/// let config = json!({
///   "services": {
///     "spotify": { "client_id": "abc" }
///   }
/// });
/// assert_eq!(get_service_config(&config, "spotify").unwrap()["client_id"], "abc");
///
/// // Legacy layout
/// let old_config = json!({ "spotify": { "client_id": "def" } });
/// assert_eq!(get_service_config(&old_config, "spotify").unwrap()["client_id"], "def");
/// ```
pub fn get_service_config<'a>(config: &'a Value, service_name: &str) -> Option<&'a Value> {
    if let Some(service_config) = config.get("services").and_then(|s| s.get(service_name)) {
        debug!("Found {} configuration in services section", service_name);
        return Some(service_config);
    }

    if let Some(service_config) = config.get(service_name) {
        debug!("Found {} configuration at top level (legacy structure)", service_name);
        return Some(service_config);
    }

    debug!("No {} configuration found in either services section or top level", service_name);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_sections() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{
            "logging": {{ "level": "debug", "subsystems": {{ "walker": "trace" }} }},
            "http": {{ "timeout_secs": 3 }},
            "retry": {{ "max_attempts": 2, "interval_ms": 50 }}
        }}"#).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.subsystems.get("walker").map(String::as_str), Some("trace"));
        assert_eq!(config.http.timeout_secs, 3);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.interval_ms, 50);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(AppConfig::load(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_service_lookup_prefers_services_section() {
        let config = json!({
            "services": { "spotify": { "client_id": "new" } },
            "spotify": { "client_id": "old" }
        });
        assert_eq!(get_service_config(&config, "spotify").unwrap()["client_id"], "new");
        assert!(get_service_config(&config, "lastfm").is_none());
    }

    #[test]
    #[serial]
    fn test_spotify_section_with_env_override() {
        let config = AppConfig::from_json(r#"{
            "spotify": { "access_token": "from-file", "refresh_token": "r" }
        }"#).unwrap();

        std::env::set_var("SPOTIFY_ACCESS_TOKEN", "from-env");
        let spotify = config.spotify();
        std::env::remove_var("SPOTIFY_ACCESS_TOKEN");

        assert_eq!(spotify.access_token.as_deref(), Some("from-env"));
        assert_eq!(spotify.refresh_token.as_deref(), Some("r"));
        assert_eq!(spotify.api_url, "https://api.spotify.com/v1/");
    }
}
