//! Client configuration.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default REST API base URL (can be overridden at compile time via WELLSPRING_API_URL).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("WELLSPRING_API_URL") {
    Some(url) => url,
    None => "http://localhost:8080/api",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Name of the cookie holding the access token.
pub const DEFAULT_TOKEN_COOKIE_NAME: &str = "access_token";

/// Seconds before expiry at which a scheduled refresh fires.
pub const DEFAULT_REFRESH_BUFFER_SECS: u64 = 120;

/// Floor for any scheduled refresh delay.
pub const DEFAULT_MIN_REFRESH_INTERVAL_SECS: u64 = 30;

/// Remaining lifetime below which a focus check refreshes proactively.
pub const DEFAULT_CRITICAL_TIME_THRESHOLD_SECS: u64 = 90;

/// Per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Session client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL every endpoint path is joined onto.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Cookie name used for the access token.
    #[serde(default = "default_token_cookie_name")]
    pub token_cookie_name: String,
    #[serde(default = "default_refresh_buffer_secs")]
    pub refresh_buffer_secs: u64,
    #[serde(default = "default_min_refresh_interval_secs")]
    pub min_refresh_interval_secs: u64,
    #[serde(default = "default_critical_time_threshold_secs")]
    pub critical_time_threshold_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_token_cookie_name() -> String {
    DEFAULT_TOKEN_COOKIE_NAME.to_string()
}

fn default_refresh_buffer_secs() -> u64 {
    DEFAULT_REFRESH_BUFFER_SECS
}

fn default_min_refresh_interval_secs() -> u64 {
    DEFAULT_MIN_REFRESH_INTERVAL_SECS
}

fn default_critical_time_threshold_secs() -> u64 {
    DEFAULT_CRITICAL_TIME_THRESHOLD_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            token_cookie_name: default_token_cookie_name(),
            refresh_buffer_secs: DEFAULT_REFRESH_BUFFER_SECS,
            min_refresh_interval_secs: DEFAULT_MIN_REFRESH_INTERVAL_SECS,
            critical_time_threshold_secs: DEFAULT_CRITICAL_TIME_THRESHOLD_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from `config.json`, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Some(level) = non_empty_env("WELLSPRING_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = non_empty_env("WELLSPRING_API_URL") {
            self.api_base_url = url;
        }
    }

    /// Reject settings the session manager cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_base_url()?;
        if self.token_cookie_name.trim().is_empty() {
            return Err(CoreError::Config(
                "token_cookie_name must not be empty".to_string(),
            ));
        }
        if self.min_refresh_interval_secs == 0 {
            return Err(CoreError::Config(
                "min_refresh_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The API base URL, parsed.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.token_cookie_name, "access_token");
        assert_eq!(config.refresh_buffer_secs, 120);
        assert_eq!(config.min_refresh_interval_secs, 30);
        assert_eq!(config.critical_time_threshold_secs, 90);
    }

    #[test]
    fn test_config_load_from_file_fills_missing_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        std::fs::write(
            &config_path,
            r#"{ "log_level": "debug", "refresh_buffer_secs": 60 }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.refresh_buffer_secs, 60);
        assert_eq!(config.min_refresh_interval_secs, 30);
        assert_eq!(config.token_cookie_name, DEFAULT_TOKEN_COOKIE_NAME);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config {
            token_cookie_name: "ws_token".to_string(),
            ..Config::default()
        };
        config.save(&paths).unwrap();

        let loaded = Config::load(&paths).unwrap();
        assert_eq!(loaded.token_cookie_name, "ws_token");
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.refresh_buffer_secs, DEFAULT_REFRESH_BUFFER_SECS);
    }

    #[test]
    fn test_config_invalid_url() {
        let config = Config {
            api_base_url: "not a valid url".to_string(),
            ..Config::default()
        };

        assert!(config.api_base_url().is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_empty_cookie_name() {
        let config = Config {
            token_cookie_name: "  ".to_string(),
            ..Config::default()
        };

        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }
}
