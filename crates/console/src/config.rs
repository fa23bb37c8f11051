use std::time::Duration;

use client::ApiClientConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub gps: GpsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Backend origin, without a trailing path
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout; unset means no timeout
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json`, `pretty` or `compact`
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GpsConfig {
    /// Points requested when the command line gives no limit
    #[serde(default = "default_gps_limit")]
    pub default_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_gps_limit(),
        }
    }
}

impl ApiConfig {
    pub fn client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.base_url.clone(),
            timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://geofencing-8a9755fd6a46.herokuapp.com".to_string()
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_log_format() -> String {
    "compact".to_string()
}
fn default_gps_limit() -> u32 {
    100
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration (optional)
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. the file passed with `--config`, if any
    /// 4. Environment variables with GC__ prefix
    pub fn load(explicit: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(config::File::with_name(path));
        }

        let config = builder
            .add_source(config::Environment::with_prefix("GC").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config from embedded defaults and overrides only, without
    /// touching the file system or the environment.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [api]
            base_url = "https://geofencing.example.com"

            [logging]
            level = "info"
            format = "json"

            [gps]
            default_limit = 100
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "GC__API__BASE_URL environment variable must be set".to_string(),
            ));
        }

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigValidationError::InvalidValue(format!(
                "api.base_url must start with http:// or https://, got {}",
                base_url
            )));
        }

        if self.api.request_timeout_secs == Some(0) {
            return Err(ConfigValidationError::InvalidValue(
                "api.request_timeout_secs cannot be 0; leave it unset to disable the timeout"
                    .to_string(),
            ));
        }

        if self.gps.default_limit == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "gps.default_limit cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load_with_defaults() {
        let config = Config::load_for_test(&[]).expect("Failed to load config");

        assert_eq!(config.api.base_url, "https://geofencing.example.com");
        assert_eq!(config.api.request_timeout_secs, None);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.gps.default_limit, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_override() {
        let config = Config::load_for_test(&[
            ("api.base_url", "http://localhost:3000"),
            ("api.request_timeout_secs", "15"),
            ("logging.level", "debug"),
        ])
        .expect("Failed to load config");

        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.api.request_timeout_secs, Some(15));
        assert_eq!(config.logging.level, "debug");

        let client = config.api.client_config();
        assert_eq!(client.timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_config_validation_missing_base_url() {
        let config =
            Config::load_for_test(&[("api.base_url", "")]).expect("Failed to load config");
        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("GC__API__BASE_URL"));
    }

    #[test]
    fn test_config_validation_rejects_non_http_url() {
        let config = Config::load_for_test(&[("api.base_url", "ftp://example.com")])
            .expect("Failed to load config");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_values() {
        let config = Config::load_for_test(&[("gps.default_limit", "0")])
            .expect("Failed to load config");
        assert!(config.validate().unwrap_err().to_string().contains("default_limit"));

        let config = Config::load_for_test(&[("api.request_timeout_secs", "0")])
            .expect("Failed to load config");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_has_no_timeout() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.api.client_config().timeout, None);
    }
}
