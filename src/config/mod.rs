//! Configuration management for bt-export
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables (the API credential only)
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Export output configuration
    #[serde(default)]
    pub export: ExportSettings,

    /// Network diagnostics configuration
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Name of the environment variable holding the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

/// Export output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Root directory for exported files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Rows requested per BTQL page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Best-effort network diagnostics run after a request timeout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Run traceroute against the API host after a timeout
    #[serde(default = "default_traceroute")]
    pub traceroute: bool,

    /// Upper bound for the probe itself, in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_base_url() -> String {
    "https://api.braintrust.dev".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_api_key_env() -> String {
    "BRAINTRUST_API_KEY".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("exports")
}

fn default_page_size() -> usize {
    100
}

fn default_traceroute() -> bool {
    true
}

fn default_probe_timeout() -> u64 {
    30
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    false
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            page_size: default_page_size(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            traceroute: default_traceroute(),
            probe_timeout: default_probe_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file, falling back to defaults
    ///
    /// An explicitly given path must exist. The default path is optional:
    /// when it is missing, defaults are returned.
    ///
    /// # Arguments
    /// * `path` - Explicit config file path, or `None` for the default location
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bt-export")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        let base = self.api.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".into(),
                value: self.api.base_url.clone(),
            }
            .into());
        }
        if self.api.timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.timeout".into(),
                value: "0".into(),
            }
            .into());
        }
        if self.export.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "export.page_size".into(),
                value: "0".into(),
            }
            .into());
        }
        if self.api.api_key_env.trim().is_empty() {
            return Err(ConfigError::MissingField("api.api_key_env".into()).into());
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout)
    }

    /// Read the API credential from the configured environment variable
    ///
    /// An unset or blank variable is a [`ConfigError::MissingCredential`].
    pub fn read_api_key(&self) -> Result<String> {
        Self::api_key_from(&self.api.api_key_env, std::env::var(&self.api.api_key_env).ok())
    }

    fn api_key_from(var: &str, value: Option<String>) -> Result<String> {
        match value {
            Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ConfigError::MissingCredential(var.to_string()).into()),
        }
    }

    /// Resolve the per-run export settings
    ///
    /// # Arguments
    /// * `project_id` - Project whose entities are exported
    /// * `api_key` - Bearer token
    pub fn export_config(&self, project_id: String, api_key: String) -> ExportConfig {
        ExportConfig {
            base_url: self.api.base_url.trim().trim_end_matches('/').to_string(),
            api_key,
            project_id,
            page_size: self.export.page_size,
            timeout: self.request_timeout(),
            output_dir: self.export.output_dir.clone(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// Everything one export run needs, resolved from configuration
#[derive(Clone)]
pub struct ExportConfig {
    /// API base URL without trailing slash
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Project to export
    pub project_id: String,
    /// Rows requested per BTQL page
    pub page_size: usize,
    /// Per-request timeout
    pub timeout: Duration,
    /// Root directory for exported files
    pub output_dir: PathBuf,
    /// Diagnostics settings
    pub diagnostics: DiagnosticsConfig,
}

impl std::fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("project_id", &self.project_id)
            .field("page_size", &self.page_size)
            .field("timeout", &self.timeout)
            .field("output_dir", &self.output_dir)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "https://api.braintrust.dev");
        assert_eq!(config.api.api_key_env, "BRAINTRUST_API_KEY");
        assert_eq!(config.export.page_size, 100);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [export]
            page_size = 250

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.export.page_size, 250);
        assert_eq!(config.export.output_dir, PathBuf::from("exports"));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.api.timeout, 10);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml_str("[export\npage_size = ").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.export.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_base_url() {
        let mut config = Config::default();
        config.api.base_url = "ftp://example.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_api_key() {
        assert!(Config::api_key_from("KEY", None).is_err());
        assert!(Config::api_key_from("KEY", Some("   ".into())).is_err());
        assert_eq!(
            Config::api_key_from("KEY", Some(" sk-123 ".into())).unwrap(),
            "sk-123"
        );
    }

    #[test]
    fn test_export_config_strips_trailing_slash() {
        let mut config = Config::default();
        config.api.base_url = "https://example.com/".into();
        let export = config.export_config("p1".into(), "secret".into());
        assert_eq!(export.base_url, "https://example.com");
        assert!(!format!("{:?}", export).contains("secret"));
    }

    #[test]
    fn test_export_config_trims_whitespace_around_base_url() {
        let mut config = Config::default();
        config.api.base_url = "  https://api.braintrust.dev/ \n".into();
        assert!(config.validate().is_ok());
        let export = config.export_config("p1".into(), "secret".into());
        assert_eq!(export.base_url, "https://api.braintrust.dev");
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::default();
        let text = config.to_toml_string().unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(parsed.api.base_url, config.api.base_url);
    }
}
