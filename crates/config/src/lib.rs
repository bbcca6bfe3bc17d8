//! Configuration loading, validation, and management for promptseq.
//!
//! Loads configuration from `~/.promptseq/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use promptseq_core::prompt::{DEFAULT_MODEL, DEFAULT_TEMPERATURE, PromptDefaults};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.promptseq/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Completion service used when a request does not pick one
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model for prompts that do not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Temperature for prompts that do not set one
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// HTTP timeout for a single completion call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Rate limiting for the gateway's `/api` routes
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    DEFAULT_MODEL.into()
}
fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}
fn default_request_timeout() -> u64 {
    120
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("gateway", &self.gateway)
            .field("rate_limit", &self.rate_limit)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// The single origin allowed by CORS
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    /// Maximum accepted request body
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_allowed_origin() -> String {
    "http://localhost:3000".into()
}
fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origin: default_allowed_origin(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests allowed per client within one window
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_requests() -> usize {
    100
}
fn default_window_secs() -> u64 {
    15 * 60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.promptseq/config.toml).
    ///
    /// Environment variables take precedence over the file:
    /// - `PROMPTSEQ_API_KEY`, then `OPENAI_API_KEY` (only when no key is configured)
    /// - `PROMPTSEQ_PROVIDER`, `PROMPTSEQ_MODEL`
    /// - `PORT` for the gateway port, `FRONTEND_URL` for the CORS origin
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with(&config_path, |key| std::env::var(key).ok())
    }

    /// File, then environment overrides, then validation of the result.
    fn load_with(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if self.api_key.is_none() {
            self.api_key = lookup("PROMPTSEQ_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("PROMPTSEQ_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("PROMPTSEQ_MODEL") {
            self.default_model = model;
        }

        if let Some(port) = lookup("PORT") {
            self.gateway.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT must be a port number, got '{port}'"))
            })?;
        }

        if let Some(origin) = lookup("FRONTEND_URL") {
            self.gateway.allowed_origin = origin;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".promptseq")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_model must not be empty".into(),
            ));
        }

        if self.gateway.body_limit_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.body_limit_bytes must be > 0".into(),
            ));
        }

        if self.rate_limit.enabled
            && (self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0)
        {
            return Err(ConfigError::ValidationError(
                "rate_limit.max_requests and rate_limit.window_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Fallbacks handed to prompt normalization.
    pub fn prompt_defaults(&self) -> PromptDefaults {
        PromptDefaults {
            model: self.default_model.clone(),
            temperature: self.default_temperature,
        }
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
            gateway: GatewayConfig::default(),
            rate_limit: RateLimitConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.default_model, "gpt-3.5-turbo");
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.rate_limit.window_secs, config.rate_limit.window_secs);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_rate_limit_window_rejected() {
        let mut config = AppConfig::default();
        config.rate_limit.window_secs = 0;
        assert!(config.validate().is_err());

        config.rate_limit.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_provider, "openai");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_model = "gpt-4o-mini"
default_temperature = 0.4

[gateway]
port = 8088

[providers.ollama]
api_url = "http://localhost:11434/v1"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.gateway.port, 8088);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert!(config.providers.contains_key("ollama"));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_temperature = \"hot\"").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("OPENAI_API_KEY", "sk-openai"),
                ("PROMPTSEQ_MODEL", "gpt-4"),
                ("PORT", "8080"),
                ("FRONTEND_URL", "https://prompts.example"),
            ]))
            .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-openai"));
        assert_eq!(config.default_model, "gpt-4");
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.allowed_origin, "https://prompts.example");
    }

    #[test]
    fn env_overrides_are_validated() {
        let path = Path::new("/nonexistent/config.toml");

        let err = AppConfig::load_with(path, env(&[("PROMPTSEQ_MODEL", "")])).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref m) if m.contains("default_model")));

        let config = AppConfig::load_with(path, env(&[("PROMPTSEQ_MODEL", "gpt-4")])).unwrap();
        assert_eq!(config.default_model, "gpt-4");
    }

    #[test]
    fn promptseq_key_wins_over_openai_key() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("OPENAI_API_KEY", "sk-openai"),
                ("PROMPTSEQ_API_KEY", "sk-promptseq"),
            ]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-promptseq"));
    }

    #[test]
    fn bad_port_env_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn prompt_defaults_follow_config() {
        let config = AppConfig {
            default_model: "gpt-4".into(),
            default_temperature: 0.0,
            ..AppConfig::default()
        };
        let defaults = config.prompt_defaults();
        assert_eq!(defaults.model, "gpt-4");
        assert_eq!(defaults.temperature, 0.0);
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-3.5-turbo"));
        assert!(toml_str.contains("3000"));
    }
}
