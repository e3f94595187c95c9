//! Configuration for the Freshdesk bridge
//!
//! Values come from an optional `freshdesk-mcp.toml` file and from
//! `FRESHDESK_*` environment variables, the latter taking precedence.
//! The API key and domain are required and validated before the server
//! starts; a bad value is a fatal configuration error.

use crate::error::{FreshdeskError, Result};
use config::{Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// Default config file name (extension resolved by the `config` crate)
pub const CONFIG_FILE: &str = "freshdesk-mcp";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "FRESHDESK";

/// Bridge configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// API key, sent as the basic-auth user with password `X`
    #[serde(default = "default_api_key")]
    pub api_key: SecretString,

    /// Helpdesk domain, e.g. `acme.freshdesk.com` (no scheme)
    #[serde(default)]
    pub domain: String,

    /// Overrides `https://{domain}/api/v2`; used for proxies and tests
    #[serde(default)]
    pub base_url: Option<String>,

    /// Overall request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Total attempts per request, first try included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Initial backoff in milliseconds, doubled after each backoff sleep
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound applied to server-provided `Retry-After` values
    #[serde(default = "default_max_retry_after_secs")]
    pub max_retry_after_secs: u64,
}

fn default_api_key() -> SecretString { SecretString::new(String::new()) }
fn default_timeout_ms() -> u64 { 30_000 }
fn default_connect_timeout_ms() -> u64 { 10_000 }
fn default_max_attempts() -> usize { 3 }
fn default_retry_backoff_ms() -> u64 { 1_000 }
fn default_max_retry_after_secs() -> u64 { 60 }

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            domain: String::new(),
            base_url: None,
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_retry_after_secs: default_max_retry_after_secs(),
        }
    }
}

impl Config {
    /// Load from `freshdesk-mcp.toml` (optional) and `FRESHDESK_*` env vars, then validate
    pub fn load() -> Result<Self> {
        Self::load_from(Some(CONFIG_FILE), ENV_PREFIX)
    }

    /// Load from an optional file and an environment prefix, then validate
    pub fn load_from(file: Option<&str>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(name) = file {
            builder = builder.add_source(File::with_name(name).required(false));
        }
        builder = builder.add_source(Environment::with_prefix(env_prefix).try_parsing(true));

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| FreshdeskError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document, then validate
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| FreshdeskError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check required values and bounds
    pub fn validate(&self) -> Result<()> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(FreshdeskError::Config(
                "FRESHDESK_API_KEY is required".to_string(),
            ));
        }

        let domain = self.domain.trim();
        if domain.is_empty() {
            return Err(FreshdeskError::Config(
                "FRESHDESK_DOMAIN is required".to_string(),
            ));
        }
        if domain.contains("://") || domain.contains('/') {
            return Err(FreshdeskError::Config(format!(
                "FRESHDESK_DOMAIN must be a bare host name without scheme or path, got '{domain}'"
            )));
        }
        if !domain.contains('.') {
            return Err(FreshdeskError::Config(format!(
                "FRESHDESK_DOMAIN must be a fully qualified host name, got '{domain}'"
            )));
        }

        if self.max_attempts == 0 {
            return Err(FreshdeskError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Base URL of the v2 REST API
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}/api/v2", self.domain.trim()),
        }
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get retry backoff as Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Get the Retry-After cap as Duration
    pub fn max_retry_after(&self) -> Duration {
        Duration::from_secs(self.max_retry_after_secs)
    }
}
