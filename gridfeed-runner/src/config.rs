//! Run settings: output location, HTTP timeout, credentials and endpoints.
//!
//! Settings are resolved in three layers, later layers winning:
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. Environment variables (`.env` is loaded by the CLI before this runs)
//!
//! Components receive the resolved [`Settings`] at construction; nothing below
//! this module reads the process environment.

use gridfeed_core::source::{elexon, ibex, terna, TernaCredentials};
use gridfeed_core::RetryPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_OUTPUT_DIR: &str = "BASE_OUTPUT_FOLDER";
pub const ENV_HTTP_TIMEOUT: &str = "GRIDFEED_HTTP_TIMEOUT_SECS";
pub const ENV_TERNA_CLIENT_ID: &str = "TERNA_RENEWABLE_CLIENT_ID";
pub const ENV_TERNA_CLIENT_SECRET: &str = "TERNA_RENEWABLE_CLIENT_SECRET";

// Misspelled names found in older deployment `.env` files.
const LEGACY_TERNA_CLIENT_ID: &str = "TERMA_RENEWABLE_CLIENT_ID";
const LEGACY_TERNA_CLIENT_SECRET: &str = "TERMA_RENEWABLE_CLIENT_SECRET";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: String, value: String },
}

/// Resolved settings for a run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory CSV files are written to; created if absent.
    pub output_dir: PathBuf,

    /// Per-request timeout for every HTTP call.
    pub http_timeout_secs: u64,

    /// Terna OAuth2 client credentials. Required only for the Terna source.
    pub terna: Option<TernaSettings>,

    pub endpoints: Endpoints,
}

#[derive(Clone, PartialEq, Deserialize)]
pub struct TernaSettings {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl std::fmt::Debug for TernaSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TernaSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .finish()
    }
}

fn default_retry_attempts() -> u32 {
    terna::default_retry_policy().attempts
}

fn default_retry_delay_secs() -> u64 {
    terna::default_retry_policy().delay.as_secs()
}

impl TernaSettings {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }

    pub fn credentials(&self) -> TernaCredentials {
        TernaCredentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_secs(self.retry_delay_secs))
    }
}

/// Source endpoints. Overridable for staging mirrors and local fixtures.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub elexon: String,
    pub terna_data: String,
    pub terna_token: String,
    pub ibex: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            elexon: elexon::BASE_URL.to_string(),
            terna_data: terna::BASE_URL.to_string(),
            terna_token: terna::ACCESS_TOKEN_URL.to_string(),
            ibex: ibex::BASE_URL.to_string(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("curvefiles"),
            http_timeout_secs: 30,
            terna: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a TOML string. Missing keys keep their defaults.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        settings.apply_env(|var| std::env::var(var).ok())?;
        Ok(settings)
    }

    /// Optional TOML file overlaid with the process environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|var| std::env::var(var).ok())?;
        Ok(settings)
    }

    /// Override fields from environment-style variables supplied by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup(ENV_HTTP_TIMEOUT) {
            self.http_timeout_secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    var: ENV_HTTP_TIMEOUT.to_string(),
                    value: raw.clone(),
                })?;
        }

        let client_id = lookup(ENV_TERNA_CLIENT_ID).or_else(|| lookup(LEGACY_TERNA_CLIENT_ID));
        let client_secret =
            lookup(ENV_TERNA_CLIENT_SECRET).or_else(|| lookup(LEGACY_TERNA_CLIENT_SECRET));

        match (client_id, client_secret) {
            (Some(id), Some(secret)) => match self.terna.as_mut() {
                Some(terna) => {
                    terna.client_id = id;
                    terna.client_secret = secret;
                }
                None => self.terna = Some(TernaSettings::new(id, secret)),
            },
            (None, None) => {}
            _ => tracing::warn!(
                "only one of {ENV_TERNA_CLIENT_ID} / {ENV_TERNA_CLIENT_SECRET} is set; ignoring both"
            ),
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
