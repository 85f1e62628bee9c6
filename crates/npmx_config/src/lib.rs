use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub mod secret;

/// Environment variable overriding the configured base address.
pub const BASE_URL_ENV: &str = "NPMX_BASE_URL";

/// Upstream address assumed when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:81/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid base URL '{url}': {cause}")]
    InvalidBaseUrl {
        url: String,
        cause: url::ParseError,
    },
}

/// On-disk settings, by default at `~/.npmx/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base address of the upstream admin API, including its path prefix.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Login identity, usually the admin email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,

    /// Secret reference, resolved through [`secret::resolve`] right before
    /// authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Fallback token lifetime in seconds, for upstreams that do not date
    /// their tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_ttl_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            identity: None,
            secret: None,
            token_ttl_secs: None,
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

impl Config {
    /// Default location of the config file, `~/.npmx/config.toml`.
    pub fn default_path() -> Utf8PathBuf {
        let home = dirs::home_dir()
            .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
            .unwrap_or_else(|| Utf8PathBuf::from("."));
        home.join(".npmx").join("config.toml")
    }

    /// Loads the config at `path`, falling back to defaults when the file
    /// does not exist, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file exists but cannot be read or
    /// parsed, or when an override is not a valid URL.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            debug!("No config file at {path}, using defaults");
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be written.
    pub fn save(&self, path: &Utf8Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn token_ttl(&self) -> Option<Duration> {
        self.token_ttl_secs.map(Duration::from_secs)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            self.base_url =
                Url::parse(&url).map_err(|cause| ConfigError::InvalidBaseUrl { url, cause })?;
        }
        Ok(())
    }
}

/// Where the saved session lives, next to the config file.
pub fn session_path(config_path: &Utf8Path) -> Utf8PathBuf {
    config_path.with_file_name("session.json")
}
