pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use stackform_cloud::OrderingStrategy;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.digitalocean.com/v2";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const CONFIG_PATH_ENV: &str = "STACKFORM_CONFIG_PATH";
pub const TOKEN_ENV: &str = "DIGITALOCEAN_TOKEN";
pub const API_URL_ENV: &str = "STACKFORM_API_URL";
pub const ORDERING_ENV: &str = "STACKFORM_ORDERING";
pub const TIMEOUT_ENV: &str = "STACKFORM_TIMEOUT_SECS";

const CANDIDATES: [&str; 2] = ["stackform.yaml", ".stackform.yaml"];

/// Runtime settings for the CLI
///
/// Resolution order: environment variables, then the config file, then
/// built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub api_token: Option<String>,
    pub api_base_url: String,
    pub ordering: OrderingStrategy,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_token: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            ordering: OrderingStrategy::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Load settings from the discovered config file and the environment
    pub fn load() -> Result<Self> {
        let mut settings = match find_config_file()? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        settings.apply_env()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(token) = env_value(TOKEN_ENV) {
            self.api_token = Some(token);
        }
        if let Some(url) = env_value(API_URL_ENV) {
            self.api_base_url = url;
        }
        if let Some(ordering) = env_value(ORDERING_ENV) {
            self.ordering = ordering
                .parse::<OrderingStrategy>()
                .map_err(|message| ConfigError::InvalidValue {
                    key: ORDERING_ENV.to_string(),
                    message,
                })?;
        }
        if let Some(timeout) = env_value(TIMEOUT_ENV) {
            self.request_timeout_secs =
                timeout
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                        key: TIMEOUT_ENV.to_string(),
                        message: e.to_string(),
                    })?;
        }
        Ok(())
    }

    pub fn require_token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Stackform's global config directory (~/.config/stackform)
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("stackform"))
}

/// Locate the settings file
///
/// Search order:
/// 1. `STACKFORM_CONFIG_PATH` (must exist when set)
/// 2. current directory: stackform.yaml, .stackform.yaml
/// 3. ~/.config/stackform/config.yaml
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Some(config_path) = env_value(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::ConfigFileNotFound(path));
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("config.yaml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}
