use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;

/// Environment variable overriding `backend.url`.
pub const URL_ENV_VAR: &str = "RECIPE_CATALOG_URL";
/// Environment variable overriding `backend.api_key`.
pub const KEY_ENV_VAR: &str = "RECIPE_CATALOG_KEY";
/// Environment variable overriding `logging.file`.
pub const LOG_ENV_VAR: &str = "RECIPE_CATALOG_LOG";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/recipe-catalog/config.toml` on Unix/macOS,
    /// or equivalent on other platforms via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("recipe-catalog").join("config.toml")
    }

    /// Loads configuration from the default config file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`.
    ///
    /// - If the file doesn't exist, starts from `Config::default()`.
    /// - Environment overrides are applied before validation.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            })?;

            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Replace settings with `RECIPE_CATALOG_URL`, `RECIPE_CATALOG_KEY` and
    /// `RECIPE_CATALOG_LOG` when those are set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env(URL_ENV_VAR) {
            self.backend.url = url;
        }
        if let Some(key) = non_empty_env(KEY_ENV_VAR) {
            self.backend.api_key = Some(key);
        }
        if let Some(file) = non_empty_env(LOG_ENV_VAR) {
            self.logging.file = Some(file);
        }
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - The backend URL is http(s)
    /// - An API key is present
    /// - Concurrency and retry limits are at least 1
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                message: format!("Backend url '{}' must start with http:// or https://", url),
            });
        }

        if !self.backend.is_configured() {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Backend api_key is not set (set it in the config file or {})",
                    KEY_ENV_VAR
                ),
            });
        }

        if self.catalog.image_fetch_concurrency == 0 {
            return Err(ConfigError::ValidationError {
                message: "image_fetch_concurrency must be at least 1".to_string(),
            });
        }

        if self.catalog.max_create_retries == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_create_retries must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
