//! Configuration loading and endpoint resolution
//!
//! Each setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or malformed config file is never fatal: it is logged and the
//! next tier is used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable overriding the classifier service base URL
pub const ENV_API_URL: &str = "INFRNCE_API_URL";
/// Environment variable overriding the per-request timeout in milliseconds
pub const ENV_TIMEOUT_MS: &str = "INFRNCE_TIMEOUT_MS";
/// Environment variable overriding the config file location
pub const ENV_CONFIG_PATH: &str = "INFRNCE_CONFIG";

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// On-disk configuration (`config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Classifier service base URL, e.g. `http://127.0.0.1:8000`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

/// Fully resolved client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Resolve configuration from CLI overrides, environment, TOML and defaults
    pub fn resolve(overrides: &ConfigOverrides) -> Self {
        let toml_config = config_file_path()
            .and_then(|path| match load_toml_config(&path) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config file");
                    Some(config)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring config file");
                    None
                }
            })
            .unwrap_or_default();

        Self::resolve_with(overrides, &toml_config)
    }

    /// Resolve against an already-loaded TOML config
    pub fn resolve_with(overrides: &ConfigOverrides, toml_config: &TomlConfig) -> Self {
        let api_url = overrides
            .api_url
            .clone()
            .filter(|url| is_valid_value(url))
            .or_else(|| std::env::var(ENV_API_URL).ok().filter(|url| is_valid_value(url)))
            .or_else(|| toml_config.api_url.clone().filter(|url| is_valid_value(url)))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_ms = overrides
            .request_timeout_ms
            .or_else(env_timeout_ms)
            .or(toml_config.request_timeout_ms)
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        Self {
            api_url: api_url.trim().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_millis(timeout_ms),
            log_level: toml_config.logging.level.clone(),
        }
    }
}

fn env_timeout_ms() -> Option<u64> {
    let raw = std::env::var(ENV_TIMEOUT_MS).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(ms),
        Err(_) => {
            warn!("{} is not a number of milliseconds: {:?}", ENV_TIMEOUT_MS, raw);
            None
        }
    }
}

/// Non-empty, non-whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Location of the config file, if one exists
///
/// `INFRNCE_CONFIG` wins over `<config_dir>/infrnce/config.toml`.
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }

    let path = dirs::config_dir()?.join("infrnce").join("config.toml");
    path.exists().then_some(path)
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Write a TOML config file, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}
