//! Configuration file support
//!
//! Loads config from ~/.twochat/config.toml. Every field is optional; the
//! environment and CLI flags take precedence over anything set here.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::ConfigError;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// OpenRouter API key
    pub api_key: Option<String>,

    /// Chat completions base URL
    pub base_url: Option<String>,

    pub model: Option<String>,
    pub max_tokens: Option<u32>,

    /// Provider request timeout in seconds
    pub provider_timeout: Option<u64>,

    pub database_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cors_origin: Option<String>,
    pub log_level: Option<String>,

    /// Inline system directive
    pub system_prompt: Option<String>,

    /// Path to a file holding the system directive
    pub system_prompt_file: Option<String>,

    pub history_max_turns: Option<usize>,
    pub history_max_chars: Option<usize>,
}

impl FileConfig {
    /// Load the default file if present
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load an explicit file; it must exist and parse
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Get the config file path
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".twochat")
        .join("config.toml")
}
