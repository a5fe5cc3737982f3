// src/config/mod.rs
// Layered configuration: built-in defaults < config file < environment < CLI flags.
// Loaded once in main and passed down explicitly.

mod file;

pub use file::{FileConfig, default_config_path};

use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::chat::context_builder::{
    ContextConfig, DEFAULT_MAX_HISTORY_CHARS, DEFAULT_MAX_HISTORY_TURNS, DEFAULT_SYSTEM_PROMPT,
};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-lite";
pub const DEFAULT_MAX_TOKENS: u32 = 1234;
pub const DEFAULT_DATABASE_URL: &str = "sqlite:twochat.db?mode=rwc";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 39399;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("system prompt must not be empty")]
    EmptySystemPrompt,

    #[error("{0} must be greater than zero")]
    NonPositiveBudget(&'static str),

    #[error("OPENROUTER_API_KEY is not set")]
    MissingApiKey,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // ── Provider
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub provider_timeout: u64,

    // ── Database
    pub database_url: String,

    // ── Server
    pub host: String,
    pub port: u16,
    pub cors_origin: String,

    // ── Logging
    pub log_level: String,

    // ── Conversation context
    pub context: ContextConfig,
}

/// Parse `key` from `lookup`, falling back to `default` when missing or invalid.
/// Trailing `# comments` and surrounding whitespace are ignored.
fn env_var_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        // Missing is not an error, just use the default
        None => default,
    }
}

/// Optional string variable; empty values count as unset
fn env_opt<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Load from the process environment (after `.env`) layered over a config file.
    ///
    /// `config_path` overrides the default `~/.twochat/config.toml`; a missing
    /// default file is not an error, a missing explicit one is.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let file = match config_path {
            Some(path) => FileConfig::load_from(path)?,
            None => FileConfig::load_default()?,
        };

        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Merge a file config with environment values from `lookup`, then validate
    pub fn from_sources<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let system_prompt = match env_opt(&lookup, "TWOCHAT_SYSTEM_PROMPT_FILE")
            .or_else(|| file.system_prompt_file.clone())
        {
            Some(path) => read_prompt_file(Path::new(&path))?,
            None => env_opt(&lookup, "TWOCHAT_SYSTEM_PROMPT")
                .or(file.system_prompt)
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        };

        let context = ContextConfig {
            system_prompt,
            max_history_turns: env_var_or(
                &lookup,
                "TWOCHAT_HISTORY_MAX_TURNS",
                file.history_max_turns.unwrap_or(DEFAULT_MAX_HISTORY_TURNS),
            ),
            max_history_chars: env_var_or(
                &lookup,
                "TWOCHAT_HISTORY_MAX_CHARS",
                file.history_max_chars.unwrap_or(DEFAULT_MAX_HISTORY_CHARS),
            ),
        };

        let config = Self {
            api_key: env_opt(&lookup, "OPENROUTER_API_KEY").or(file.api_key),
            base_url: env_var_or(
                &lookup,
                "OPENROUTER_BASE_URL",
                file.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ),
            model: env_var_or(
                &lookup,
                "TWOCHAT_MODEL",
                file.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ),
            max_tokens: env_var_or(
                &lookup,
                "TWOCHAT_MAX_TOKENS",
                file.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            ),
            provider_timeout: env_var_or(
                &lookup,
                "TWOCHAT_PROVIDER_TIMEOUT",
                file.provider_timeout.unwrap_or(60),
            ),
            database_url: env_var_or(
                &lookup,
                "DATABASE_URL",
                file.database_url
                    .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            ),
            host: env_var_or(
                &lookup,
                "TWOCHAT_HOST",
                file.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            ),
            port: env_var_or(&lookup, "TWOCHAT_PORT", file.port.unwrap_or(DEFAULT_PORT)),
            cors_origin: env_var_or(
                &lookup,
                "TWOCHAT_CORS_ORIGIN",
                file.cors_origin.unwrap_or_else(|| "*".to_string()),
            ),
            log_level: env_var_or(
                &lookup,
                "TWOCHAT_LOG_LEVEL",
                file.log_level.unwrap_or_else(|| "info".to_string()),
            ),
            context,
        };

        config.context.validate()?;
        Ok(config)
    }

    /// API key, required before serving
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Full chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

fn read_prompt_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })
}
