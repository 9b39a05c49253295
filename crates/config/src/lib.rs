//! Configuration loading, validation, and management for parley.
//!
//! Loads configuration from `~/.parley/config.toml` with environment
//! variable overrides. Validates all settings at startup so a bad chunking
//! or budget setting fails the process before the first request.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.parley/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion service settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Chunking, retrieval, and context budget settings
    #[serde(default)]
    pub context: ContextConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name: "groq", "openai", "ollama", or "custom"
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override (required for "custom")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens the model may generate per reply
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// HTTP timeout for completion calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "groq".into()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_output_tokens() -> u32 {
    1024
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Message-count cap applied before token truncation
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,

    /// Token budget for the message list sent to the model
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Words per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Words shared by consecutive chunks; must be < chunk_size
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks retrieved per grounded reply
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Model name used to resolve the tokenizer. Defaults to `llm.model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_model: Option<String>,
}

fn default_max_history_messages() -> usize {
    12
}
fn default_max_tokens() -> usize {
    7000
}
fn default_chunk_size() -> usize {
    600
}
fn default_chunk_overlap() -> usize {
    100
}
fn default_top_k() -> usize {
    3
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_history_messages: default_max_history_messages(),
            max_tokens: default_max_tokens(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            encoding_model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-client request limit within a one-minute window
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: usize,

    /// Largest accepted document upload
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// CORS origins. Empty = any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}
fn default_max_requests_per_minute() -> usize {
    60
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_requests_per_minute: default_max_requests_per_minute(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_origins: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.parley/config.toml).
    ///
    /// Environment variables override file values:
    /// - `PARLEY_API_KEY`, `GROQ_API_KEY`, `OPENAI_API_KEY` (first found, if no key in file)
    /// - `PARLEY_PROVIDER`, `PARLEY_MODEL`, `PARLEY_PORT`
    /// - `MAX_CONVERSATION_HISTORY`, `MAX_TOKENS`, `CHUNK_SIZE`, `CHUNK_OVERLAP`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_dir().join("config.toml"))
    }

    /// Load configuration from a specific file path, with the same
    /// environment overrides as [`AppConfig::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::load_from_with_env(path, |key| std::env::var(key).ok())
    }

    /// Read `path`, apply overrides from `lookup`, then validate the result.
    pub fn load_from_with_env<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::read_from(path)?;
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn read_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.llm.api_key.is_none() {
            self.llm.api_key = lookup("PARLEY_API_KEY")
                .or_else(|| lookup("GROQ_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("PARLEY_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("PARLEY_MODEL") {
            self.llm.model = model;
        }
        if let Some(port) = lookup("PARLEY_PORT") {
            self.gateway.port = parse_env("PARLEY_PORT", &port)?;
        }
        if let Some(v) = lookup("MAX_CONVERSATION_HISTORY") {
            self.context.max_history_messages = parse_env("MAX_CONVERSATION_HISTORY", &v)?;
        }
        if let Some(v) = lookup("MAX_TOKENS") {
            self.context.max_tokens = parse_env("MAX_TOKENS", &v)?;
        }
        if let Some(v) = lookup("CHUNK_SIZE") {
            self.context.chunk_size = parse_env("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = lookup("CHUNK_OVERLAP") {
            self.context.chunk_overlap = parse_env("CHUNK_OVERLAP", &v)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".parley")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let ctx = &self.context;
        if ctx.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "context.chunk_size must be > 0".into(),
            ));
        }
        if ctx.chunk_overlap >= ctx.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "context.chunk_overlap ({}) must be smaller than context.chunk_size ({})",
                ctx.chunk_overlap, ctx.chunk_size
            )));
        }
        if ctx.max_history_messages == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_history_messages must be > 0".into(),
            ));
        }
        if ctx.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_tokens must be > 0".into(),
            ));
        }
        if ctx.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "context.top_k must be > 0".into(),
            ));
        }

        if self.gateway.max_requests_per_minute == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.max_requests_per_minute must be > 0".into(),
            ));
        }

        if self.llm.provider == "custom" && self.llm.api_url.is_none() {
            return Err(ConfigError::ValidationError(
                "llm.api_url is required when llm.provider = \"custom\"".into(),
            ));
        }

        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "logging.format must be \"text\" or \"json\", got {other:?}"
                )));
            }
        }

        Ok(())
    }

    /// Model used to resolve the tokenizer.
    pub fn encoding_model(&self) -> &str {
        self.context
            .encoding_model
            .as_deref()
            .unwrap_or(&self.llm.model)
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.llm.api_key.is_some()
    }

}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} has invalid value {value:?}")))
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

impl From<ConfigError> for parley_core::Error {
    fn from(err: ConfigError) -> Self {
        parley_core::Error::Config {
            message: err.to_string(),
        }
    }
}
