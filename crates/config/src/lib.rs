//! Configuration loading, validation, and management for Draftsmith.
//!
//! Loads configuration from `~/.draftsmith/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use draftsmith_core::message::GenerationParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.draftsmith/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key. Local endpoints typically accept anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name. Empty means "not configured yet" — generation fails
    /// fast until it is set.
    #[serde(default)]
    pub model: String,

    /// Total context window size in tokens
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// Sampling parameters for generation requests
    #[serde(default)]
    pub generation: GenerationParams,
}

fn default_base_url() -> String {
    "http://localhost:1234/v1".into()
}
fn default_max_context_tokens() -> usize {
    4096
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
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("max_context_tokens", &self.max_context_tokens)
            .field("generation", &self.generation)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.draftsmith/config.toml).
    ///
    /// Environment variable overrides (highest priority):
    /// - `DRAFTSMITH_BASE_URL`
    /// - `DRAFTSMITH_API_KEY`, falling back to `OPENAI_API_KEY`
    /// - `DRAFTSMITH_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(base_url) = std::env::var("DRAFTSMITH_BASE_URL") {
            config.base_url = base_url;
        }

        if config.api_key.is_none() {
            config.api_key = std::env::var("DRAFTSMITH_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("DRAFTSMITH_MODEL") {
            config.model = model;
        }

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

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".draftsmith")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.temperature < 0.0 || self.generation.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.generation.top_p <= 0.0 || self.generation.top_p > 1.0 {
            return Err(ConfigError::ValidationError(
                "generation.top_p must be in (0.0, 1.0]".into(),
            ));
        }

        if self.generation.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_tokens must be > 0".into(),
            ));
        }

        if self.max_context_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_context_tokens must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Whether endpoint and model are both set — the precondition the
    /// controller checks before any network call.
    pub fn is_connection_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.model.is_empty()
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: String::new(),
            max_context_tokens: default_max_context_tokens(),
            generation: GenerationParams::default(),
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
