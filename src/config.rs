//! Configuration management
//!
//! Manages the LLM provider settings, the HTTP server bind address, and the
//! scoring RNG seed.

use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::llm::client::{DEFAULT_MODEL, GROQ_BASE_URL};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat-completions provider settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// Web server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Improvement scoring settings
    #[serde(default)]
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model used for both the recommendation and the report call
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Optional request timeout; unset means the HTTP client default
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    GROQ_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Sessions untouched for this long are dropped with their history
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

fn default_session_idle_secs() -> u64 {
    24 * 60 * 60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Fixed RNG seed for reproducible improvement draws
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load configuration from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save configuration to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "dropout-tracker", "dropout-tracker")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Show current configuration
pub fn show_config(config: &Config) {
    println!("LLM provider:");
    println!("  base_url:        {}", config.llm.base_url);
    println!("  model:           {}", config.llm.model);
    println!("  api_key_env:     {} ({})", config.llm.api_key_env,
        if std::env::var(&config.llm.api_key_env).is_ok() { "set" } else { "not set" });
    println!("  timeout:         {}", config.llm.request_timeout_secs
        .map(|s| format!("{}s", s))
        .unwrap_or_else(|| "client default".to_string()));
    println!("Server:");
    println!("  bind:            {}:{}", config.server.host, config.server.port);
    println!("  session idle:    {}s", config.server.session_idle_secs);
    println!("Scoring:");
    println!("  seed:            {}", config.scoring.seed
        .map(|s| s.to_string())
        .unwrap_or_else(|| "random".to_string()));
}
