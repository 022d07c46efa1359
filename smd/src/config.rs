//! sectormaild configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::BackendError;

/// Main sectormaild configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mailbox file and polling configuration
    pub mailbox: MailboxConfig,

    /// Response backend configuration
    pub backend: BackendConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.mailbox.poll_interval_ms == 0 {
            return Err(eyre::eyre!("poll-interval-ms must be greater than zero"));
        }
        if self.backend.provider == "openai" {
            self.backend
                .get_api_key()
                .context("Backend API key not found. Check api-key-env in your config.")?;
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .sectormail.yml
        let local_config = PathBuf::from(".sectormail.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/sectormail/sectormail.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sectormail").join("sectormail.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Mailbox file and polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Path to the shared mailbox file
    pub path: PathBuf,

    /// Polling interval in milliseconds
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Pause after a failed iteration in milliseconds
    #[serde(rename = "error-backoff-ms")]
    pub error_backoff_ms: u64,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("mailbox.img"),
            poll_interval_ms: 100,
            error_backoff_ms: 1000,
        }
    }
}

impl MailboxConfig {
    /// Get the poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Get the error backoff as a Duration
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

/// Response backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Provider name ("canned" or "openai")
    pub provider: String,

    /// Model identifier (openai provider)
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// System prompt sent with every request
    #[serde(rename = "system-prompt")]
    pub system_prompt: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: "canned".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 256,
            timeout_ms: 30_000,
            system_prompt: "You are a helpful assistant reached through a tiny shared-file mailbox. \
                            Replies must be short: they are truncated at 511 bytes of UTF-8."
                .to_string(),
        }
    }
}

impl BackendConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String, BackendError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| BackendError::MissingApiKey(self.api_key_env.clone()))
    }
}
