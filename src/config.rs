//! Configuration management for chatvault
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ChatVaultError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Main configuration structure for chatvault
///
/// This structure holds all configuration needed by the client,
/// including the completion API settings, chat behavior, and storage
/// location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Completion API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Chat behavior configuration
    #[serde(default)]
    pub chat: ChatConfig,

    /// Local state storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Completion API configuration
///
/// Specifies where the completion service lives and how responses are
/// requested from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Completion endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request responses as a stream of chunks instead of a single body
    #[serde(default = "default_stream")]
    pub stream: bool,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_endpoint() -> String {
    "http://localhost:8080/api/chat".to_string()
}

fn default_stream() -> bool {
    true
}

fn default_timeout() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            stream: default_stream(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatConfig {
    /// Create an empty session at startup when none are stored
    #[serde(default)]
    pub auto_create_session: bool,
}

/// Local state storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Path to the state database
    ///
    /// When unset, the platform data directory is used.
    #[serde(default)]
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            api: ApiConfig::default(),
            chat: ChatConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatVaultError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatVaultError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        // API overrides
        if let Ok(endpoint) = std::env::var("CHATVAULT_ENDPOINT") {
            self.api.endpoint = endpoint;
        }

        if let Ok(stream) = std::env::var("CHATVAULT_STREAM") {
            if let Ok(value) = stream.parse() {
                self.api.stream = value;
            } else {
                tracing::warn!("Invalid CHATVAULT_STREAM: {}", stream);
            }
        }

        if let Ok(timeout) = std::env::var("CHATVAULT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid CHATVAULT_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        // Chat overrides
        if let Ok(auto_create) = std::env::var("CHATVAULT_AUTO_CREATE") {
            if let Ok(value) = auto_create.parse() {
                self.chat.auto_create_session = value;
            } else {
                tracing::warn!("Invalid CHATVAULT_AUTO_CREATE: {}", auto_create);
            }
        }

        // Storage overrides
        if let Ok(path) = std::env::var("CHATVAULT_STATE_DB") {
            self.storage.path = Some(path);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let crate::cli::Commands::Chat { no_stream, .. } = &cli.command {
            if *no_stream {
                self.api.stream = false;
                tracing::debug!("CLI override: streaming disabled");
            }
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Returns
    ///
    /// Returns Ok if configuration is valid
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.api.endpoint.is_empty() {
            return Err(ChatVaultError::Config("api.endpoint cannot be empty".to_string()).into());
        }

        Url::parse(&self.api.endpoint)
            .map_err(|e| ChatVaultError::Config(format!("Invalid api.endpoint: {}", e)))?;

        if self.api.timeout_seconds == 0 {
            return Err(
                ChatVaultError::Config("api.timeout_seconds must be greater than 0".to_string())
                    .into(),
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
