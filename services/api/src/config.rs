//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    /// Concrete model ids for the three model tiers the budget allocator
    /// can pick.
    pub fast_model: String,
    pub balanced_model: String,
    pub powerful_model: String,
    /// Wall-clock ceiling for a single model call.
    pub model_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load API Keys (as optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();

        // --- Load Adapter-specific Settings ---
        let fast_model =
            std::env::var("FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let balanced_model =
            std::env::var("BALANCED_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let powerful_model =
            std::env::var("POWERFUL_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let timeout_str =
            std::env::var("MODEL_TIMEOUT_SECS").unwrap_or_else(|_| "90".to_string());
        let timeout_secs = timeout_str.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "MODEL_TIMEOUT_SECS".to_string(),
                format!("'{}' is not a number of seconds", timeout_str),
            )
        })?;

        let upload_str =
            std::env::var("MAX_UPLOAD_BYTES").unwrap_or_else(|_| (60 * 1024 * 1024).to_string());
        let max_upload_bytes = upload_str.parse::<usize>().map_err(|_| {
            ConfigError::InvalidValue(
                "MAX_UPLOAD_BYTES".to_string(),
                format!("'{}' is not a byte count", upload_str),
            )
        })?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            fast_model,
            balanced_model,
            powerful_model,
            model_timeout: Duration::from_secs(timeout_secs),
            max_upload_bytes,
        })
    }
}
