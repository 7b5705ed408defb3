//! Server configuration from environment variables
//!
//! | variable | required | default |
//! |---|---|---|
//! | `MINDGRID_DATABASE_PATH` | yes | |
//! | `MINDGRID_PUBLIC_URL` | yes | |
//! | `MINDGRID_STORAGE_DIR` | no | `~/.mindgrid/storage` |
//! | `MINDGRID_PORT` | no | `3000` |
//! | `MINDGRID_AI_BASE_URL` | no | `https://api.openai.com/v1` |
//! | `MINDGRID_AI_CHAT_MODEL` | no | `gpt-4o-mini` |
//! | `MINDGRID_AI_TIMEOUT_SECS` | no | `60` |
//! | `CORS_ALLOW_ORIGIN` | no | localhost dev origins |

use std::path::PathBuf;
use std::time::Duration;

use mindgrid_core::ai::options::DEFAULT_CHAT_MODEL;
use mindgrid_core::ai::provider::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    /// Base URL clients use to reach this server (durable file URLs start here)
    pub public_url: String,
    pub storage_dir: PathBuf,
    pub port: u16,
    pub ai_base_url: String,
    pub ai_chat_model: String,
    pub ai_timeout: Duration,
    /// Explicit CORS origin; localhost dev origins when unset
    pub cors_allow_origin: Option<String>,
}

fn default_storage_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mindgrid")
        .join("storage")
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any name → value lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let port = match get("MINDGRID_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "MINDGRID_PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match get("MINDGRID_AI_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "MINDGRID_AI_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            database_path: PathBuf::from(require("MINDGRID_DATABASE_PATH")?),
            public_url: require("MINDGRID_PUBLIC_URL")?
                .trim_end_matches('/')
                .to_string(),
            storage_dir: get("MINDGRID_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_storage_dir),
            port,
            ai_base_url: get("MINDGRID_AI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ai_chat_model: get("MINDGRID_AI_CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            ai_timeout: Duration::from_secs(timeout_secs),
            cors_allow_origin: get("CORS_ALLOW_ORIGIN"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.public_url.starts_with("http://") || self.public_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: "MINDGRID_PUBLIC_URL",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.ai_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "MINDGRID_AI_TIMEOUT_SECS",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}
