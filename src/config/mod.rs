//! Configuration Module
//!
//! TOML-based configuration for the session engine:
//! - Logging level
//! - Per-client pending message bound and overflow strategy
//! - Expired session sweep cadence
//! - Environment variable overrides (VIBEMQ_SESSION__* prefix)

use std::path::Path;
use std::time::Duration;

use config::{Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;

#[cfg(test)]
mod tests;

/// Substitute environment variables in a string.
/// Supports `${VAR}` and `${VAR:-default}` syntax.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}")
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    Ok(re
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var_name).unwrap_or_else(|_| default.to_string())
        })
        .to_string())
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
    /// Config crate error
    Config(config::ConfigError),
    /// Validation error
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Config(e) => write!(f, "Config error: {}", e),
            ConfigError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Config(e)
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,
    /// Session configuration
    pub session: SessionConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// What to do when a client's pending data queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowStrategy {
    /// Evict the oldest queued publish to make room
    #[default]
    DropOldestQueuedMessage,
    /// Reject the incoming publish
    DropNewMessage,
}

/// Session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum queued publishes per client before the overflow strategy applies
    #[serde(default = "default_max_pending_messages")]
    pub max_pending_messages_per_client: usize,
    /// Overflow strategy
    #[serde(default)]
    pub pending_messages_overflow_strategy: OverflowStrategy,
    /// Session expiry check interval in seconds
    #[serde(default = "default_expiry_check_interval")]
    pub expiry_check_interval: u64,
}

fn default_max_pending_messages() -> usize {
    250
}
fn default_expiry_check_interval() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_pending_messages_per_client: default_max_pending_messages(),
            pending_messages_overflow_strategy: OverflowStrategy::default(),
            expiry_check_interval: default_expiry_check_interval(),
        }
    }
}

impl SessionConfig {
    /// Get expiry check interval as Duration
    pub fn expiry_check_interval_duration(&self) -> Duration {
        Duration::from_secs(self.expiry_check_interval)
    }
}

impl Config {
    /// Load configuration from a TOML file with environment variable overrides.
    ///
    /// Supports two forms of environment variable usage:
    /// 1. In-file substitution: `${VAR}` or `${VAR:-default}` syntax in the TOML file
    /// 2. Override via env vars: `VIBEMQ_SESSION__` prefix with double underscores for nesting:
    ///    - `VIBEMQ_SESSION__SESSION__MAX_PENDING_MESSAGES_PER_CLIENT=500`
    ///    - `VIBEMQ_SESSION__LOG__LEVEL=debug`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("log.level", "info")?
            .set_default("session.max_pending_messages_per_client", 250)?
            .set_default(
                "session.pending_messages_overflow_strategy",
                "drop_oldest_queued_message",
            )?
            .set_default("session.expiry_check_interval", 60)?;

        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let substituted = substitute_env_vars(&content)?;
                builder = builder.add_source(File::from_str(&substituted, FileFormat::Toml));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File doesn't exist, use defaults
            }
            Err(e) => return Err(ConfigError::Io(e)),
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix("VIBEMQ_SESSION")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides only (no file).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Path::new(""))
    }

    /// Parse configuration from a string (for testing, no env var support)
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.max_pending_messages_per_client == 0 {
            return Err(ConfigError::Validation(
                "max_pending_messages_per_client must be greater than 0".to_string(),
            ));
        }

        if self.session.expiry_check_interval == 0 {
            return Err(ConfigError::Validation(
                "expiry_check_interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
