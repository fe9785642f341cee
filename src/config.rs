use std::env;

use thiserror::Error;
use tracing::Level;

/// Prefix of `AWS_EXECUTION_ENV` on every managed Lambda runtime.
pub const LAMBDA_EXECUTION_ENV_PREFIX: &str = "AWS_Lambda_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("AWS_LAMBDA_LOG_LEVEL: unsupported log level {0:?}")]
    InvalidLogLevel(String),
}

/// Logging and runtime settings derived from the Lambda environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub log_level: Level,
    pub is_lambda: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::DEBUG,
            is_lambda: false,
        }
    }
}

impl LoggingConfig {
    /// # Errors
    ///
    /// Returns an error if `AWS_LAMBDA_LOG_LEVEL` holds an unknown level.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `AWS_LAMBDA_LOG_LEVEL` holds an unknown level.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = match lookup("AWS_LAMBDA_LOG_LEVEL") {
            Some(raw) if !raw.trim().is_empty() => parse_log_level(&raw)?,
            _ => Level::DEBUG,
        };

        Ok(Self {
            log_level,
            is_lambda: lookup("AWS_EXECUTION_ENV")
                .is_some_and(|v| v.starts_with(LAMBDA_EXECUTION_ENV_PREFIX)),
        })
    }
}

/// Parses the Lambda advanced-logging level names.
///
/// `FATAL` has no `tracing` counterpart and maps to `ERROR`.
///
/// # Errors
///
/// Returns an error for names outside the Lambda level set.
pub fn parse_log_level(raw: &str) -> Result<Level, ConfigError> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" | "FATAL" => Ok(Level::ERROR),
        _ => Err(ConfigError::InvalidLogLevel(raw.to_string())),
    }
}
