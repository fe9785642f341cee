//! Turbo Lambda - building blocks for AWS Lambda functions.
//!
//! The crate bundles what most functions end up re-implementing:
//! 1. Typed event schemas for API Gateway, SQS and `EventBridge`
//! 2. Problem-details errors that turn into API Gateway responses
//! 3. JSON structured logging with a per-invocation bound context
//! 4. Composable handler wrappers for validation, logging and tracing
//!
//! # Example
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use turbo_lambda::errors::GeneralError;
//! use turbo_lambda::handlers::{gateway_handler, request_fn, run};
//! use turbo_lambda::schemas::ApiGatewayResponse;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct GetItem {
//!     #[serde(rename = "pathParameters")]
//!     path_parameters: Option<serde_json::Value>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), turbo_lambda::Error> {
//!     turbo_lambda::setup_logging();
//!
//!     run(gateway_handler(request_fn(|request: GetItem| async move {
//!         let Some(params) = request.path_parameters else {
//!             return Err(GeneralError::new(http::StatusCode::NOT_FOUND, "Item not found").into());
//!         };
//!         Ok::<_, turbo_lambda::Error>(ApiGatewayResponse::json(&params)?)
//!     })))
//!     .await
//! }
//! ```

// Module declarations
pub mod cached;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod log;
pub mod schemas;
pub mod telemetry;

/// Boxed error used at every handler boundary.
pub type Error = lambda_runtime::Error;

/// Configure structured JSON logging on stdout.
///
/// Inside Lambda the level comes from `AWS_LAMBDA_LOG_LEVEL`; an unusable
/// value falls back to DEBUG and is reported once the logger is up. Calling
/// this again after a subscriber is installed is a no-op.
///
/// # Example
///
/// ```
/// turbo_lambda::setup_logging();
/// ```
pub fn setup_logging() {
    let (config, config_error) = match config::LoggingConfig::from_env() {
        Ok(config) => (config, None),
        Err(e) => (config::LoggingConfig::default(), Some(e)),
    };

    let installed = if config.is_lambda {
        log::config_lambda_logger(&config)
    } else {
        log::config_default_logger()
    };
    if installed.is_err() {
        return;
    }

    if let Some(e) = config_error {
        tracing::warn!(target: log::LOGGER_TARGET, error = %e, "invalid_logging_config");
    }
}
