//! Structured JSON logging for Lambda functions.
//!
//! Records are emitted through `tracing` under the [`LOGGER_TARGET`] target and
//! rendered one JSON object per line by [`JsonFormatter`]. Fields bound with
//! [`logger_bind`] are merged into every record emitted inside the bound scope,
//! which is how per-invocation data such as the request id reaches all logs.

mod call;
mod formatter;

use std::future::Future;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::Level;

use crate::Error;
use crate::config::LoggingConfig;

pub use call::{Arguments, CallLogger, DEFAULT_EXCLUDED_FIELDS, FunctionInfo, ResultExtractor, error_chain};
pub use formatter::{DEFAULT_IGNORED_KEYS, DEFAULT_TRANSLATOR, JsonFormatter};

pub const LOGGER_TARGET: &str = "turbo_lambda";

/// Event field carrying a JSON object merged into the top level of the record.
pub const EXTRA_FIELD: &str = "extra";

/// Event field carrying a rendered error.
pub const EXC_INFO_FIELD: &str = "exc_info";

pub type LogFields = Map<String, Value>;

tokio::task_local! {
    static LOGGING_CTX: LogFields;
}

/// Fields bound in the current scope, empty outside any [`logger_bind`].
#[must_use]
pub fn current_context() -> LogFields {
    LOGGING_CTX.try_with(Clone::clone).unwrap_or_default()
}

fn merged_context<I>(fields: I) -> LogFields
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut context = current_context();
    context.extend(fields);
    context
}

/// Runs `fut` with `fields` merged into the bound log context.
///
/// Inner bindings win over outer ones; the outer context is back in effect
/// once `fut` completes.
pub async fn logger_bind<I, F>(fields: I, fut: F) -> F::Output
where
    I: IntoIterator<Item = (String, Value)>,
    F: Future,
{
    LOGGING_CTX.scope(merged_context(fields), fut).await
}

/// Synchronous counterpart of [`logger_bind`].
pub fn logger_bind_sync<I, F, R>(fields: I, f: F) -> R
where
    I: IntoIterator<Item = (String, Value)>,
    F: FnOnce() -> R,
{
    LOGGING_CTX.sync_scope(merged_context(fields), f)
}

/// Emits `message` with `extra` merged into the record.
///
/// The record is dropped when `extra` cannot be serialized.
pub fn log_extra<E: Serialize + ?Sized>(level: Level, message: &str, extra: &E) {
    log_record(level, message, extra, None);
}

pub(crate) fn log_record<E: Serialize + ?Sized>(
    level: Level,
    message: &str,
    extra: &E,
    exc_info: Option<&str>,
) {
    let Ok(extra) = serde_json::to_string(extra) else {
        return;
    };

    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                target: LOGGER_TARGET,
                $level,
                extra = extra.as_str(),
                exc_info = exc_info,
                "{}",
                message
            )
        };
    }

    if level == Level::ERROR {
        emit!(Level::ERROR);
    } else if level == Level::WARN {
        emit!(Level::WARN);
    } else if level == Level::INFO {
        emit!(Level::INFO);
    } else if level == Level::DEBUG {
        emit!(Level::DEBUG);
    } else {
        emit!(Level::TRACE);
    }
}

/// Installs the JSON formatter on stdout at DEBUG.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn config_default_logger() -> Result<(), Error> {
    install(Level::DEBUG)
}

/// Installs the JSON formatter at the level Lambda's advanced logging controls ask for.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn config_lambda_logger(config: &LoggingConfig) -> Result<(), Error> {
    install(config.log_level)
}

fn install(level: Level) -> Result<(), Error> {
    tracing_subscriber::fmt()
        .event_format(JsonFormatter::default())
        .with_max_level(level)
        .with_writer(std::io::stdout)
        .try_init()
}
