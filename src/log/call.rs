use std::any::type_name;
use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::panic::Location;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::Level;

use super::log_record;
use crate::errors::short_type_name;

/// Argument names left out of the `arguments` field unless overridden.
pub const DEFAULT_EXCLUDED_FIELDS: &[&str] = &["self", "context"];

pub type ResultExtractor<T> = Arc<dyn Fn(&T) -> Map<String, Value> + Send + Sync>;

/// Where a logged function lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionInfo {
    pub name: String,
    pub module: String,
    pub pathname: String,
    pub firstlineno: u32,
}

impl FunctionInfo {
    /// Describes a function named `name` defined at the caller's location.
    #[track_caller]
    #[must_use]
    pub fn caller(name: impl Into<String>) -> Self {
        let location = Location::caller();
        Self {
            name: name.into(),
            module: String::new(),
            pathname: location.file().to_string(),
            firstlineno: location.line(),
        }
    }

    /// Describes `T` (usually a handler or closure type) wrapped at the caller's location.
    #[track_caller]
    #[must_use]
    pub fn of_type<T: ?Sized>() -> Self {
        let full = type_name::<T>();
        let head = full.split('<').next().unwrap_or(full);
        let module = head.rsplit_once("::").map_or("", |(module, _)| module);
        Self {
            module: module.to_string(),
            ..Self::caller(short_type_name::<T>())
        }
    }
}

/// Captures name, module, file and line of the call site.
///
/// ```
/// let info = turbo_lambda::function_info!("handler");
/// assert_eq!(info.name, "handler");
/// assert_eq!(info.module, module_path!());
/// ```
#[macro_export]
macro_rules! function_info {
    ($name:expr) => {
        $crate::log::FunctionInfo {
            name: ::std::string::ToString::to_string(&$name),
            module: ::std::string::ToString::to_string(module_path!()),
            pathname: ::std::string::ToString::to_string(file!()),
            firstlineno: line!(),
        }
    };
}

/// Named, serialized call arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument; values that fail to serialize are logged as a placeholder.
    #[must_use]
    pub fn arg<V: Serialize + ?Sized>(mut self, name: &str, value: &V) -> Self {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|e| Value::String(format!("<unserializable: {e}>")));
        self.0.insert(name.to_string(), value);
        self
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn without(mut self, excluded: &BTreeSet<String>) -> Map<String, Value> {
        self.0.retain(|name, _| !excluded.contains(name));
        self.0
    }
}

/// Renders an error followed by its `source()` chain.
#[must_use]
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str("\nCaused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Logs one record after each wrapped call.
///
/// The record carries the function's location, its arguments minus the
/// excluded ones, whatever the result extractor returns on success and the
/// call duration in seconds. Failed calls are logged at ERROR with the error
/// under `exc_info`; the error itself is handed back untouched.
pub struct CallLogger<T> {
    function: FunctionInfo,
    level: Level,
    message: String,
    excluded_fields: BTreeSet<String>,
    result_extractor: Option<ResultExtractor<T>>,
}

impl<T> Clone for CallLogger<T> {
    fn clone(&self) -> Self {
        Self {
            function: self.function.clone(),
            level: self.level,
            message: self.message.clone(),
            excluded_fields: self.excluded_fields.clone(),
            result_extractor: self.result_extractor.clone(),
        }
    }
}

impl<T> fmt::Debug for CallLogger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallLogger")
            .field("function", &self.function)
            .field("level", &self.level)
            .field("message", &self.message)
            .field("excluded_fields", &self.excluded_fields)
            .field("result_extractor", &self.result_extractor.is_some())
            .finish()
    }
}

impl<T> CallLogger<T> {
    #[must_use]
    pub fn new(function: FunctionInfo) -> Self {
        Self {
            function,
            level: Level::INFO,
            message: "call".to_string(),
            excluded_fields: DEFAULT_EXCLUDED_FIELDS.iter().map(|f| (*f).to_string()).collect(),
            result_extractor: None,
        }
    }

    #[track_caller]
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(FunctionInfo::caller(name))
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Replaces the excluded argument names.
    #[must_use]
    pub fn with_excluded_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_result_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&T) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.result_extractor = Some(Arc::new(extractor));
        self
    }

    #[must_use]
    pub fn function(&self) -> &FunctionInfo {
        &self.function
    }

    /// Runs `f` and logs the outcome.
    ///
    /// # Errors
    ///
    /// Returns whatever error `f` returns.
    pub fn call<E, F>(&self, arguments: Arguments, f: F) -> Result<T, E>
    where
        E: StdError + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        let started = Instant::now();
        let result = f();
        self.emit(
            arguments,
            started.elapsed(),
            result.as_ref().map_err(|e| error_chain(e)),
        );
        result
    }

    /// Awaits `fut` and logs the outcome.
    ///
    /// # Errors
    ///
    /// Returns whatever error `fut` resolves to.
    pub async fn call_async<E, Fut>(&self, arguments: Arguments, fut: Fut) -> Result<T, E>
    where
        E: StdError + 'static,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let result = fut.await;
        self.emit(
            arguments,
            started.elapsed(),
            result.as_ref().map_err(|e| error_chain(e)),
        );
        result
    }

    pub(crate) fn emit(&self, arguments: Arguments, duration: Duration, outcome: Result<&T, String>) {
        let mut extra = Map::new();
        extra.insert("function".to_string(), json!(self.function));
        extra.insert(
            "arguments".to_string(),
            Value::Object(arguments.without(&self.excluded_fields)),
        );

        let (level, exc_info) = match outcome {
            Ok(result) => {
                if let Some(extractor) = &self.result_extractor {
                    extra.extend(extractor(result));
                }
                (self.level, None)
            }
            Err(rendered) => (Level::ERROR, Some(rendered)),
        };

        extra.insert("duration".to_string(), json!(duration.as_secs_f64()));
        log_record(level, &self.message, &extra, exc_info.as_deref());
    }
}
