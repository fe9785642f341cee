use std::collections::{HashMap, HashSet};
use std::error::Error as StdError;
use std::fmt;

use chrono::Utc;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use super::{EXC_INFO_FIELD, EXTRA_FIELD, current_context};
use super::call::error_chain;

/// Record attribute renames applied to every record.
pub const DEFAULT_TRANSLATOR: &[(&str, &str)] = &[
    ("levelname", "level"),
    ("name", "logger"),
    ("asctime", "timestamp"),
    ("exc_text", "exc_info"),
    ("threadName", "thread_name"),
    ("processName", "process_name"),
    ("taskName", "task_name"),
];

/// Record attributes never written out.
pub const DEFAULT_IGNORED_KEYS: &[&str] = &[
    "msg",
    "args",
    "levelno",
    "exc_info",
    "created",
    "msecs",
    "relativeCreated",
];

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

static PROCESS_NAME: Lazy<String> = Lazy::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .unwrap_or_default()
});

/// Renders each event as a single-line JSON object.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    translator: HashMap<String, String>,
    ignored_keys: HashSet<String>,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new(
            DEFAULT_TRANSLATOR.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())),
            DEFAULT_IGNORED_KEYS.iter().map(|k| (*k).to_string()),
        )
    }
}

impl JsonFormatter {
    pub fn new<T, I>(translator: T, ignored_keys: I) -> Self
    where
        T: IntoIterator<Item = (String, String)>,
        I: IntoIterator<Item = String>,
    {
        Self {
            translator: translator.into_iter().collect(),
            ignored_keys: ignored_keys.into_iter().collect(),
        }
    }

    fn insert(&self, record: &mut Map<String, Value>, key: &str, value: Value) {
        if self.ignored_keys.contains(key) {
            return;
        }
        let key = self.translator.get(key).map_or(key, String::as_str);
        record.insert(key.to_string(), value);
    }

    /// Builds the JSON record for `event`.
    pub fn record(&self, event: &Event<'_>) -> Map<String, Value> {
        let meta = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let now = Utc::now();
        let thread = std::thread::current();
        let pathname = meta.file().unwrap_or_default();
        let filename = pathname.rsplit(['/', '\\']).next().unwrap_or(pathname);

        let mut record = Map::new();
        self.insert(&mut record, "name", Value::from(meta.target()));
        self.insert(&mut record, "msg", Value::from(visitor.message.clone().unwrap_or_default()));
        self.insert(&mut record, "levelname", Value::from(meta.level().as_str()));
        self.insert(&mut record, "levelno", Value::from(level_number(meta.level())));
        self.insert(&mut record, "pathname", Value::from(pathname));
        self.insert(&mut record, "filename", Value::from(filename));
        self.insert(&mut record, "module", Value::from(meta.module_path().unwrap_or_default()));
        self.insert(&mut record, "exc_info", Value::Bool(visitor.exc_info.is_some()));
        if let Some(exc_text) = visitor.exc_info.take() {
            self.insert(&mut record, "exc_text", Value::from(exc_text));
        }
        self.insert(&mut record, "lineno", Value::from(meta.line().unwrap_or_default()));
        self.insert(&mut record, "created", Value::from(now.timestamp_millis()));
        self.insert(
            &mut record,
            "threadName",
            Value::from(thread.name().map_or_else(|| format!("{:?}", thread.id()), ToString::to_string)),
        );
        self.insert(&mut record, "thread", Value::from(format!("{:?}", thread.id())));
        self.insert(&mut record, "process", Value::from(std::process::id()));
        self.insert(&mut record, "processName", Value::from(PROCESS_NAME.as_str()));
        if let Some(task_id) = tokio::task::try_id() {
            self.insert(&mut record, "taskName", Value::from(task_id.to_string()));
        }

        for (key, value) in current_context() {
            self.insert(&mut record, &key, value);
        }
        for (key, value) in visitor.extra {
            self.insert(&mut record, &key, value);
        }
        for (key, value) in visitor.fields {
            self.insert(&mut record, &key, value);
        }

        self.insert(&mut record, "message", Value::from(visitor.message.unwrap_or_default()));
        self.insert(&mut record, "asctime", Value::from(now.format(TIME_FORMAT).to_string()));
        record
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let line = serde_json::to_string(&self.record(event)).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

// Numeric severities: ERROR=40, WARN=30, INFO=20, DEBUG=10, TRACE=5.
fn level_number(level: &tracing::Level) -> u8 {
    if *level == tracing::Level::ERROR {
        40
    } else if *level == tracing::Level::WARN {
        30
    } else if *level == tracing::Level::INFO {
        20
    } else if *level == tracing::Level::DEBUG {
        10
    } else {
        5
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    exc_info: Option<String>,
    extra: Map<String, Value>,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        match field.name() {
            "message" => {
                self.message = Some(match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                });
            }
            EXTRA_FIELD => match value {
                Value::String(raw) => match serde_json::from_str::<Map<String, Value>>(&raw) {
                    Ok(extra) => self.extra.extend(extra),
                    Err(_) => {
                        self.fields.insert(EXTRA_FIELD.to_string(), Value::String(raw));
                    }
                },
                other => {
                    self.fields.insert(EXTRA_FIELD.to_string(), other);
                }
            },
            EXC_INFO_FIELD => {
                self.exc_info = Some(match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                });
            }
            name => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn StdError + 'static)) {
        self.insert(field, Value::from(error_chain(value)));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}
