mod common;

use std::collections::{BTreeMap, BTreeSet};
use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::Level;
use turbo_lambda::function_info;
use turbo_lambda::log::{
    Arguments, CallLogger, LOGGER_TARGET, current_context, log_extra, logger_bind,
    logger_bind_sync,
};

use common::CapturedLogs;

#[derive(Serialize)]
struct SampleModel {
    s: String,
}

#[derive(Debug, thiserror::Error)]
#[error("outer failure")]
struct OuterError {
    #[source]
    source: io::Error,
}

#[derive(Serialize)]
struct UnserializableExtra {
    key: BTreeMap<(i32, i32), &'static str>,
}

#[test]
fn test_logger_invalid_type() {
    let (logs, _guard) = CapturedLogs::install();

    let mut key = BTreeMap::new();
    key.insert((1, 2), "tuple keys are not JSON object keys");
    log_extra(Level::INFO, "check", &UnserializableExtra { key });

    assert!(logs.records().is_empty());
}

#[tokio::test]
async fn test_logger_bind() {
    let (logs, _guard) = CapturedLogs::install();
    let now = Utc::now();
    let key1 = SampleModel {
        s: "some value 1".to_string(),
    };

    logger_bind(
        [("key1".to_string(), serde_json::to_value(&key1).unwrap())],
        async {
            log_extra(
                Level::INFO,
                "some message",
                &json!({ "key2": now, "key3": BTreeSet::from([1, 2]) }),
            );
        },
    )
    .await;

    let records = logs.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["message"], "some message");
    assert_eq!(record["key1"], json!({"s": "some value 1"}));
    assert_eq!(record["key3"], json!([1, 2]));
    let key2 = DateTime::parse_from_rfc3339(record["key2"].as_str().unwrap()).unwrap();
    assert_eq!(key2, now);
}

#[tokio::test]
async fn test_nested_bind_restores_outer_context() {
    let (logs, _guard) = CapturedLogs::install();

    logger_bind([("outer".to_string(), json!(1)), ("shared".to_string(), json!("outer"))], async {
        logger_bind([("shared".to_string(), json!("inner"))], async {
            tracing::info!(target: LOGGER_TARGET, "inner");
        })
        .await;
        tracing::info!(target: LOGGER_TARGET, "outer");
    })
    .await;
    tracing::info!(target: LOGGER_TARGET, "unbound");

    let inner = &logs.with_message("inner")[0];
    assert_eq!(inner["outer"], 1);
    assert_eq!(inner["shared"], "inner");

    let outer = &logs.with_message("outer")[0];
    assert_eq!(outer["shared"], "outer");

    let unbound = &logs.with_message("unbound")[0];
    assert!(unbound.get("outer").is_none());
}

#[test]
fn test_sync_bind() {
    let value = logger_bind_sync([("request".to_string(), json!("r-1"))], || {
        current_context().get("request").cloned()
    });
    assert_eq!(value, Some(json!("r-1")));
    assert!(current_context().is_empty());
}

#[test]
fn test_record_base_keys_are_translated() {
    let (logs, _guard) = CapturedLogs::install();

    tracing::warn!(target: LOGGER_TARGET, attempt = 3, "retrying");

    let record = &logs.records()[0];
    assert_eq!(record["logger"], LOGGER_TARGET);
    assert_eq!(record["level"], "WARN");
    assert_eq!(record["attempt"], 3);
    assert_eq!(record["filename"], "log_tests.rs");
    assert!(record.contains_key("thread_name"));
    assert!(record["thread"].as_str().unwrap().starts_with("ThreadId("));
    assert_eq!(record["process"], std::process::id());
    assert!(!record["process_name"].as_str().unwrap().is_empty());
    assert!(!record.contains_key("task_name"));
    assert!(!record.contains_key("func_name"));
    assert!(record["timestamp"].as_str().unwrap().ends_with('Z'));
    for ignored in ["msg", "levelno", "created", "levelname", "name", "asctime"] {
        assert!(!record.contains_key(ignored), "{ignored} should not be written");
    }
}

#[tokio::test]
async fn test_record_inside_task_has_task_name() {
    let (logs, _guard) = CapturedLogs::install();

    let task_id = tokio::spawn(async {
        tracing::info!(target: LOGGER_TARGET, "in task");
        tokio::task::id()
    })
    .await
    .unwrap();

    let record = &logs.with_message("in task")[0];
    assert_eq!(record["task_name"], task_id.to_string());
}

#[test]
fn test_logging_exceptions() {
    let (logs, _guard) = CapturedLogs::install();

    let result = CallLogger::<i32>::named("divide").call(Arguments::new(), || {
        Err::<i32, _>(io::Error::new(io::ErrorKind::InvalidInput, "division by zero"))
    });

    assert!(result.is_err());
    let record = &logs.records()[0];
    assert_eq!(record["level"], "ERROR");
    assert!(record["exc_info"].as_str().unwrap().contains("division by zero"));
}

#[test]
fn test_logged_failure_includes_source_chain() {
    let (logs, _guard) = CapturedLogs::install();

    let result = CallLogger::<()>::named("load").call(Arguments::new(), || {
        Err::<(), _>(OuterError {
            source: io::Error::other("root cause"),
        })
    });

    assert!(result.is_err());
    let record = &logs.records()[0];
    assert_eq!(record["exc_info"], "outer failure\nCaused by: root cause");
}

#[tokio::test]
async fn test_logged_async_failure_includes_source_chain() {
    let (logs, _guard) = CapturedLogs::install();

    let result = CallLogger::<()>::named("load")
        .call_async(Arguments::new(), async {
            Err::<(), _>(OuterError {
                source: io::Error::other("root cause"),
            })
        })
        .await;

    assert!(result.is_err());
    let record = &logs.records()[0];
    assert_eq!(record["exc_info"], "outer failure\nCaused by: root cause");
}

#[test]
fn test_log_after_call_without_args() {
    let (logs, _guard) = CapturedLogs::install();
    let random_a = "some random value";

    let (logger, line) = (CallLogger::<()>::new(function_info!("SampleClass.my_function_name")), line!());
    logger
        .call(Arguments::new().arg("a", random_a).arg("self", &"ignored"), || Ok::<_, io::Error>(()))
        .unwrap();

    let record = &logs.records()[0];
    assert_eq!(record["message"], "call");
    assert_eq!(record["level"], "INFO");
    assert_eq!(
        record["function"],
        json!({
            "name": "SampleClass.my_function_name",
            "module": module_path!(),
            "pathname": file!(),
            "firstlineno": line,
        })
    );
    assert_eq!(record["arguments"], json!({"a": random_a}));
    assert!(record["duration"].as_f64().unwrap() >= 0.0);
}

#[test]
fn test_log_after_call_with_parameters() {
    let (logs, _guard) = CapturedLogs::install();

    let logger = CallLogger::<i32>::named("my_function_name")
        .with_excluded_fields(["a"])
        .with_result_extractor(|x: &i32| {
            let mut fields = serde_json::Map::new();
            fields.insert("some_key".to_string(), json!(x));
            fields
        });
    let result = logger.call(Arguments::new().arg("a", "some argument value"), || {
        Ok::<_, io::Error>(1)
    });

    assert_eq!(result.unwrap(), 1);
    let record = &logs.records()[0];
    assert_eq!(record["arguments"], json!({}));
    assert_eq!(record["some_key"], 1);
}

#[tokio::test]
async fn test_log_after_async_call() {
    let (logs, _guard) = CapturedLogs::install();

    let logger = CallLogger::<String>::named("fetch")
        .with_level(Level::DEBUG)
        .with_message("fetched");
    let value = logger
        .call_async(Arguments::new().arg("id", &7), async { Ok::<_, io::Error>("x".to_string()) })
        .await
        .unwrap();

    assert_eq!(value, "x");
    let record = &logs.with_message("fetched")[0];
    assert_eq!(record["level"], "DEBUG");
    assert_eq!(record["arguments"], json!({"id": 7}));
    assert_eq!(record["function"]["name"], Value::from("fetch"));
}
