#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};
use tracing::Level;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use turbo_lambda::log::JsonFormatter;
use turbo_lambda::schemas::LambdaContext;

/// Collects everything the JSON formatter writes.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Installs a thread-local subscriber writing into a fresh buffer.
    pub fn install() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .event_format(JsonFormatter::default())
            .with_max_level(Level::TRACE)
            .with_writer(logs.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    pub fn records(&self) -> Vec<Map<String, Value>> {
        let buffer = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer)
            .lines()
            .map(|line| serde_json::from_str(line).expect("log line is a JSON object"))
            .collect()
    }

    /// Records with the given message.
    pub fn with_message(&self, message: &str) -> Vec<Map<String, Value>> {
        self.records()
            .into_iter()
            .filter(|record| record.get("message") == Some(&Value::from(message)))
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub fn lambda_context() -> LambdaContext {
    LambdaContext {
        function_name: "test".to_string(),
        memory_limit_in_mb: 128,
        invoked_function_arn: "arn:aws:lambda:eu-west-1:809313241:function:test".to_string(),
        aws_request_id: "52fdfc07-2182-154f-163f-5f0f9a621d72".to_string(),
        xray_trace_id: None,
    }
}
