//! Invocation spans named after the OpenTelemetry FaaS semantic conventions.
//!
//! Spans carry `otel.*` fields so a `tracing-opentelemetry` layer, when the
//! function installs one, exports them with the right name, kind and status.

use std::error::Error as StdError;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::Span;
use tracing::field::Empty;

use crate::log::{LOGGER_TARGET, error_chain};
use crate::schemas::LambdaContext;

pub const TRIGGER_HTTP: &str = "http";
pub const TRIGGER_OTHER: &str = "other";

static COLD_START: AtomicBool = AtomicBool::new(true);

/// True only the first time it is called in this process.
pub fn take_cold_start() -> bool {
    COLD_START.swap(false, Ordering::Relaxed)
}

#[must_use]
pub fn invocation_span(context: &LambdaContext, trigger: &'static str) -> Span {
    let max_memory = i64::from(context.memory_limit_in_mb) * 1024 * 1024;
    let span = tracing::info_span!(
        target: LOGGER_TARGET,
        "lambda.invocation",
        otel.name = %context.function_name,
        otel.kind = "server",
        otel.status_code = Empty,
        otel.status_message = Empty,
        faas.name = %context.function_name,
        faas.invocation_id = %context.aws_request_id,
        faas.trigger = trigger,
        faas.coldstart = take_cold_start(),
        faas.max_memory = max_memory,
        cloud.provider = "aws",
        cloud.resource_id = %context.invoked_function_arn,
        aws.xray.trace_id = Empty,
    );
    if let Some(trace_id) = &context.xray_trace_id {
        span.record("aws.xray.trace_id", trace_id.as_str());
    }
    span
}

pub fn record_error(span: &Span, error: &(dyn StdError + 'static)) {
    span.record("otel.status_code", "ERROR");
    span.record("otel.status_message", error_chain(error).as_str());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cold_start_is_reported_once() {
        let _ = take_cold_start();
        assert!(!take_cold_start());
        assert!(!take_cold_start());
    }

    #[test]
    fn test_span_builds_without_subscriber() {
        let context = LambdaContext {
            function_name: "fn".to_string(),
            memory_limit_in_mb: 128,
            invoked_function_arn: "arn:".to_string(),
            aws_request_id: "req-1".to_string(),
            xray_trace_id: Some("Root=1-abc".to_string()),
        };
        let span = invocation_span(&context, TRIGGER_OTHER);
        record_error(&span, &std::io::Error::other("boom"));
    }
}
