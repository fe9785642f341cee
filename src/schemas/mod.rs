//! Event and response models for the payloads Lambda hands to a function.

pub mod eventbridge;
pub mod gateway;
pub mod sqs;

use std::env;
use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};

use crate::config::LAMBDA_EXECUTION_ENV_PREFIX;

pub use eventbridge::EventBridgeEvent;
pub use gateway::{
    ActionEnum, ApiGatewayResponse, ApiGatewaySerializedResponse, AuthorizerPolicyDocument,
    AuthorizerPolicyStatement, AuthorizerResponse, EffectEnum, GatewayBody,
    GatewayEventPathParameters, GatewayEventQueryParameters, HttpErrorResponse, RouteArn,
    RouteArnError,
};
pub use sqs::{
    LambdaCheckpointItem, LambdaCheckpointResponse, SqsAttributes, SqsEvent, SqsMessageAttribute,
    SqsRecord,
};

/// A raw invocation payload before validation.
pub type EventType = Value;

/// True when running inside a managed Lambda execution environment.
#[must_use]
pub fn is_lambda() -> bool {
    env::var("AWS_EXECUTION_ENV").is_ok_and(|v| v.starts_with(LAMBDA_EXECUTION_ENV_PREFIX))
}

/// The parts of the invocation context the wrappers log and trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaContext {
    pub function_name: String,
    pub memory_limit_in_mb: i32,
    pub invoked_function_arn: String,
    pub aws_request_id: String,
    #[serde(default)]
    pub xray_trace_id: Option<String>,
}

impl LambdaContext {
    /// The `lambda_context` object bound into every log record of an invocation.
    #[must_use]
    pub fn log_fields(&self) -> Value {
        json!({
            "name": self.function_name,
            "memory_size": self.memory_limit_in_mb,
            "arn": self.invoked_function_arn,
            "request_id": self.aws_request_id,
        })
    }
}

impl From<&lambda_runtime::Context> for LambdaContext {
    fn from(context: &lambda_runtime::Context) -> Self {
        Self {
            function_name: context.env_config.function_name.clone(),
            memory_limit_in_mb: context.env_config.memory,
            invoked_function_arn: context.invoked_function_arn.clone(),
            aws_request_id: context.request_id.clone(),
            xray_trace_id: context.xray_trace_id.clone(),
        }
    }
}

/// A value carried on the wire as a JSON document inside a string.
///
/// SQS bodies are the usual case: `"body": "{\"message\":\"hi\"}"`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Json<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Json<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        serde_json::from_str(&raw)
            .map(Json)
            .map_err(|e| D::Error::custom(format!("invalid JSON string: {e}")))
    }
}

impl<T: Serialize> Serialize for Json<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = serde_json::to_string(&self.0).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&raw)
    }
}

pub(crate) mod timestamp {
    //! Timestamps sent as epoch strings, epoch numbers or RFC 3339 text.

    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    // Epoch values above this are milliseconds.
    const MS_THRESHOLD: f64 = 2e10;

    pub fn parse_value(value: &Value) -> Result<DateTime<Utc>, String> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| format!("invalid epoch {n}"))
                .and_then(from_epoch),
            Value::String(s) => match s.parse::<f64>() {
                Ok(epoch) => from_epoch(epoch),
                Err(_) => DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| format!("invalid datetime {s:?}: {e}")),
            },
            other => Err(format!("invalid datetime {other}")),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_epoch(epoch: f64) -> Result<DateTime<Utc>, String> {
        let millis = if epoch.abs() > MS_THRESHOLD {
            epoch
        } else {
            epoch * 1000.0
        };
        Utc.timestamp_millis_opt(millis.round() as i64)
            .single()
            .ok_or_else(|| format!("epoch out of range: {epoch}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        parse_value(&value).map_err(D::Error::custom)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }
}
