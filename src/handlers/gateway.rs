//! Ready-made handler stacks for plain invocations and API Gateway proxies.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::Level;

use super::middleware::{
    BindContext, ContextExtractor, ErrorTransformer, Logged, Traced, bind_context,
    error_transformer_handler, logged_handler, traced_handler,
};
use super::validated::{Validated, validated_handler};
use super::{Handler, RequestHandler};
use crate::Error;
use crate::errors::{GeneralError, general_error_to_gateway_response};
use crate::log::{CallLogger, FunctionInfo, LogFields};
use crate::schemas::{ApiGatewayResponse, EventType, LambdaContext};
use crate::telemetry::{TRIGGER_HTTP, TRIGGER_OTHER};

const REQUEST_MESSAGE: &str = "request";

pub type RequestLoggerHandler<H, Event, R> = BindContext<Traced<Logged<H, R>>, ContextExtractor<Event>>;

pub type GatewayErrorTransform = fn(GeneralError) -> Result<Value, Error>;

pub type GatewayHandler<H, Req> = BindContext<
    Traced<Logged<ErrorTransformer<Validated<H, Req>, GatewayErrorTransform, GeneralError>, Value>>,
    ContextExtractor<EventType>,
>;

/// `{"lambda_context": {...}}` for binding into the log context.
#[must_use]
pub fn lambda_context_fields<Event>(_event: &Event, context: &LambdaContext) -> LogFields {
    let mut fields = Map::new();
    fields.insert("lambda_context".to_string(), context.log_fields());
    fields
}

fn gateway_context_fields(event: &EventType, context: &LambdaContext) -> LogFields {
    let mut fields = lambda_context_fields(event, context);
    let correlation_id = event
        .get("requestContext")
        .and_then(|request_context| request_context.get("requestId"))
        .cloned()
        .unwrap_or(Value::Null);
    fields.insert("correlation_id".to_string(), correlation_id);
    fields
}

fn general_error_response(error: GeneralError) -> Result<Value, Error> {
    Ok(serde_json::to_value(general_error_to_gateway_response(&error))?)
}

/// Logs each invocation of `inner` at DEBUG with the Lambda context bound.
#[track_caller]
pub fn request_logger_handler<Event, H>(inner: H) -> RequestLoggerHandler<H, Event, H::Response>
where
    Event: Serialize + Send + 'static,
    H: Handler<Event>,
{
    let logger = CallLogger::new(FunctionInfo::of_type::<H>())
        .with_level(Level::DEBUG)
        .with_message(REQUEST_MESSAGE);

    bind_context(
        lambda_context_fields::<Event> as ContextExtractor<Event>,
        traced_handler(TRIGGER_OTHER, logged_handler(logger, inner)),
    )
}

/// The full API Gateway stack around a typed request handler.
///
/// Requests are validated into `Req`, [`GeneralError`]s become problem+json
/// responses, and each invocation is logged at DEBUG with its status code
/// and the gateway request id bound as `correlation_id`.
#[track_caller]
pub fn gateway_handler<Req, H>(func: H) -> GatewayHandler<H, Req>
where
    Req: DeserializeOwned + Serialize + Send + 'static,
    H: RequestHandler<Req, Response = ApiGatewayResponse>,
{
    let logger = CallLogger::new(FunctionInfo::of_type::<H>())
        .with_level(Level::DEBUG)
        .with_message(REQUEST_MESSAGE)
        .with_result_extractor(|response: &Value| {
            let mut fields = Map::new();
            fields.insert(
                "status_code".to_string(),
                response.get("statusCode").cloned().unwrap_or(Value::Null),
            );
            fields
        });

    bind_context(
        gateway_context_fields as ContextExtractor<EventType>,
        traced_handler(
            TRIGGER_HTTP,
            logged_handler(
                logger,
                error_transformer_handler(
                    general_error_response as GatewayErrorTransform,
                    validated_handler(func),
                ),
            ),
        ),
    )
}
