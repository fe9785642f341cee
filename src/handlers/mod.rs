//! Handler traits and the wrappers that compose around them.
//!
//! A Lambda entry point is a [`Handler`] over the raw event. Business logic
//! is usually written as a [`RequestHandler`] over a typed request and lifted
//! into a `Handler` by [`validated_handler`]. The remaining wrappers add log
//! context, call logging, tracing spans and error translation:
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use turbo_lambda::handlers::{gateway_handler, request_fn, run};
//! use turbo_lambda::schemas::ApiGatewayResponse;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Ping {}
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lambda_runtime::Error> {
//!     turbo_lambda::setup_logging();
//!     run(gateway_handler(request_fn(|_: Ping| async move {
//!         Ok::<_, lambda_runtime::Error>(ApiGatewayResponse::empty())
//!     })))
//!     .await
//! }
//! ```

pub mod gateway;
pub mod middleware;
pub mod sqs;
pub mod validated;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use lambda_runtime::{LambdaEvent, service_fn};
use serde::Serialize;

use crate::Error;
use crate::schemas::{EventType, LambdaContext};

pub use gateway::{
    GatewayHandler, RequestLoggerHandler, gateway_handler, lambda_context_fields,
    request_logger_handler,
};
pub use middleware::{
    BindContext, ContextExtractor, ErrorTransformer, Logged, Traced, bind_context,
    error_transformer_handler, logged_handler, traced_handler,
};
pub use sqs::{ParallelSqs, parallel_sqs_handler};
pub use validated::{Validated, validated_handler};

/// A Lambda entry point: an event plus the invocation context in, a response out.
#[async_trait]
pub trait Handler<Event>: Send + Sync
where
    Event: Send + 'static,
{
    type Response: Send;

    async fn call(&self, event: Event, context: &LambdaContext) -> Result<Self::Response, Error>;
}

/// Business logic over an already validated request.
#[async_trait]
pub trait RequestHandler<Req>: Send + Sync
where
    Req: Send + 'static,
{
    type Response: Send;

    async fn handle(&self, request: Req) -> Result<Self::Response, Error>;
}

/// Returns a [`Handler`] backed by `f`.
pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn { f }
}

/// A [`Handler`] implemented by a closure taking the event and an owned context.
#[derive(Copy, Clone, Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, Event, R, E> Handler<Event> for HandlerFn<F>
where
    F: Fn(Event, LambdaContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    Event: Send + 'static,
    R: Send + 'static,
    E: Into<Error> + 'static,
{
    type Response = R;

    async fn call(&self, event: Event, context: &LambdaContext) -> Result<R, Error> {
        (self.f)(event, context.clone()).await.map_err(Into::into)
    }
}

/// Returns a [`RequestHandler`] backed by `f`.
pub fn request_fn<F>(f: F) -> RequestFn<F> {
    RequestFn { f }
}

/// A [`RequestHandler`] implemented by a closure.
#[derive(Copy, Clone, Debug)]
pub struct RequestFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, Req, R, E> RequestHandler<Req> for RequestFn<F>
where
    F: Fn(Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    Req: Send + 'static,
    R: Send + 'static,
    E: Into<Error> + 'static,
{
    type Response = R;

    async fn handle(&self, request: Req) -> Result<R, Error> {
        (self.f)(request).await.map_err(Into::into)
    }
}

/// Starts the Lambda runtime loop with `handler`.
///
/// # Errors
///
/// Returns an error if the runtime API cannot be reached or the runtime
/// configuration is missing from the environment.
pub async fn run<H>(handler: H) -> Result<(), Error>
where
    H: Handler<EventType> + 'static,
    H::Response: Serialize + 'static,
{
    let handler = Arc::new(handler);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<EventType>| {
        let handler = Arc::clone(&handler);
        async move {
            let context = LambdaContext::from(&event.context);
            handler.call(event.payload, &context).await
        }
    }))
    .await
}
