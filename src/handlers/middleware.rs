//! Generic wrappers around a [`Handler`].

use std::error::Error as StdError;
use std::fmt;
use std::marker::PhantomData;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use tracing::Instrument;

use super::Handler;
use crate::Error;
use crate::log::{Arguments, CallLogger, LogFields, error_chain, logger_bind};
use crate::schemas::LambdaContext;
use crate::telemetry;

/// Produces the log fields bound for one invocation.
pub type ContextExtractor<Event> = fn(&Event, &LambdaContext) -> LogFields;

// ============================================================================
// Log context binding
// ============================================================================

/// Runs the inner handler with fields from `extractor` bound into the log context.
#[derive(Clone, Debug)]
pub struct BindContext<H, X> {
    inner: H,
    extractor: X,
}

pub fn bind_context<H, X>(extractor: X, inner: H) -> BindContext<H, X> {
    BindContext { inner, extractor }
}

#[async_trait]
impl<Event, H, X> Handler<Event> for BindContext<H, X>
where
    Event: Send + 'static,
    H: Handler<Event>,
    X: Fn(&Event, &LambdaContext) -> LogFields + Send + Sync,
{
    type Response = H::Response;

    async fn call(&self, event: Event, context: &LambdaContext) -> Result<H::Response, Error> {
        let fields = (self.extractor)(&event, context);
        logger_bind(fields, self.inner.call(event, context)).await
    }
}

// ============================================================================
// Error transformation
// ============================================================================

/// Turns failures of type `E` into whatever `transform` returns.
///
/// Errors of any other type pass through untouched, as do successes.
pub struct ErrorTransformer<H, F, E> {
    inner: H,
    transform: F,
    _error: PhantomData<fn(E)>,
}

impl<H: fmt::Debug, F, E> fmt::Debug for ErrorTransformer<H, F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorTransformer")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

pub fn error_transformer_handler<E, H, F>(transform: F, inner: H) -> ErrorTransformer<H, F, E> {
    ErrorTransformer {
        inner,
        transform,
        _error: PhantomData,
    }
}

#[async_trait]
impl<Event, H, F, E> Handler<Event> for ErrorTransformer<H, F, E>
where
    Event: Send + 'static,
    H: Handler<Event>,
    F: Fn(E) -> Result<H::Response, Error> + Send + Sync,
    E: StdError + Send + Sync + 'static,
{
    type Response = H::Response;

    async fn call(&self, event: Event, context: &LambdaContext) -> Result<H::Response, Error> {
        match self.inner.call(event, context).await {
            Ok(response) => Ok(response),
            Err(error) => match error.downcast::<E>() {
                Ok(matched) => (self.transform)(*matched),
                Err(other) => Err(other),
            },
        }
    }
}

// ============================================================================
// Call logging
// ============================================================================

/// Applies a [`CallLogger`] to every invocation.
///
/// The event is logged as the `event` argument and the context as `context`,
/// which the default exclusions drop.
#[derive(Clone, Debug)]
pub struct Logged<H, R> {
    inner: H,
    logger: CallLogger<R>,
}

pub fn logged_handler<H, R>(logger: CallLogger<R>, inner: H) -> Logged<H, R> {
    Logged { inner, logger }
}

#[async_trait]
impl<Event, H, R> Handler<Event> for Logged<H, R>
where
    Event: Serialize + Send + 'static,
    H: Handler<Event, Response = R>,
    R: Send + 'static,
{
    type Response = R;

    async fn call(&self, event: Event, context: &LambdaContext) -> Result<R, Error> {
        let arguments = Arguments::new().arg("event", &event).arg("context", context);
        let started = Instant::now();
        let result = self.inner.call(event, context).await;
        self.logger.emit(
            arguments,
            started.elapsed(),
            result.as_ref().map_err(|e| error_chain(&**e)),
        );
        result
    }
}

// ============================================================================
// Tracing
// ============================================================================

/// Runs every invocation inside a `lambda.invocation` span.
#[derive(Clone, Debug)]
pub struct Traced<H> {
    inner: H,
    trigger: &'static str,
}

/// `trigger` is the `faas.trigger` value, see [`telemetry`] for the constants.
pub fn traced_handler<H>(trigger: &'static str, inner: H) -> Traced<H> {
    Traced { inner, trigger }
}

#[async_trait]
impl<Event, H> Handler<Event> for Traced<H>
where
    Event: Send + 'static,
    H: Handler<Event>,
{
    type Response = H::Response;

    async fn call(&self, event: Event, context: &LambdaContext) -> Result<H::Response, Error> {
        let span = telemetry::invocation_span(context, self.trigger);
        let result = self.inner.call(event, context).instrument(span.clone()).await;
        if let Err(error) = &result {
            telemetry::record_error(&span, &**error);
        }
        result
    }
}
