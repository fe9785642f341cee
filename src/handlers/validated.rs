use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::Level;

use super::{Handler, RequestHandler};
use crate::Error;
use crate::errors::GeneralError;
use crate::log::log_extra;
use crate::schemas::{EventType, LambdaContext};

#[derive(Serialize)]
struct ParsedEvent<'a, R> {
    event: &'a R,
}

/// Lifts a [`RequestHandler`] over `Req` into a [`Handler`] over raw events.
///
/// The event is deserialized into `Req` (failures become a 422
/// [`GeneralError`] locating the offending field) and the response is serialized back to JSON, so unit
/// responses come out as `null`.
pub struct Validated<H, Req> {
    inner: H,
    _request: PhantomData<fn() -> Req>,
}

impl<H: fmt::Debug, Req> fmt::Debug for Validated<H, Req> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validated").field("inner", &self.inner).finish()
    }
}

pub fn validated_handler<Req, H>(inner: H) -> Validated<H, Req>
where
    H: RequestHandler<Req>,
    Req: Send + 'static,
{
    Validated {
        inner,
        _request: PhantomData,
    }
}

#[async_trait]
impl<H, Req> Handler<EventType> for Validated<H, Req>
where
    H: RequestHandler<Req>,
    H::Response: Serialize,
    Req: DeserializeOwned + Serialize + Send + 'static,
{
    type Response = Value;

    async fn call(&self, event: EventType, _context: &LambdaContext) -> Result<Value, Error> {
        let request: Req = serde_path_to_error::deserialize(event)
            .map_err(|e| GeneralError::request_validation_at::<Req>(e.path(), e.inner()))?;
        log_extra(Level::DEBUG, "parsed_event", &ParsedEvent { event: &request });

        let response = self.inner.handle(request).await?;
        Ok(serde_json::to_value(response)?)
    }
}
