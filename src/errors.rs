use std::any::type_name;
use std::collections::BTreeMap;

use http::StatusCode;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use serde_path_to_error::{Path, Segment};
use thiserror::Error;

use crate::schemas::{ApiGatewayResponse, ApiGatewaySerializedResponse, HttpErrorResponse};

/// Problem type used when no more specific type URI applies.
pub const DEFAULT_ERROR_TYPE: &str = "about:blank";

/// Problem type reported for events that fail to deserialize.
pub const VALIDATION_ERROR_TYPE: &str =
    "https://docs.rs/serde_json/latest/serde_json/struct.Error.html";

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

static PATH_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*::").expect("static regex"));

#[derive(Debug, Error, Default)]
#[error("Unauthorized")]
pub struct UnauthorizedError {
    #[source]
    pub source: Option<GeneralError>,
}

impl UnauthorizedError {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn caused_by(source: GeneralError) -> Self {
        Self {
            source: Some(source),
        }
    }
}

/// An error that maps onto an RFC 7807 problem response.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{status_code}: {detail}")]
pub struct GeneralError {
    pub error_type: String,
    pub status_code: StatusCode,
    pub title: String,
    pub detail: String,
    pub extensions: Value,
}

impl Default for GeneralError {
    fn default() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "General error")
    }
}

impl GeneralError {
    /// Creates an error whose title is the status code's description.
    #[must_use]
    pub fn new(status_code: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            error_type: DEFAULT_ERROR_TYPE.to_string(),
            status_code,
            title: status_description(status_code).to_string(),
            detail: detail.into(),
            extensions: Value::Null,
        }
    }

    #[must_use]
    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = error_type.into();
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: Value) -> Self {
        self.extensions = extensions;
        self
    }

    /// A 422 error describing why an event could not be read as a `T`.
    ///
    /// `loc` is the line and column when the input was JSON text, else empty.
    #[must_use]
    pub fn request_validation<T: ?Sized>(error: &serde_json::Error) -> Self {
        Self::validation::<T>(Vec::new(), error)
    }

    /// Like [`GeneralError::request_validation`], with `loc` set to the path
    /// of the offending field, e.g. `["body", "id"]`.
    #[must_use]
    pub fn request_validation_at<T: ?Sized>(path: &Path, error: &serde_json::Error) -> Self {
        let loc = path
            .iter()
            .filter_map(|segment| match segment {
                Segment::Seq { index } => Some(json!(index)),
                Segment::Map { key } => Some(json!(key)),
                Segment::Enum { variant } => Some(json!(variant)),
                _ => None,
            })
            .collect();
        Self::validation::<T>(loc, error)
    }

    fn validation<T: ?Sized>(path: Vec<Value>, error: &serde_json::Error) -> Self {
        let category = match error.classify() {
            serde_json::error::Category::Io => "io",
            serde_json::error::Category::Syntax => "syntax",
            serde_json::error::Category::Data => "data",
            serde_json::error::Category::Eof => "eof",
        };
        let loc = if !path.is_empty() {
            Value::Array(path)
        } else if error.line() == 0 {
            json!([])
        } else {
            json!([error.line(), error.column()])
        };

        Self::new(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
            .with_type(VALIDATION_ERROR_TYPE)
            .with_title(short_type_name::<T>())
            .with_extensions(json!([{
                "type": category,
                "loc": loc,
                "msg": error.to_string(),
            }]))
    }

    #[must_use]
    pub fn to_problem(&self) -> HttpErrorResponse {
        HttpErrorResponse {
            error_type: self.error_type.clone(),
            status: self.status_code.as_u16(),
            title: self.title.clone(),
            detail: self.detail.clone(),
            extensions: self.extensions.clone(),
        }
    }
}

/// Renders a `GeneralError` as a problem+json API Gateway response.
#[must_use]
pub fn general_error_to_gateway_response(error: &GeneralError) -> ApiGatewaySerializedResponse {
    let headers = BTreeMap::from([("Content-Type".to_string(), PROBLEM_CONTENT_TYPE.to_string())]);
    let response = match ApiGatewayResponse::json(&error.to_problem()) {
        Ok(response) => response,
        // HttpErrorResponse holds only strings, integers and JSON values.
        Err(_) => ApiGatewayResponse::empty(),
    };
    response
        .with_status(error.status_code)
        .with_headers(headers)
        .serialized()
}

/// Type name with module paths stripped, e.g. `SqsEvent<Json<Order>>`.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> String {
    PATH_SEGMENT.replace_all(type_name::<T>(), "").into_owned()
}

/// Long-form description of a status code, falling back to its reason phrase.
#[must_use]
pub fn status_description(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100 => "Request received, please continue",
        101 => "Switching to new protocol; obey Upgrade header",
        200 => "Request fulfilled, document follows",
        201 => "Document created, URL follows",
        202 => "Request accepted, processing continues off-line",
        203 => "Request fulfilled from cache",
        204 => "Request fulfilled, nothing follows",
        205 => "Clear input form for further input",
        206 => "Partial content follows",
        300 => "Object has several resources -- see URI list",
        301 => "Object moved permanently -- see URI list",
        302 => "Object moved temporarily -- see URI list",
        303 => "Object moved -- see Method and URL list",
        304 => "Document has not changed since given time",
        305 => "You must use proxy specified in Location to access this resource",
        307 => "Object moved temporarily -- see URI list",
        308 => "Object moved permanently -- see URI list",
        400 => "Bad request syntax or unsupported method",
        401 => "No permission -- see authorization schemes",
        402 => "No payment -- see charging schemes",
        403 => "Request forbidden -- authorization will not help",
        404 => "Nothing matches the given URI",
        405 => "Specified method is invalid for this resource",
        406 => "URI not available in preferred format",
        407 => "You must authenticate with this proxy before proceeding",
        408 => "Request timed out; try again later",
        409 => "Request conflict",
        410 => "URI no longer exists and has been permanently removed",
        411 => "Client must specify Content-Length",
        412 => "Precondition in headers is false",
        413 => "Entity is too large",
        414 => "URI is too long",
        415 => "Entity body in unsupported format",
        416 => "Cannot satisfy request range",
        417 => "Expect condition could not be satisfied",
        418 => "Server refuses to brew coffee because it is a teapot.",
        421 => "Server is not able to produce a response",
        428 => "The origin server requires the request to be conditional",
        429 => "The user has sent too many requests in a given amount of time (\"rate limiting\")",
        431 => {
            "The server is unwilling to process the request because its header fields are too large"
        }
        451 => {
            "The server is denying access to the resource as a consequence of a legal demand"
        }
        500 => "Server got itself in trouble",
        501 => "Server does not support this operation",
        502 => "Invalid responses from another server/proxy",
        503 => "The server cannot process the request due to a high load",
        504 => "The gateway server did not receive a timely response",
        505 => "Cannot fulfill request",
        511 => "The client needs to authenticate to gain network access",
        _ => status.canonical_reason().unwrap_or("Unknown Status"),
    }
}
