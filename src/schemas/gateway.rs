//! API Gateway request fragments, responses and authorizer policies.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::StatusCode;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

pub const ROUTE_ARN_PATTERN: &str = r"^arn:aws:execute-api:(?P<region>[a-zA-Z0-9-]+):(?P<account_id>\d+):(?P<api_id>[a-zA-Z0-9]+)/(?P<stage>[^/]+)/(?P<method>[A-Z]+)/(?P<resource_path>.*)$";

static ROUTE_ARN: Lazy<Regex> = Lazy::new(|| Regex::new(ROUTE_ARN_PATTERN).expect("static regex"));

// ============================================================================
// Request fragments
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEventPathParameters<P> {
    #[serde(rename = "pathParameters")]
    pub path_parameters: P,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEventQueryParameters<P> {
    #[serde(rename = "queryStringParameters", default)]
    pub query_string_parameters: Option<P>,
}

// ============================================================================
// Responses
// ============================================================================

/// RFC 7807 problem details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub status: u16,
    pub title: String,
    pub detail: String,
    pub extensions: Value,
}

/// The proxy-integration response shape API Gateway expects back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewaySerializedResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayBody {
    /// JSON text of a serialized model.
    Json(String),
    Binary(Vec<u8>),
    Empty,
}

/// A handler-friendly gateway response; serializes to [`ApiGatewaySerializedResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiGatewayResponse {
    pub status_code: Option<StatusCode>,
    pub headers: Option<BTreeMap<String, String>>,
    pub body: GatewayBody,
}

impl ApiGatewayResponse {
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized to JSON.
    pub fn json<T: Serialize + ?Sized>(body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::with_body(GatewayBody::Json(serde_json::to_string(body)?)))
    }

    #[must_use]
    pub fn binary(body: impl Into<Vec<u8>>) -> Self {
        Self::with_body(GatewayBody::Binary(body.into()))
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::with_body(GatewayBody::Empty)
    }

    fn with_body(body: GatewayBody) -> Self {
        Self {
            status_code: None,
            headers: None,
            body,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status_code: StatusCode) -> Self {
        self.status_code = Some(status_code);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Applies the body-dependent defaults; explicit headers override them.
    #[must_use]
    pub fn serialized(&self) -> ApiGatewaySerializedResponse {
        let (default_status, content_type, body, is_base64_encoded) = match &self.body {
            GatewayBody::Json(text) => (StatusCode::OK, Some(JSON_CONTENT_TYPE), Some(text.clone()), false),
            GatewayBody::Binary(bytes) => (
                StatusCode::OK,
                Some(BINARY_CONTENT_TYPE),
                Some(STANDARD.encode(bytes)),
                true,
            ),
            GatewayBody::Empty => (StatusCode::NO_CONTENT, None, None, false),
        };

        let mut headers = BTreeMap::new();
        if let Some(content_type) = content_type {
            headers.insert("Content-Type".to_string(), content_type.to_string());
        }
        if let Some(extra) = &self.headers {
            headers.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        ApiGatewaySerializedResponse {
            status_code: self.status_code.unwrap_or(default_status).as_u16(),
            headers,
            body,
            is_base64_encoded,
        }
    }
}

impl Serialize for ApiGatewayResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.serialized().serialize(serializer)
    }
}

// ============================================================================
// Route ARNs
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid Route ARN")]
pub struct RouteArnError;

/// The `methodArn`/`routeArn` of an API Gateway invocation.
///
/// Serializes as the ARN string; deserializes from the string or from an
/// object holding the individual parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteArn {
    pub region: String,
    pub account_id: String,
    pub api_id: String,
    pub stage: String,
    pub method: String,
    pub resource_path: String,
}

impl FromStr for RouteArn {
    type Err = RouteArnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = ROUTE_ARN.captures(s).ok_or(RouteArnError)?;
        let field = |name: &str| caps.name(name).map_or_else(String::new, |m| m.as_str().to_string());
        Ok(Self {
            region: field("region"),
            account_id: field("account_id"),
            api_id: field("api_id"),
            stage: field("stage"),
            method: field("method"),
            resource_path: field("resource_path"),
        })
    }
}

impl fmt::Display for RouteArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:aws:execute-api:{}:{}:{}/{}/{}/{}",
            self.region, self.account_id, self.api_id, self.stage, self.method, self.resource_path
        )
    }
}

impl Serialize for RouteArn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
struct RouteArnParts {
    region: String,
    account_id: String,
    api_id: String,
    stage: String,
    method: String,
    resource_path: String,
}

impl<'de> Deserialize<'de> for RouteArn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => s.parse().map_err(D::Error::custom),
            value @ Value::Object(_) => {
                let parts = RouteArnParts::deserialize(value).map_err(D::Error::custom)?;
                Ok(Self {
                    region: parts.region,
                    account_id: parts.account_id,
                    api_id: parts.api_id,
                    stage: parts.stage,
                    method: parts.method,
                    resource_path: parts.resource_path,
                })
            }
            _ => Err(D::Error::custom(RouteArnError)),
        }
    }
}

// ============================================================================
// Lambda authorizer responses
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionEnum {
    #[serde(rename = "execute-api:Invoke")]
    ApiInvoke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectEnum {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizerPolicyStatement {
    #[serde(rename = "Action")]
    pub action: ActionEnum,
    #[serde(rename = "Effect")]
    pub effect: EffectEnum,
    #[serde(rename = "Resource")]
    pub resource: String,
}

pub const POLICY_VERSION: &str = "2012-10-17";

/// IAM policy with exactly one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizerPolicyDocument {
    #[serde(rename = "Version", deserialize_with = "policy_version")]
    pub version: String,
    #[serde(rename = "Statement")]
    pub statement: [AuthorizerPolicyStatement; 1],
}

fn policy_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let version = String::deserialize(deserializer)?;
    if version == POLICY_VERSION {
        Ok(version)
    } else {
        Err(D::Error::custom(format!(
            "unsupported policy version {version:?}, expected {POLICY_VERSION:?}"
        )))
    }
}

impl AuthorizerPolicyDocument {
    #[must_use]
    pub fn new(statement: AuthorizerPolicyStatement) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: [statement],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizerResponse {
    #[serde(rename = "principalId")]
    pub principal_id: String,
    #[serde(rename = "policyDocument")]
    pub policy_document: AuthorizerPolicyDocument,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl AuthorizerResponse {
    /// A single-statement `execute-api:Invoke` decision for `route`.
    #[must_use]
    pub fn invoke(principal_id: impl Into<String>, effect: EffectEnum, route: &RouteArn) -> Self {
        Self {
            principal_id: principal_id.into(),
            policy_document: AuthorizerPolicyDocument::new(AuthorizerPolicyStatement {
                action: ActionEnum::ApiInvoke,
                effect,
                resource: route.to_string(),
            }),
            context: BTreeMap::new(),
        }
    }
}
