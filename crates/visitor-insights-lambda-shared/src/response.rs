//! API Gateway proxy response envelope.
//!
//! Every handler path funnels through [`ProxyResponse::json`], which attaches the
//! same content type and CORS headers regardless of outcome.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::error;

/// Request headers advertised to browsers in CORS preflight responses.
pub const CORS_ALLOW_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";

/// Methods advertised in CORS responses. The API is read-only.
pub const CORS_ALLOW_METHODS: &str = "GET,OPTIONS";

/// Standard headers included in every response.
pub fn cors_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        (
            "Access-Control-Allow-Headers".to_string(),
            CORS_ALLOW_HEADERS.to_string(),
        ),
        (
            "Access-Control-Allow-Methods".to_string(),
            CORS_ALLOW_METHODS.to_string(),
        ),
    ])
}

/// Response shape expected by the API Gateway Lambda proxy integration.
///
/// # Example
///
/// ```
/// use visitor_insights_lambda_shared::ProxyResponse;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Count {
///     total: u64,
/// }
///
/// let response = ProxyResponse::ok(&Count { total: 3 });
/// assert_eq!(response.status_code, 200);
/// assert_eq!(response.body, r#"{"total":3}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    /// HTTP status code.
    pub status_code: u16,

    /// Response headers, always a superset of [`cors_headers`].
    pub headers: BTreeMap<String, String>,

    /// JSON-encoded response body.
    pub body: String,
}

impl ProxyResponse {
    /// Build a response with the standard headers and a JSON-encoded payload.
    pub fn json<T: Serialize + ?Sized>(status_code: u16, payload: &T) -> Self {
        let body = serde_json::to_string(payload).unwrap_or_else(|e| {
            error!(error = %e, "failed to serialize response payload");
            "{}".to_string()
        });

        Self {
            status_code,
            headers: cors_headers(),
            body,
        }
    }

    /// 200 OK.
    pub fn ok<T: Serialize + ?Sized>(payload: &T) -> Self {
        Self::json(200, payload)
    }

    /// 400 Bad Request.
    pub fn bad_request(body: &ErrorBody) -> Self {
        Self::json(400, body)
    }

    /// 500 Internal Server Error.
    pub fn internal_error(body: &ErrorBody) -> Self {
        Self::json(500, body)
    }

    /// Decode the body back into JSON. Mostly useful in tests.
    pub fn body_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }
}

/// Error payload shared by every failing path.
///
/// Optional members are omitted from the serialized body when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Short, human-readable summary of the failure.
    pub error: String,

    /// Occurrence-specific explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Accepted `action` values, present on validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_actions: Option<Vec<String>>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            valid_actions: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_valid_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_actions = Some(actions.into_iter().map(Into::into).collect());
        self
    }
}
