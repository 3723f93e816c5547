//! Error types for hublink
//!
//! This module defines the error hierarchy for the entire crate and the
//! classifier that maps an HTTP status plus a decoded response body onto it.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::api::Request;

/// Request/response context bound to an API error.
///
/// Carried for diagnostics only; control flow never inspects it.
#[derive(Debug, Clone)]
pub struct BoundContext {
    /// The request that produced the failure.
    pub request: Arc<Request>,
    /// HTTP status code of the response, 0 when the transport never got one.
    pub status: u16,
    /// Decoded JSON body, when the response carried one.
    pub body: Option<Value>,
    /// Raw response content.
    pub raw: String,
}

impl BoundContext {
    pub(crate) fn new(
        request: Arc<Request>,
        status: u16,
        body: Option<Value>,
        raw: &str,
    ) -> Box<Self> {
        Box::new(Self {
            request,
            status,
            body,
            raw: raw.to_string(),
        })
    }
}

/// The main error type for hublink
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Caller Errors
    // ============================================================================
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Not supported: {message}")]
    NotSupported { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ============================================================================
    // API Errors
    // ============================================================================
    /// Network-level failure; the transport produced no usable response.
    #[error("Request failed: {message}")]
    RequestFailed {
        message: String,
        context: Option<Box<BoundContext>>,
    },

    /// HTTP 400 with the server's own message when it sent one.
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        context: Box<BoundContext>,
    },

    /// HTTP 422 with an `errors` array in the body.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        message: String,
        context: Box<BoundContext>,
    },

    /// HTTP 404; the message carries the requesting URL.
    #[error("Unknown resource: {message}")]
    UnknownResource {
        message: String,
        context: Box<BoundContext>,
    },

    /// Synthesized when the remaining-rate-limit header reaches zero.
    #[error("{message}")]
    ApiLimitExceeded {
        message: String,
        context: Box<BoundContext>,
    },

    /// Any other status >= 300 that carried a `message` field.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        context: Box<BoundContext>,
    },

    // ============================================================================
    // Conversions
    // ============================================================================
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid-argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a not-supported error
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a request-failed error without a bound response
    pub fn request_failed(message: impl Into<String>) -> Self {
        Self::RequestFailed {
            message: message.into(),
            context: None,
        }
    }

    /// The request/response context bound to an API-family error, if any.
    pub fn context(&self) -> Option<&BoundContext> {
        match self {
            Error::RequestFailed { context, .. } => context.as_deref(),
            Error::BadRequest { context, .. }
            | Error::ValidationFailed { context, .. }
            | Error::UnknownResource { context, .. }
            | Error::ApiLimitExceeded { context, .. }
            | Error::Api { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Check if this error came from the API-error family
    pub fn is_api_error(&self) -> bool {
        matches!(
            self,
            Error::RequestFailed { .. }
                | Error::BadRequest { .. }
                | Error::ValidationFailed { .. }
                | Error::UnknownResource { .. }
                | Error::ApiLimitExceeded { .. }
                | Error::Api { .. }
        )
    }
}

/// Result type alias for hublink
pub type Result<T> = std::result::Result<T, Error>;

/// Shape of an error body as GitHub sends it.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<Vec<ValidationEntry>>,
}

/// One entry of a 422 `errors` array.
#[derive(Debug, Deserialize)]
struct ValidationEntry {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Classify a failed call into the API-error family.
///
/// Returns `None` when the status is in [200, 300) and content is present.
/// Classification happens once per failed call; callers never re-derive it.
pub(crate) fn classify(
    request: &Arc<Request>,
    status: u16,
    raw: &str,
    body: Option<&Value>,
) -> Option<Error> {
    if (200..300).contains(&status) {
        return None;
    }

    let context = || BoundContext::new(Arc::clone(request), status, body.cloned(), raw);

    let Some(body) = body else {
        return Some(Error::RequestFailed {
            message: format!("HTTP {status}"),
            context: Some(context()),
        });
    };

    let parsed: ErrorBody = serde_json::from_value(body.clone()).unwrap_or(ErrorBody {
        message: None,
        errors: None,
    });

    let error = match (status, parsed.message, parsed.errors) {
        (400, message, _) => Error::BadRequest {
            message: message.unwrap_or_else(|| raw.to_string()),
            context: context(),
        },
        (422, _, Some(entries)) => Error::ValidationFailed {
            message: validation_messages(&entries),
            context: context(),
        },
        (404, Some(message), _) => Error::UnknownResource {
            message: format!("{}: {}", message, request.url()),
            context: context(),
        },
        (_, Some(message), _) => Error::Api {
            status,
            message,
            context: context(),
        },
        _ => Error::RequestFailed {
            message: format!("HTTP {status}"),
            context: Some(context()),
        },
    };

    Some(error)
}

/// Build the combined message for a 422 `errors` array.
fn validation_messages(entries: &[ValidationEntry]) -> String {
    let mut messages = Vec::with_capacity(entries.len());
    for entry in entries {
        let field = entry.field.as_deref().unwrap_or("");
        let resource = entry.resource.as_deref().unwrap_or("");
        let message = match entry.code.as_deref() {
            Some("missing") => {
                let value = entry.value.as_ref().map(value_text).unwrap_or_default();
                format!("the {field} {value} does not exist for resource {resource}")
            }
            Some("missing_field") => format!("field {field} is missing for resource {resource}"),
            Some("invalid") => format!("field {field} is invalid for resource {resource}"),
            Some("already_exists") => {
                format!("field {field} already exists for resource {resource}")
            }
            _ => entry.message.clone().unwrap_or_default(),
        };
        messages.push(message);
    }
    messages.join(", ")
}

/// Render a JSON value the way it should read inside an error message.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Body, Request};
    use reqwest::Method;
    use serde_json::json;

    fn request() -> Arc<Request> {
        Arc::new(Request::new(
            "https://api.github.com/repos/foo/bar".parse().unwrap(),
            Method::GET,
            Body::Empty,
            Vec::new(),
        ))
    }

    #[test]
    fn test_error_display() {
        let err = Error::invalid_argument("bad profile id");
        assert_eq!(err.to_string(), "Invalid argument: bad profile id");

        let err = Error::config("missing app secret");
        assert_eq!(err.to_string(), "Configuration error: missing app secret");

        let err = Error::request_failed("connection reset");
        assert_eq!(err.to_string(), "Request failed: connection reset");
    }

    #[test]
    fn test_classify_ok_is_none() {
        let body = json!({"id": 1});
        assert!(classify(&request(), 200, "{\"id\":1}", Some(&body)).is_none());
    }

    #[test]
    fn test_classify_no_content_success_is_none() {
        assert!(classify(&request(), 204, "", None).is_none());
    }

    #[test]
    fn test_classify_bad_request() {
        let body = json!({"message": "Problems parsing JSON"});
        let err = classify(&request(), 400, "...", Some(&body)).unwrap();
        match err {
            Error::BadRequest { message, context } => {
                assert_eq!(message, "Problems parsing JSON");
                assert_eq!(context.status, 400);
            }
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_validation_failed() {
        let body = json!({
            "message": "Validation Failed",
            "errors": [
                {"code": "missing", "field": "name", "value": "x", "resource": "repo"},
                {"code": "missing_field", "field": "title", "resource": "issue"},
                {"code": "custom", "message": "spooky failure"}
            ]
        });
        let err = classify(&request(), 422, "...", Some(&body)).unwrap();
        match err {
            Error::ValidationFailed { message, .. } => {
                assert!(message.contains("name"));
                assert!(message.contains("x"));
                assert!(message.contains("repo"));
                assert!(message.contains("field title is missing for resource issue"));
                assert!(message.contains("spooky failure"));
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_unknown_resource_carries_url() {
        let body = json!({"message": "Not Found"});
        let err = classify(&request(), 404, "...", Some(&body)).unwrap();
        match err {
            Error::UnknownResource { message, .. } => {
                assert!(message.starts_with("Not Found: "));
                assert!(message.contains("https://api.github.com/repos/foo/bar"));
            }
            other => panic!("expected UnknownResource, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_generic_api_error() {
        let body = json!({"message": "Server Error"});
        let err = classify(&request(), 502, "...", Some(&body)).unwrap();
        match err {
            Error::Api {
                status, message, ..
            } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Server Error");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_without_message_falls_back() {
        let body = json!({"documentation_url": "https://docs.github.com"});
        let err = classify(&request(), 500, "...", Some(&body)).unwrap();
        assert!(matches!(err, Error::RequestFailed { .. }));
    }

    #[test]
    fn test_is_api_error() {
        assert!(Error::request_failed("x").is_api_error());
        assert!(!Error::invalid_argument("x").is_api_error());
        assert!(!Error::config("x").is_api_error());
    }
}
