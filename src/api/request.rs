//! Outbound request value object

use std::collections::HashMap;

use reqwest::Method;
use serde_json::Value;
use url::Url;

/// Pseudo-header a transport may record to carry the HTTP version of the
/// request line. It describes the wire exchange rather than the request, so
/// [`Request::copy_with_url`] drops it when deriving follow-up requests.
pub const HTTP_VERSION_HEADER: &str = "http-version";

/// Request body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Pre-encoded body sent verbatim.
    Raw(String),
    /// Structured body, JSON-encoded for transport.
    Json(Value),
    /// Form fields; values that are not plain strings are JSON-serialized
    /// before being considered for transport.
    Form(Vec<(String, Value)>),
}

impl Body {
    /// Check if there is nothing to send
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Encode form fields for transport.
    ///
    /// String values pass through untouched; everything else becomes its
    /// JSON encoding, so a structured value round-trips through
    /// `serde_json::from_str`.
    pub fn encode_form(&self) -> Vec<(String, String)> {
        match self {
            Body::Form(fields) => fields
                .iter()
                .map(|(name, value)| {
                    let encoded = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (name.clone(), encoded)
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// An outbound API call.
///
/// Immutable after construction except header mutation via [`set_header`];
/// the method is normalized to uppercase at construction and headers keep
/// their insertion order for serialization.
///
/// [`set_header`]: Request::set_header
#[derive(Debug, Clone)]
pub struct Request {
    url: Url,
    method: Method,
    body: Body,
    headers: Vec<(String, String)>,
}

impl Request {
    /// Create a new request
    pub fn new(url: Url, method: Method, body: Body, headers: Vec<(String, String)>) -> Self {
        Self {
            url,
            method: normalize_method(method),
            body,
            headers,
        }
    }

    /// Create a GET request with no body or headers
    pub fn get(url: Url) -> Self {
        Self::new(url, Method::GET, Body::Empty, Vec::new())
    }

    /// The target URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The HTTP method, always uppercase
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request body
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Headers in insertion order
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing an existing one with the same name
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            entry.1 = value;
        } else {
            self.headers.push((name, value));
        }
        self
    }

    /// Replace the request body
    pub fn set_body(&mut self, body: Body) -> &mut Self {
        self.body = body;
        self
    }

    /// Query parameters derived from the URL
    pub fn params(&self) -> HashMap<String, String> {
        self.url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Check if this is a GET request
    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// A request counts as paginated when it is a GET carrying `page` or
    /// `per_page` query parameters.
    pub fn is_paginated(&self) -> bool {
        if !self.is_get() {
            return false;
        }
        let params = self.params();
        params.contains_key("page") || params.contains_key("per_page")
    }

    /// Copy this request with a replaced URL, keeping method, body and
    /// headers. Used for following pagination links; the transport's
    /// HTTP-version pseudo-header is dropped.
    pub fn copy_with_url(&self, url: Url) -> Self {
        let headers = self
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case(HTTP_VERSION_HEADER))
            .cloned()
            .collect();
        Self {
            url,
            method: self.method.clone(),
            body: self.body.clone(),
            headers,
        }
    }
}

/// Uppercase the method name; the standard `Method` constants already are.
fn normalize_method(method: Method) -> Method {
    let name = method.as_str();
    let upper = name.to_ascii_uppercase();
    if upper == name {
        return method;
    }
    Method::from_bytes(upper.as_bytes()).unwrap_or(method)
}
