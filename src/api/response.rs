//! Inbound response value object

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::api::Request;
use crate::error::{classify, BoundContext, Error, Result};

/// Matches one relation of a `Link` header:
/// `<https://api.github.com/user/repos?page=2>; rel="next"`
static LINK_RELATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<(?P<link>[^>]+)>;\s*rel="(?P<rel>\w+)""#).expect("link regex"));

/// Fallback rate limit when the API does not announce one.
const DEFAULT_RATE_LIMIT: u64 = 5000;

/// A decoded inbound result tied to the request that produced it.
#[derive(Debug, Clone)]
pub struct Response {
    request: Arc<Request>,
    content: String,
    status: u16,
    headers: Vec<(String, String)>,
    info: HashMap<String, String>,
    decoded: OnceCell<Value>,
}

impl Response {
    /// Create a new response
    pub fn new(
        request: Arc<Request>,
        content: impl Into<String>,
        status: u16,
        headers: Vec<(String, String)>,
        info: HashMap<String, String>,
    ) -> Self {
        Self {
            request,
            content: content.into(),
            status,
            headers,
            info,
            decoded: OnceCell::new(),
        }
    }

    /// The request that produced this response
    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    /// Raw response content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response headers, verbatim from the transport
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

    /// Debug/timing info recorded by the transport
    pub fn info(&self) -> &HashMap<String, String> {
        &self.info
    }

    /// Check if the status is in [200, 300)
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the Content-Type header claims JSON
    pub fn is_json(&self) -> bool {
        self.header("Content-Type")
            .map_or(false, |v| v.trim_start().starts_with("application/json"))
    }

    /// Decode the body as JSON, parsing once and memoizing.
    ///
    /// When the parse fails while the Content-Type claims JSON, the failure
    /// is classified as an API error bound to this response.
    pub fn json(&self) -> Result<&Value> {
        self.decoded.get_or_try_init(|| {
            serde_json::from_str(&self.content).map_err(|err| {
                if self.is_json() {
                    Error::Api {
                        status: self.status,
                        message: format!("{err}\n\n{}", self.content),
                        context: BoundContext::new(
                            Arc::clone(&self.request),
                            self.status,
                            None,
                            &self.content,
                        ),
                    }
                } else {
                    Error::Json(err)
                }
            })
        })
    }

    /// A response counts as paginated when its request was, or when a GET
    /// came back with a `Link` header.
    pub fn is_paginated(&self) -> bool {
        self.request.is_paginated() || (self.request.is_get() && self.header("Link").is_some())
    }

    /// All relations of the `Link` header as a relation-to-URL map.
    pub fn pagination_links(&self) -> HashMap<String, String> {
        let Some(header) = self.header("Link") else {
            return HashMap::new();
        };
        LINK_RELATION
            .captures_iter(header)
            .map(|caps| (caps["rel"].to_ascii_lowercase(), caps["link"].to_string()))
            .collect()
    }

    /// The URL for one `Link` relation, or `None` when absent.
    pub fn pagination_link(&self, rel: &str) -> Option<Url> {
        let header = self.header("Link")?;
        for caps in LINK_RELATION.captures_iter(header) {
            if caps["rel"].eq_ignore_ascii_case(rel) {
                return Url::parse(&caps["link"]).ok();
            }
        }
        None
    }

    /// Check if the rate-limit headers still allow requests.
    ///
    /// Absent headers count as remaining.
    pub fn has_remaining_rate_limit(&self) -> bool {
        self.header("X-RateLimit-Remaining")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map_or(true, |remaining| remaining > 0)
    }

    /// The announced rate limit, defaulting to 5000.
    pub fn rate_limit(&self) -> u64 {
        self.header("X-RateLimit-Limit")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT)
    }

    /// Classify this response into an API error, or `None` when it is fine.
    pub fn to_error(&self) -> Option<Error> {
        let body = if self.is_json() {
            serde_json::from_str(&self.content).ok()
        } else {
            None
        };
        classify(&self.request, self.status, &self.content, body.as_ref())
    }
}
