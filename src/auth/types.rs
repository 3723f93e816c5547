//! Incoming-request snapshot

use std::collections::HashMap;

use url::Url;

/// Snapshot of the HTTP request the integrator is currently serving.
///
/// The OAuth redirect delivers `code` and `state` on this request, and the
/// current URL doubles as the default `redirect_uri` for the token exchange.
/// Query parameters are derived from the URL; post parameters are supplied
/// by the integrator when the redirect arrives as a form submission.
#[derive(Debug, Clone)]
pub struct CurrentRequest {
    url: Url,
    query: HashMap<String, String>,
    post: HashMap<String, String>,
}

impl CurrentRequest {
    /// Snapshot a request from its URL
    pub fn new(url: Url) -> Self {
        let query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self {
            url,
            query,
            post: HashMap::new(),
        }
    }

    /// Attach post parameters
    pub fn with_post(mut self, post: HashMap<String, String>) -> Self {
        self.post = post;
        self
    }

    /// The current URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Read a parameter, post parameters shadowing query parameters.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.post
            .get(key)
            .or_else(|| self.query.get(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}
