//! Client configuration and URL building

use serde_json::Value;
use url::Url;

use crate::error::Result;

/// The two base-URL families of the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Realm {
    /// Authorization endpoints (`authorize`, `access_token`)
    OAuth,
    /// REST resource endpoints
    Api,
}

/// Application credentials and endpoint configuration.
///
/// Immutable after construction except for appending permissions.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// OAuth application client id
    pub app_id: String,
    /// OAuth application client secret
    pub app_secret: String,
    /// Scopes requested on the authorization redirect
    pub permissions: Vec<String>,
    oauth_url: Url,
    api_url: Url,
    provider_host: String,
}

impl Configuration {
    /// Create a configuration for the public GitHub endpoints
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            permissions: Vec::new(),
            oauth_url: Url::parse("https://github.com/login/oauth/").expect("oauth base url"),
            api_url: Url::parse("https://api.github.com/").expect("api base url"),
            provider_host: "github.com".to_string(),
        }
    }

    /// Set the requested scopes
    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Append one scope
    pub fn add_permission(&mut self, permission: impl Into<String>) -> &mut Self {
        self.permissions.push(permission.into());
        self
    }

    /// Replace the realm base URLs, e.g. for an enterprise install.
    ///
    /// Base URL paths are normalized to end with `/` so joined paths append
    /// instead of replacing the last segment.
    pub fn with_domains(mut self, oauth: Url, api: Url) -> Self {
        self.provider_host = api.host_str().unwrap_or("github.com").to_string();
        self.oauth_url = ensure_trailing_slash(oauth);
        self.api_url = ensure_trailing_slash(api);
        self
    }

    /// Override the host treated as the provider's own domain
    pub fn with_provider_host(mut self, host: impl Into<String>) -> Self {
        self.provider_host = host.into();
        self
    }

    /// Base URL of a realm
    pub fn base_url(&self, realm: Realm) -> &Url {
        match realm {
            Realm::OAuth => &self.oauth_url,
            Realm::Api => &self.api_url,
        }
    }

    /// Build the URL for a realm, path and query parameters.
    ///
    /// A path that is already an absolute URL under the provider's own
    /// domain passes verbatim; anything else is appended to the realm base
    /// URL with its leading slash stripped. Structured parameter values are
    /// JSON-encoded into the query string.
    pub fn create_url(&self, realm: Realm, path: &str, params: &[(&str, Value)]) -> Result<Url> {
        let mut url = match self.provider_url(path) {
            Some(absolute) => absolute,
            None => self.base_url(realm).join(path.trim_start_matches('/'))?,
        };

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                match value {
                    Value::String(s) => pairs.append_pair(key, s),
                    other => pairs.append_pair(key, &other.to_string()),
                };
            }
        }

        Ok(url)
    }

    /// Parse `path` as an absolute URL under the provider domain.
    fn provider_url(&self, path: &str) -> Option<Url> {
        let trimmed = path.trim();
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return None;
        }
        let url = Url::parse(trimmed).ok()?;
        let host = url.host_str()?;
        let suffix = format!(".{}", self.provider_host);
        (host == self.provider_host || host.ends_with(&suffix)).then_some(url)
    }
}

fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
