//! The client proper: OAuth engine and generic dispatch

use std::sync::{Arc, RwLock};

use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::api::{Body, Request, Response};
use crate::auth::{CurrentRequest, SessionStorage, SessionStore};
use crate::client::{Configuration, Profile, Realm};
use crate::error::{Error, Result};
use crate::http::HttpTransport;
use crate::pagination::Paginator;

/// Decoded result of a generic API call.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// The body parsed as JSON (object keys keep their wire order)
    Json(Value),
    /// The body did not parse; raw text passed through
    Text(String),
}

impl Content {
    /// Borrow the JSON value, if this is one
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Content::Json(value) => Some(value),
            Content::Text(_) => None,
        }
    }

    /// Take the JSON value, if this is one
    pub fn into_json(self) -> Option<Value> {
        match self {
            Content::Json(value) => Some(value),
            Content::Text(_) => None,
        }
    }

    /// Borrow the raw text, if the body did not parse as JSON
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Json(_) => None,
            Content::Text(text) => Some(text),
        }
    }
}

/// GitHub API client bound to one logical session.
///
/// The access token and connected user are resolved at most once per
/// instance; `set_access_token` and `destroy_session` reset that memo.
/// A failed resolution is not cached, so authentication may succeed on a
/// later call within the same instance.
pub struct Client {
    config: Configuration,
    session: SessionStorage,
    current: CurrentRequest,
    transport: Arc<dyn HttpTransport>,
    access_token: RwLock<Option<String>>,
    user: RwLock<Option<u64>>,
}

impl Client {
    /// Create a client for the request currently being served.
    pub fn new(
        config: Configuration,
        current: CurrentRequest,
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            config,
            session: SessionStorage::new(store),
            current,
            transport,
            access_token: RwLock::new(None),
            user: RwLock::new(None),
        }
    }

    /// The configuration
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// The session storage
    pub fn session(&self) -> &SessionStorage {
        &self.session
    }

    /// URL of the request currently being served
    pub fn current_url(&self) -> &Url {
        self.current.url()
    }

    /// The transport this client dispatches through
    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    // ============================================================================
    // Generic dispatch
    // ============================================================================

    /// Call an API-realm endpoint and decode the result.
    ///
    /// The path selects the API realm by convention (`/user`,
    /// `/repos/{owner}/{repo}`, ...). When the body parses as JSON the
    /// decoded structure comes back as [`Content::Json`], otherwise the raw
    /// text as [`Content::Text`]. Classified transport errors propagate
    /// unchanged; there is no retry here.
    pub async fn api(
        &self,
        path: &str,
        method: Method,
        params: &[(&str, Value)],
        body: Body,
        headers: Vec<(String, String)>,
    ) -> Result<Content> {
        let response = self.api_request(path, method, params, body, headers).await?;
        Ok(decode_content(response.content()))
    }

    /// GET an API-realm endpoint
    pub async fn get(&self, path: &str, params: &[(&str, Value)]) -> Result<Content> {
        self.api(path, Method::GET, params, Body::Empty, Vec::new())
            .await
    }

    /// POST to an API-realm endpoint
    pub async fn post(&self, path: &str, body: Body) -> Result<Content> {
        self.api(path, Method::POST, &[], body, Vec::new()).await
    }

    /// Dispatch an API-realm call and keep the full [`Response`].
    pub async fn api_request(
        &self,
        path: &str,
        method: Method,
        params: &[(&str, Value)],
        body: Body,
        headers: Vec<(String, String)>,
    ) -> Result<Response> {
        let url = self.config.create_url(Realm::Api, path, params)?;
        let mut request = Request::new(url, method, body, headers);

        if let Some(token) = self.get_access_token().await {
            if token.chars().any(char::is_control) {
                return Err(Error::invalid_argument(
                    "access token contains control characters",
                ));
            }
            request.set_header("Authorization", format!("token {token}"));
        }

        self.transport.send(&request).await
    }

    /// GET a paginated listing and wrap it for lazy iteration.
    pub async fn paginate(&self, path: &str, params: &[(&str, Value)]) -> Result<Paginator> {
        let response = self
            .api_request(path, Method::GET, params, Body::Empty, Vec::new())
            .await?;
        Paginator::new(Arc::clone(&self.transport), response)
    }

    /// Reader over a user profile; `None` means the connected user.
    pub fn profile(&self, profile_id: Option<&str>) -> Result<Profile<'_>> {
        Profile::new(self, profile_id)
    }

    // ============================================================================
    // OAuth engine
    // ============================================================================

    /// Set the access token directly, e.g. when obtained by other means.
    pub fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write().expect("token memo") = Some(token.into());
    }

    /// Determine the access token to use for API calls.
    ///
    /// The first successful resolution is cached for the lifetime of this
    /// instance; subsequent calls return it without recomputation.
    pub async fn get_access_token(&self) -> Option<String> {
        if let Some(token) = self.access_token.read().expect("token memo").clone() {
            return Some(token);
        }

        let token = self.get_user_access_token().await;
        if let Some(token) = &token {
            *self.access_token.write().expect("token memo") = Some(token.clone());
        }
        token
    }

    /// Resolve a user access token from the current request or the session.
    ///
    /// A code presented on this request is exchanged when it is fresh; a
    /// bogus code invalidates the entire session. With no code in play the
    /// persisted token is the answer, which may be nothing.
    async fn get_user_access_token(&self) -> Option<String> {
        if let Some(code) = self.get_code() {
            if self.session.code().as_deref() != Some(code.as_str()) {
                if let Some(token) = self.get_access_token_from_code(&code, None).await {
                    self.session.set_code(&code);
                    self.session.set_access_token(&token);
                    return Some(token);
                }

                // code was bogus, so everything based on it is invalid
                debug!("authorization code exchange failed, clearing session");
                self.session.clear_all();
                return None;
            }
        }

        // fall back to whatever the persistent store has; nothing explicit
        // was presented to shadow it, or the code matched what is stored
        self.session.access_token()
    }

    /// Accept the authorization code from the current request.
    ///
    /// The code counts only when the echoed `state` matches the CSRF state
    /// in the session; acceptance consumes the stored state.
    fn get_code(&self) -> Option<String> {
        let state = self.current.param("state")?;
        let code = self.current.param("code")?;

        if self.session.state().as_deref() == Some(state) {
            self.session.set_state(None); // CSRF state has done its job
            return Some(code.to_string());
        }

        debug!("authorization code ignored, CSRF state mismatch");
        None
    }

    /// Exchange an authorization code for an access token.
    ///
    /// Any transport or decoding failure reads as "no token" here; the user
    /// may simply have revoked the authorization.
    async fn get_access_token_from_code(
        &self,
        code: &str,
        redirect_uri: Option<&Url>,
    ) -> Option<String> {
        if code.is_empty() {
            return None;
        }

        let redirect = redirect_uri.unwrap_or_else(|| self.current.url());
        let url = self
            .config
            .create_url(
                Realm::OAuth,
                "access_token",
                &[
                    ("client_id", Value::String(self.config.app_id.clone())),
                    ("client_secret", Value::String(self.config.app_secret.clone())),
                    ("code", Value::String(code.to_string())),
                    ("redirect_uri", Value::String(redirect.to_string())),
                ],
            )
            .ok()?;

        let mut request = Request::get(url);
        request.set_header("Accept", "application/json");

        let response = match self.transport.send(&request).await {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %err, "access token exchange failed");
                return None;
            }
        };

        let decoded: Value = serde_json::from_str(response.content()).ok()?;
        decoded
            .get("access_token")
            .and_then(Value::as_str)
            .map(String::from)
    }

    /// The id of the connected user, or 0 when nobody is connected.
    pub async fn get_user(&self) -> u64 {
        if let Some(user) = *self.user.read().expect("user memo") {
            return user;
        }

        let user = self.user_from_available_data().await;
        *self.user.write().expect("user memo") = Some(user);
        user
    }

    /// Derive the connected user from the session or the API.
    async fn user_from_available_data(&self) -> u64 {
        let mut user = self.session.user_id().unwrap_or(0);

        // re-derive through the API when a token is resolvable and the
        // cached user does not belong to it
        if let Some(token) = self.get_access_token().await {
            let cached_matches =
                user != 0 && self.session.access_token().as_deref() == Some(token.as_str());
            if !cached_matches {
                user = self.user_from_access_token().await;
                if user == 0 {
                    self.session.clear_all();
                } else {
                    self.session.set_user_id(user);
                }
            }
        }

        user
    }

    /// Ask the API who the access token belongs to.
    async fn user_from_access_token(&self) -> u64 {
        match self.get("/user", &[]).await {
            Ok(Content::Json(value)) => value.get("id").and_then(Value::as_u64).unwrap_or(0),
            Ok(Content::Text(_)) => 0,
            Err(err) => {
                debug!(error = %err, "could not resolve user from access token");
                0
            }
        }
    }

    /// Build the authorization redirect URL and arm the CSRF state.
    ///
    /// `scope` defaults to the configured permissions; the current URL is
    /// the default `redirect_uri`.
    pub fn authorization_url(
        &self,
        redirect_uri: Option<&Url>,
        scope: Option<&[String]>,
    ) -> Result<Url> {
        let state = self.session.establish_csrf_token_state();
        let redirect = redirect_uri.unwrap_or_else(|| self.current.url());
        let scope = scope
            .map(|s| s.join(","))
            .unwrap_or_else(|| self.config.permissions.join(","));

        self.config.create_url(
            Realm::OAuth,
            "authorize",
            &[
                ("client_id", Value::String(self.config.app_id.clone())),
                ("redirect_uri", Value::String(redirect.to_string())),
                ("state", Value::String(state)),
                ("scope", Value::String(scope)),
            ],
        )
    }

    /// Log out: forget the instance memos and wipe the session store.
    pub fn destroy_session(&self) {
        *self.access_token.write().expect("token memo") = None;
        *self.user.write().expect("user memo") = None;
        self.session.clear_all();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("app_id", &self.config.app_id)
            .field("current_url", &self.current.url().as_str())
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Decode a response body as JSON, falling back to the raw text.
fn decode_content(content: &str) -> Content {
    match serde_json::from_str::<Value>(content) {
        Ok(value) => Content::Json(value),
        Err(_) => Content::Text(content.to_string()),
    }
}
