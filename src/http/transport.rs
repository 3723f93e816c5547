//! Reqwest-backed transport implementation

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::api::{Body, Request, Response};
use crate::error::{BoundContext, Error, Result};
use crate::http::TransportObserver;

/// Capability for dispatching a [`Request`] and producing a [`Response`].
///
/// Implementations must return a classified error on any non-2xx status or
/// transport failure, and must attach response headers (including `Link`,
/// `X-RateLimit-Remaining` and `X-RateLimit-Limit`) verbatim.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Dispatch the request, blocking the caller until the exchange ends.
    async fn send(&self, request: &Request) -> Result<Response>;
}

/// Configuration for the reqwest transport
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
    /// Default headers merged under per-request headers
    pub default_headers: Vec<(String, String)>,
    /// Whether identical requests are answered from the memory cache
    pub use_memory_cache: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: format!("hublink/{}", env!("CARGO_PKG_VERSION")),
            default_headers: vec![(
                "Accept".to_string(),
                "application/vnd.github.v3+json".to_string(),
            )],
            use_memory_cache: true,
        }
    }
}

impl TransportConfig {
    /// Create a new config builder
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }
}

/// Builder for transport config
#[derive(Default)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl TransportConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Add a default header, replacing an existing one with the same name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self
            .config
            .default_headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            entry.1 = value;
        } else {
            self.config.default_headers.push((name, value));
        }
        self
    }

    /// Enable or disable the memory cache
    pub fn memory_cache(mut self, enabled: bool) -> Self {
        self.config.use_memory_cache = enabled;
        self
    }

    /// Build the config
    pub fn build(self) -> TransportConfig {
        self.config
    }
}

/// Production transport built on `reqwest`.
///
/// Successful responses are memoized per instance, keyed by a fingerprint of
/// the full request, so repeated identical calls spend the API limit once.
/// The integrator decides when that memo must be invalidated.
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: TransportConfig,
    observers: Mutex<Vec<Arc<dyn TransportObserver>>>,
    memory_cache: Mutex<HashMap<u64, Response>>,
    cache_enabled: AtomicBool,
}

impl ReqwestTransport {
    /// Create a transport with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(TransportConfig::default())
    }

    /// Create a transport with custom configuration
    pub fn with_config(config: TransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            cache_enabled: AtomicBool::new(config.use_memory_cache),
            config,
            observers: Mutex::new(Vec::new()),
            memory_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Register an observer; observers fire in registration order.
    pub fn add_observer(&self, observer: Arc<dyn TransportObserver>) {
        self.observers.lock().expect("observer lock").push(observer);
    }

    /// Enable or disable the memory cache. Disabling also clears it.
    pub fn use_memory_cache(&self, enabled: bool) {
        self.cache_enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.clear_memory_cache();
        }
    }

    /// Drop all memoized responses.
    pub fn clear_memory_cache(&self) {
        self.memory_cache.lock().expect("cache lock").clear();
    }

    fn cached(&self, fingerprint: u64) -> Option<Response> {
        if !self.cache_enabled.load(Ordering::SeqCst) {
            return None;
        }
        self.memory_cache
            .lock()
            .expect("cache lock")
            .get(&fingerprint)
            .cloned()
    }

    fn remember(&self, fingerprint: u64, response: &Response) {
        if self.cache_enabled.load(Ordering::SeqCst) {
            self.memory_cache
                .lock()
                .expect("cache lock")
                .insert(fingerprint, response.clone());
        }
    }

    fn notify_request(&self, request: &Request) {
        for observer in self.observers.lock().expect("observer lock").iter() {
            observer.on_request(request);
        }
    }

    fn notify_success(&self, response: &Response) {
        for observer in self.observers.lock().expect("observer lock").iter() {
            observer.on_success(response);
        }
    }

    fn notify_error(&self, error: &Error) {
        for observer in self.observers.lock().expect("observer lock").iter() {
            observer.on_error(error);
        }
    }

    fn build_request(&self, request: &Request) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone());

        // transport defaults first, then per-request headers override
        let mut merged: Vec<(String, String)> = self.config.default_headers.clone();
        for (name, value) in request.headers() {
            if let Some(entry) = merged.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                entry.1 = value.clone();
            } else {
                merged.push((name.clone(), value.clone()));
            }
        }
        for (name, value) in &merged {
            builder = builder.header(name.as_str(), value.as_str());
        }

        match request.body() {
            Body::Empty => builder,
            Body::Raw(raw) => builder.body(raw.clone()),
            Body::Json(value) => builder.json(value),
            Body::Form(_) => builder.form(&request.body().encode_form()),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &Request) -> Result<Response> {
        let fingerprint = fingerprint(request);
        if let Some(response) = self.cached(fingerprint) {
            debug!(url = %request.url(), "answering from memory cache");
            return Ok(response);
        }

        self.notify_request(request);
        let started = Utc::now();

        let outcome = self.build_request(request).send().await;
        let raw = match outcome {
            Ok(raw) => raw,
            Err(err) => {
                let error = Error::RequestFailed {
                    message: err.to_string(),
                    context: Some(BoundContext::new(
                        Arc::new(request.clone()),
                        0,
                        None,
                        "",
                    )),
                };
                self.notify_error(&error);
                return Err(error);
            }
        };

        let status = raw.status().as_u16();
        let headers: Vec<(String, String)> = raw
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let content = raw.text().await.unwrap_or_default();

        let elapsed = Utc::now() - started;
        let mut info = HashMap::new();
        info.insert("url".to_string(), request.url().to_string());
        info.insert("method".to_string(), request.method().to_string());
        info.insert("started_at".to_string(), started.to_rfc3339());
        info.insert(
            "elapsed_ms".to_string(),
            elapsed.num_milliseconds().to_string(),
        );

        let response = Response::new(
            Arc::new(request.clone()),
            content,
            status,
            headers,
            info,
        );

        if !response.has_remaining_rate_limit() {
            let limit = response.rate_limit();
            let error = Error::ApiLimitExceeded {
                message: format!("the api limit of {limit} has been exceeded"),
                context: BoundContext::new(
                    Arc::clone(response.request()),
                    status,
                    None,
                    response.content(),
                ),
            };
            self.notify_error(&error);
            return Err(error);
        }

        if let Some(error) = response.to_error() {
            warn!(status, url = %request.url(), "request classified as failed");
            self.notify_error(&error);
            return Err(error);
        }

        debug!(status, url = %request.url(), "request succeeded");
        self.notify_success(&response);
        self.remember(fingerprint, &response);
        Ok(response)
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.config)
            .field("cache_enabled", &self.cache_enabled.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Fingerprint of method, URL, sorted headers and body.
fn fingerprint(request: &Request) -> u64 {
    let mut hasher = DefaultHasher::new();
    request.method().as_str().hash(&mut hasher);
    request.url().as_str().hash(&mut hasher);

    let mut headers: Vec<(String, String)> = request
        .headers()
        .iter()
        .map(|(n, v)| (n.to_ascii_lowercase(), v.clone()))
        .collect();
    headers.sort();
    headers.hash(&mut hasher);

    match request.body() {
        Body::Empty => 0u8.hash(&mut hasher),
        Body::Raw(raw) => {
            1u8.hash(&mut hasher);
            raw.hash(&mut hasher);
        }
        Body::Json(value) => {
            2u8.hash(&mut hasher);
            value.to_string().hash(&mut hasher);
        }
        Body::Form(_) => {
            3u8.hash(&mut hasher);
            request.body().encode_form().hash(&mut hasher);
        }
    }

    hasher.finish()
}
