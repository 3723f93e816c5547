//! # hublink
//!
//! A GitHub REST API client for web applications: OAuth2 authorization-code
//! flow with CSRF-protected redirects, a pluggable HTTP transport, typed
//! error classification, and lazy `Link`-header pagination.
//!
//! ## Features
//!
//! - **OAuth web flow**: build the authorization redirect, exchange the
//!   echoed code for a token, and keep the session state straight; replayed
//!   or forged codes silently reset the session instead of erroring
//! - **Generic dispatch**: call any endpoint with [`Client::api`]; decoded
//!   bodies keep their key order
//! - **Lazy pagination**: walk `Link`-header pages on demand with an
//!   optional result cap; a transient page-fetch failure is retryable
//! - **Pluggable transport**: the [`HttpTransport`] capability isolates the
//!   network; tests script it, production uses [`ReqwestTransport`]
//! - **Typed errors**: HTTP failures classify once into a `thiserror`
//!   taxonomy that keeps the originating request and response for diagnostics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hublink::{Client, Configuration, CurrentRequest, MemorySessionStore, ReqwestTransport};
//!
//! #[tokio::main]
//! async fn main() -> hublink::Result<()> {
//!     let config = Configuration::new("client-id", "client-secret")
//!         .with_permissions(vec!["user:email".to_string()]);
//!     let transport = Arc::new(ReqwestTransport::new()?);
//!     let session = Arc::new(MemorySessionStore::new());
//!     let current = CurrentRequest::new("https://example.org/oauth/callback".parse()?);
//!
//!     let client = Client::new(config, current, session, transport);
//!
//!     if client.get_user().await == 0 {
//!         // redirect the visitor to this URL to connect their account
//!         println!("{}", client.authorization_url(None, None)?);
//!         return Ok(());
//!     }
//!
//!     let repos = client.paginate("/user/repos", &[]).await?.limit_results(50);
//!     for repo in repos.collect_all().await {
//!         println!("{}", repo["full_name"]);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! caller ── Client::api() ── Request ── HttpTransport::send() ── Response
//!               │                                                   │
//!          OAuth engine                                        Paginator
//!          (SessionStore)                                   (Link headers)
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error taxonomy and classification
pub mod error;

/// Request/Response value objects
pub mod api;

/// HTTP transport capability and the reqwest implementation
pub mod http;

/// Session persistence and the incoming-request snapshot
pub mod auth;

/// Client, configuration and the OAuth engine
pub mod client;

/// Lazy Link-header pagination
pub mod pagination;

#[cfg(test)]
pub(crate) mod test_utils;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::{Body, Request, Response};
pub use auth::{CurrentRequest, MemorySessionStore, SessionStorage, SessionStore};
pub use client::{Client, Configuration, Content, Profile, Realm};
pub use error::{Error, Result};
pub use http::{HttpTransport, ReqwestTransport, TransportConfig, TransportObserver};
pub use pagination::{Paginator, PER_PAGE_MAX};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
