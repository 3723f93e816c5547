//! HTTP transport module
//!
//! Provides the [`HttpTransport`] capability consumed by the client and the
//! paginator, plus the production reqwest-backed implementation.
//!
//! # Features
//!
//! - **Pluggable transport**: any `HttpTransport` implementation can stand in
//!   for the network, which is how the tests script exchanges
//! - **Memory cache**: identical requests within one transport instance are
//!   answered from a fingerprint-keyed memo
//! - **Observers**: typed request-start / success / error callbacks invoked
//!   synchronously in registration order

mod observer;
mod transport;

pub use observer::TransportObserver;
pub use transport::{HttpTransport, ReqwestTransport, TransportConfig};
