//! Transport observers
//!
//! Replaces ad-hoc event arrays with a typed callback trait. Observers are
//! invoked synchronously in registration order and must not block.

use crate::api::{Request, Response};
use crate::error::Error;

/// Callbacks around a transport exchange.
///
/// All methods default to no-ops so an observer only implements the events
/// it cares about. Diagnostics collaborators hook in through this trait;
/// the core never registers anything itself.
pub trait TransportObserver: Send + Sync {
    /// A request is about to be dispatched.
    fn on_request(&self, request: &Request) {
        let _ = request;
    }

    /// A response came back with a 2xx status.
    fn on_success(&self, response: &Response) {
        let _ = response;
    }

    /// The exchange failed; `error` is already classified.
    fn on_error(&self, error: &Error) {
        let _ = error;
    }
}
