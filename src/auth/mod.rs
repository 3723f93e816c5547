//! Session and request-context module
//!
//! The OAuth engine keeps its durable state (CSRF nonce, last accepted code,
//! access token, user id) in a [`SessionStore`] capability the integrator
//! backs with whatever their web framework persists sessions in.
//! [`SessionStorage`] wraps the store with typed accessors, and
//! [`CurrentRequest`] snapshots the incoming HTTP request the OAuth redirect
//! lands on.

mod session;
mod types;

pub use session::{MemorySessionStore, SessionStorage, SessionStore};
pub use types::CurrentRequest;

#[cfg(test)]
mod tests;
