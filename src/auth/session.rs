//! Session persistence for the OAuth flow

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

/// Session key for the CSRF nonce.
const KEY_STATE: &str = "state";
/// Session key for the last accepted authorization code.
const KEY_CODE: &str = "code";
/// Session key for the persisted access token.
const KEY_ACCESS_TOKEN: &str = "access_token";
/// Session key for the cached user id.
const KEY_USER_ID: &str = "user_id";

/// Capability for persisting OAuth session state across requests.
///
/// The store is the authority for durable state and must guarantee
/// read-your-write consistency within a single logical session.
pub trait SessionStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value
    fn set(&self, key: &str, value: &str);

    /// Delete a value
    fn remove(&self, key: &str);

    /// Delete everything stored for this session
    fn clear_all(&self);
}

/// In-memory session store for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().expect("session lock").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .expect("session lock")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.lock().expect("session lock").remove(key);
    }

    fn clear_all(&self) {
        self.values.lock().expect("session lock").clear();
    }
}

/// Typed accessors over a [`SessionStore`].
#[derive(Clone)]
pub struct SessionStorage {
    store: Arc<dyn SessionStore>,
}

impl SessionStorage {
    /// Wrap a session store
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// The pending CSRF state nonce
    pub fn state(&self) -> Option<String> {
        self.store.get(KEY_STATE)
    }

    /// Set or clear the CSRF state nonce
    pub fn set_state(&self, state: Option<&str>) {
        match state {
            Some(state) => self.store.set(KEY_STATE, state),
            None => self.store.remove(KEY_STATE),
        }
    }

    /// Store a fresh CSRF nonce unless one is already pending.
    ///
    /// Returns the nonce that will ride along on the authorization redirect.
    pub fn establish_csrf_token_state(&self) -> String {
        if let Some(state) = self.state().filter(|s| !s.is_empty()) {
            return state;
        }
        let state = Uuid::new_v4().simple().to_string();
        self.store.set(KEY_STATE, &state);
        state
    }

    /// The last accepted authorization code
    pub fn code(&self) -> Option<String> {
        self.store.get(KEY_CODE)
    }

    /// Record an accepted authorization code
    pub fn set_code(&self, code: &str) {
        self.store.set(KEY_CODE, code);
    }

    /// The persisted access token
    pub fn access_token(&self) -> Option<String> {
        self.store.get(KEY_ACCESS_TOKEN)
    }

    /// Persist an access token
    pub fn set_access_token(&self, token: &str) {
        self.store.set(KEY_ACCESS_TOKEN, token);
    }

    /// The cached user id; `None` when nobody is connected
    pub fn user_id(&self) -> Option<u64> {
        self.store.get(KEY_USER_ID).and_then(|v| v.parse().ok())
    }

    /// Cache the connected user id
    pub fn set_user_id(&self, user_id: u64) {
        self.store.set(KEY_USER_ID, &user_id.to_string());
    }

    /// Wipe every session value
    pub fn clear_all(&self) {
        self.store.clear_all();
    }
}

impl std::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage")
            .field("state", &self.state().is_some())
            .field("code", &self.code().is_some())
            .field("access_token", &"[REDACTED]")
            .field("user_id", &self.user_id())
            .finish()
    }
}
