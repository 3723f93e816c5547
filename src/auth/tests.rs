//! Tests for session storage and the request snapshot

use std::collections::HashMap;
use std::sync::Arc;

use super::*;

fn storage() -> SessionStorage {
    SessionStorage::new(Arc::new(MemorySessionStore::new()))
}

#[test]
fn test_typed_accessors_round_trip() {
    let session = storage();

    assert!(session.state().is_none());
    assert!(session.code().is_none());
    assert!(session.access_token().is_none());
    assert!(session.user_id().is_none());

    session.set_state(Some("nonce"));
    session.set_code("abc");
    session.set_access_token("tok");
    session.set_user_id(42);

    assert_eq!(session.state().as_deref(), Some("nonce"));
    assert_eq!(session.code().as_deref(), Some("abc"));
    assert_eq!(session.access_token().as_deref(), Some("tok"));
    assert_eq!(session.user_id(), Some(42));
}

#[test]
fn test_clear_all_wipes_everything() {
    let session = storage();
    session.set_state(Some("nonce"));
    session.set_code("abc");
    session.set_access_token("tok");
    session.set_user_id(42);

    session.clear_all();

    assert!(session.state().is_none());
    assert!(session.code().is_none());
    assert!(session.access_token().is_none());
    assert!(session.user_id().is_none());
}

#[test]
fn test_set_state_none_removes() {
    let session = storage();
    session.set_state(Some("nonce"));
    session.set_state(None);
    assert!(session.state().is_none());
}

#[test]
fn test_establish_csrf_state_is_idempotent_while_pending() {
    let session = storage();
    let first = session.establish_csrf_token_state();
    let second = session.establish_csrf_token_state();

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(session.state().as_deref(), Some(first.as_str()));

    // once consumed, a new nonce is minted
    session.set_state(None);
    let third = session.establish_csrf_token_state();
    assert_ne!(first, third);
}

#[test]
fn test_current_request_derives_query() {
    let current = CurrentRequest::new(
        "https://example.org/callback?code=abc&state=xyz"
            .parse()
            .unwrap(),
    );
    assert_eq!(current.param("code"), Some("abc"));
    assert_eq!(current.param("state"), Some("xyz"));
    assert!(current.param("missing").is_none());
}

#[test]
fn test_post_params_shadow_query() {
    let mut post = HashMap::new();
    post.insert("code".to_string(), "from-post".to_string());

    let current = CurrentRequest::new("https://example.org/cb?code=from-query".parse().unwrap())
        .with_post(post);

    assert_eq!(current.param("code"), Some("from-post"));
}

#[test]
fn test_empty_params_read_as_absent() {
    let current = CurrentRequest::new("https://example.org/cb?state=".parse().unwrap());
    assert!(current.param("state").is_none());
}

#[test]
fn test_session_debug_redacts_token() {
    let session = storage();
    session.set_access_token("super-secret");
    let debug = format!("{session:?}");
    assert!(!debug.contains("super-secret"));
    assert!(debug.contains("REDACTED"));
}
