//! Tests for the request/response model

use std::collections::HashMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use reqwest::Method;
use serde_json::{json, Value};

use super::*;
use crate::error::Error;

fn url(s: &str) -> url::Url {
    s.parse().unwrap()
}

fn response_with(
    request: Request,
    content: &str,
    status: u16,
    headers: Vec<(String, String)>,
) -> Response {
    Response::new(Arc::new(request), content, status, headers, HashMap::new())
}

#[test]
fn test_method_is_normalized_uppercase() {
    let request = Request::new(
        url("https://api.github.com/user"),
        Method::from_bytes(b"patch").unwrap(),
        Body::Empty,
        Vec::new(),
    );
    assert_eq!(request.method().as_str(), "PATCH");
}

#[test]
fn test_form_values_round_trip_through_json() {
    let body = Body::Form(vec![
        ("name".to_string(), json!("octocat")),
        ("labels".to_string(), json!(["bug", "help wanted"])),
        ("count".to_string(), json!(3)),
    ]);

    let encoded = body.encode_form();
    assert_eq!(encoded[0], ("name".to_string(), "octocat".to_string()));

    // structured values must equal their parse-back after encoding
    let labels: Value = serde_json::from_str(&encoded[1].1).unwrap();
    assert_eq!(labels, json!(["bug", "help wanted"]));
    let count: Value = serde_json::from_str(&encoded[2].1).unwrap();
    assert_eq!(count, json!(3));
}

#[test]
fn test_header_set_replaces_case_insensitively() {
    let mut request = Request::get(url("https://api.github.com/user"));
    request.set_header("Accept", "application/json");
    request.set_header("accept", "application/vnd.github.v3+json");

    assert_eq!(request.headers().len(), 1);
    assert_eq!(request.header("ACCEPT"), Some("application/vnd.github.v3+json"));
}

#[test]
fn test_params_derive_from_url() {
    let request = Request::get(url("https://api.github.com/user/repos?page=3&per_page=50"));
    let params = request.params();
    assert_eq!(params.get("page").map(String::as_str), Some("3"));
    assert_eq!(params.get("per_page").map(String::as_str), Some("50"));
}

#[test]
fn test_request_is_paginated() {
    assert!(Request::get(url("https://x/?page=2")).is_paginated());
    assert!(Request::get(url("https://x/?per_page=10")).is_paginated());
    assert!(!Request::get(url("https://x/?foo=1")).is_paginated());

    let post = Request::new(url("https://x/?page=2"), Method::POST, Body::Empty, Vec::new());
    assert!(!post.is_paginated());
}

#[test]
fn test_copy_with_url_keeps_headers_minus_pseudo() {
    let mut request = Request::new(
        url("https://api.github.com/user/repos?page=1"),
        Method::GET,
        Body::Empty,
        vec![(HTTP_VERSION_HEADER.to_string(), "HTTP/1.1".to_string())],
    );
    request.set_header("Authorization", "token abc");

    let copy = request.copy_with_url(url("https://api.github.com/user/repos?page=2"));
    assert_eq!(copy.url().as_str(), "https://api.github.com/user/repos?page=2");
    assert_eq!(copy.method(), &Method::GET);
    assert_eq!(copy.header("Authorization"), Some("token abc"));
    assert!(copy.header(HTTP_VERSION_HEADER).is_none());
}

#[test]
fn test_response_is_ok() {
    let request = Request::get(url("https://x/"));
    assert!(response_with(request.clone(), "{}", 200, Vec::new()).is_ok());
    assert!(response_with(request.clone(), "{}", 299, Vec::new()).is_ok());
    assert!(!response_with(request.clone(), "{}", 301, Vec::new()).is_ok());
    assert!(!response_with(request, "{}", 404, Vec::new()).is_ok());
}

#[test]
fn test_response_is_json() {
    let request = Request::get(url("https://x/"));
    let json_headers = vec![(
        "Content-Type".to_string(),
        "application/json; charset=utf-8".to_string(),
    )];
    assert!(response_with(request.clone(), "{}", 200, json_headers).is_json());

    let html = vec![("Content-Type".to_string(), "text/html".to_string())];
    assert!(!response_with(request, "{}", 200, html).is_json());
}

#[test]
fn test_response_json_memoizes() {
    let request = Request::get(url("https://x/"));
    let response = response_with(request, r#"{"id": 42}"#, 200, Vec::new());

    let first = response.json().unwrap() as *const Value;
    let second = response.json().unwrap() as *const Value;
    assert_eq!(first, second);
    assert_eq!(response.json().unwrap()["id"], 42);
}

#[test]
fn test_response_json_parse_failure_is_classified_when_json() {
    let request = Request::get(url("https://x/"));
    let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    let response = response_with(request, "{not json", 200, headers);

    match response.json() {
        Err(Error::Api { status, .. }) => assert_eq!(status, 200),
        other => panic!("expected classified Api error, got {other:?}"),
    }
}

#[test]
fn test_pagination_link_exact() {
    let request = Request::get(url("https://x/?page=1"));
    let headers = vec![(
        "Link".to_string(),
        r#"<https://x/?page=2>; rel="next", <https://x/?page=8>; rel="last""#.to_string(),
    )];
    let response = response_with(request, "[]", 200, headers);

    assert_eq!(
        response.pagination_link("next").unwrap().as_str(),
        "https://x/?page=2"
    );
    assert_eq!(
        response.pagination_link("last").unwrap().as_str(),
        "https://x/?page=8"
    );
    assert!(response.pagination_link("prev").is_none());

    let links = response.pagination_links();
    assert_eq!(links.get("next").map(String::as_str), Some("https://x/?page=2"));
    assert!(!links.contains_key("prev"));
}

#[test]
fn test_pagination_link_absent_header() {
    let request = Request::get(url("https://x/"));
    let response = response_with(request, "[]", 200, Vec::new());
    assert!(response.pagination_link("next").is_none());
    assert!(response.pagination_links().is_empty());
}

#[test]
fn test_response_is_paginated() {
    // paginated request
    let request = Request::get(url("https://x/?per_page=10"));
    assert!(response_with(request, "[]", 200, Vec::new()).is_paginated());

    // plain GET with a Link header
    let request = Request::get(url("https://x/"));
    let headers = vec![("Link".to_string(), r#"<https://x/?page=2>; rel="next""#.to_string())];
    assert!(response_with(request, "[]", 200, headers.clone()).is_paginated());

    // POST never paginates even with a Link header
    let request = Request::new(url("https://x/"), Method::POST, Body::Empty, Vec::new());
    assert!(!response_with(request, "[]", 200, headers).is_paginated());
}

#[test]
fn test_rate_limit_headers() {
    let request = Request::get(url("https://x/"));
    let headers = vec![
        ("X-RateLimit-Remaining".to_string(), "0".to_string()),
        ("X-RateLimit-Limit".to_string(), "60".to_string()),
    ];
    let response = response_with(request.clone(), "[]", 200, headers);
    assert!(!response.has_remaining_rate_limit());
    assert_eq!(response.rate_limit(), 60);

    let response = response_with(request, "[]", 200, Vec::new());
    assert!(response.has_remaining_rate_limit());
    assert_eq!(response.rate_limit(), 5000);
}

#[test]
fn test_to_error_classifies_via_body() {
    let request = Request::get(url("https://api.github.com/missing"));
    let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    let response = response_with(request, r#"{"message": "Not Found"}"#, 404, headers);

    match response.to_error() {
        Some(Error::UnknownResource { message, .. }) => {
            assert!(message.contains("https://api.github.com/missing"));
        }
        other => panic!("expected UnknownResource, got {other:?}"),
    }
}

#[test]
fn test_to_error_none_for_ok() {
    let request = Request::get(url("https://x/"));
    let response = response_with(request, "[]", 200, Vec::new());
    assert!(response.to_error().is_none());
}
