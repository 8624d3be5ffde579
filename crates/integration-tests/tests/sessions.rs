//! Registration, login and bearer token handling.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::json;

use cartline_integration_tests::TestApp;

#[tokio::test]
async fn test_register_returns_created_id() {
    let app = TestApp::new();

    let response = app
        .request(
            Method::POST,
            "/users",
            None,
            Some(json!({ "username": "alice", "password": "secret1" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["user_id"], 1);
    assert!(response.body["message"].is_string());
}

#[tokio::test]
async fn test_duplicate_username_conflicts_and_keeps_password() {
    let app = TestApp::new();
    app.register("alice", "secret1").await;

    let response = app
        .request(
            Method::POST,
            "/users",
            None,
            Some(json!({ "username": "alice", "password": "other" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["kind"], "conflict");
    assert_eq!(response.body["error"], "Username already exists");

    app.login("alice", "secret1").await;
    let response = app
        .request(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "username": "alice", "password": "other" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_registration_input() {
    let app = TestApp::new();

    for body in [
        json!({ "username": "", "password": "secret1" }),
        json!({ "username": "has space", "password": "secret1" }),
        json!({ "username": "alice", "password": "" }),
        json!({ "username": "alice" }),
    ] {
        let response = app.request(Method::POST, "/users", None, Some(body)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", response.body);
        assert_eq!(response.body["kind"], "invalid_argument");
    }
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.register("alice", "secret1").await;

    let wrong_password = app
        .request(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "username": "alice", "password": "nope" })),
        )
        .await;
    let unknown_user = app
        .request(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "username": "mallory", "password": "nope" })),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_user.body);
    assert_eq!(wrong_password.body["error"], "Invalid username or password");
}

#[tokio::test]
async fn test_login_returns_expiry() {
    let app = TestApp::new();
    app.register("alice", "secret1").await;

    let response = app
        .request(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "username": "alice", "password": "secret1" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user_id"], 1);
    assert!(response.body["token"].as_str().unwrap().split('.').count() == 3);
    assert!(response.body["expires_at"].is_string());
}

#[tokio::test]
async fn test_protected_routes_reject_missing_and_garbage_tokens() {
    let app = TestApp::new();

    for uri in ["/carts", "/carts/all", "/orders", "/orders/all", "/users"] {
        let missing = app.request(Method::GET, uri, None, None).await;
        assert_eq!(missing.status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(missing.body["kind"], "unauthenticated");

        let garbage = app.request(Method::GET, uri, Some("not-a-token"), None).await;
        assert_eq!(garbage.status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(garbage.body, missing.body);
    }
}

#[tokio::test]
async fn test_non_bearer_scheme_rejected() {
    let app = TestApp::new();
    let token = app.signed_in("alice").await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/orders")
        .header(header::AUTHORIZATION, format!("Token {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_latest_login_wins() {
    let app = TestApp::new();
    app.register("alice", "secret1").await;

    let first = app.login("alice", "secret1").await;
    let second = app.login("alice", "secret1").await;
    assert_ne!(first, second);

    let stale = app.request(Method::GET, "/orders", Some(&first), None).await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
    assert_eq!(stale.body["kind"], "unauthenticated");

    let current = app.request(Method::GET, "/orders", Some(&second), None).await;
    assert_eq!(current.status, StatusCode::OK);
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let app = TestApp::new();
    let token = app.signed_in("alice").await;

    let (signed, signature) = token.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{signed}.{flipped}{}", &signature[1..]);

    let response = app.request(Method::GET, "/orders", Some(&tampered), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
