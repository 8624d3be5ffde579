//! Integration tests for Cartline.
//!
//! The tests in `tests/` drive the complete router, middleware included,
//! against the in-memory backend seeded with the default catalog. No database
//! or running server is needed:
//!
//! ```bash
//! cargo test -p cartline-integration-tests
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use cartline_server::config::ServerConfig;
use cartline_server::db::MemoryStore;
use cartline_server::services::default_catalog;
use cartline_server::state::AppState;

/// A router over a fresh in-memory store.
pub struct TestApp {
    router: Router,
}

/// Status, headers and decoded JSON body of a response. Non-JSON bodies
/// decode to `Value::String`.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    /// Build the app with development configuration and memory storage.
    ///
    /// # Panics
    ///
    /// Panics if the test configuration is rejected.
    #[must_use]
    pub fn new() -> Self {
        let env = HashMap::from([("CARTLINE_STORAGE", "memory")]);
        let config = ServerConfig::from_lookup(|key| env.get(key).map(ToString::to_string))
            .expect("test configuration");

        let store = Arc::new(MemoryStore::with_items(&default_catalog()));
        let state = AppState::new(config, store).expect("test state");

        Self {
            router: cartline_server::app(state),
        }
    }

    /// Send a request with an optional bearer token and JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the router fails.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).expect("request")).await
    }

    /// Send a prepared request.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Register a user and return the created ID.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    pub async fn register(&self, username: &str, password: &str) -> i64 {
        let response = self
            .request(
                Method::POST,
                "/users",
                None,
                Some(serde_json::json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["user_id"].as_i64().expect("user_id")
    }

    /// Log in and return the bearer token.
    ///
    /// # Panics
    ///
    /// Panics if login fails.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/users/login",
                None,
                Some(serde_json::json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["token"]
            .as_str()
            .expect("token")
            .to_string()
    }

    /// Register and log in; returns the bearer token.
    ///
    /// # Panics
    ///
    /// Panics if either step fails.
    pub async fn signed_in(&self, username: &str) -> String {
        self.register(username, "secret1").await;
        self.login(username, "secret1").await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
