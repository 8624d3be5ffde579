//! Catalog endpoints, administrative listings and service info.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::json;

use cartline_integration_tests::TestApp;

#[tokio::test]
async fn test_default_catalog_is_public() {
    let app = TestApp::new();

    let response = app.request(Method::GET, "/items", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    let items = response.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 5);
    assert_eq!(items[0]["id"], 1);
    assert_eq!(items[0]["price"], "299.99");
    assert_eq!(items[3]["name"], "Organic Coffee Beans");
}

#[tokio::test]
async fn test_item_create_and_delete() {
    let app = TestApp::new();
    let token = app.signed_in("alice").await;
    let token = Some(token.as_str());

    let anonymous = app
        .request(
            Method::POST,
            "/items",
            None,
            Some(json!({ "name": "Desk Lamp", "price": "39.50" })),
        )
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let invalid = app
        .request(
            Method::POST,
            "/items",
            token,
            Some(json!({ "name": "Desk Lamp", "price": "-1" })),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let too_expensive = app
        .request(
            Method::POST,
            "/items",
            token,
            Some(json!({ "name": "Yacht", "price": "10000000000" })),
        )
        .await;
    assert_eq!(too_expensive.status, StatusCode::BAD_REQUEST);
    assert_eq!(too_expensive.body["kind"], "invalid_argument");

    let created = app
        .request(
            Method::POST,
            "/items",
            token,
            Some(json!({ "name": "Desk Lamp", "price": "39.50", "category": "Furniture" })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["item"]["id"], 6);
    assert_eq!(created.body["item"]["in_stock"], true);

    let deleted = app.request(Method::DELETE, "/items/6", token, None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Item deleted successfully");

    let again = app.request(Method::DELETE, "/items/6", token, None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let bad_id = app.request(Method::DELETE, "/items/six", token, None).await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.body["kind"], "invalid_argument");

    let items = app.request(Method::GET, "/items", None, None).await;
    assert_eq!(items.body["items"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_deleted_item_cannot_be_added_but_lines_survive() {
    let app = TestApp::new();
    let token = app.signed_in("alice").await;
    let token = Some(token.as_str());

    app.request(
        Method::POST,
        "/carts",
        token,
        Some(json!({ "item_id": 2, "quantity": 1 })),
    )
    .await;
    app.request(Method::DELETE, "/items/2", token, None).await;

    let add = app
        .request(
            Method::POST,
            "/carts",
            token,
            Some(json!({ "item_id": 2, "quantity": 1 })),
        )
        .await;
    assert_eq!(add.status, StatusCode::NOT_FOUND);

    let cart = app.request(Method::GET, "/carts", token, None).await;
    let lines = cart.body["cart"]["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert!(lines[0]["item"].is_null());
    assert_eq!(lines[0]["price"], "199.99");
}

#[tokio::test]
async fn test_user_listing_is_redacted() {
    let app = TestApp::new();
    let token = app.signed_in("alice").await;
    app.register("bob", "hunter2").await;

    let response = app.request(Method::GET, "/users", Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);

    let users = response.body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["username"], "alice");
    assert_eq!(users[1]["username"], "bob");

    let raw = response.body.to_string();
    assert!(!raw.contains("hunter2"));
    assert!(!raw.contains("password"));
    assert!(!raw.contains("token"));
    assert!(!raw.contains("argon2"));
}

#[tokio::test]
async fn test_all_carts_and_orders_carry_owners() {
    let app = TestApp::new();
    let alice = app.signed_in("alice").await;
    let bob = app.signed_in("bob").await;

    for (token, item) in [(&alice, 1), (&bob, 3)] {
        app.request(
            Method::POST,
            "/carts",
            Some(token),
            Some(json!({ "item_id": item, "quantity": 1 })),
        )
        .await;
    }
    app.request(Method::POST, "/orders", Some(&bob), None).await;

    let carts = app.request(Method::GET, "/carts/all", Some(&alice), None).await;
    assert_eq!(carts.status, StatusCode::OK);
    let carts = carts.body["carts"].as_array().unwrap();
    assert_eq!(carts.len(), 2);
    assert_eq!(carts[0]["user"]["username"], "alice");
    assert_eq!(carts[1]["user"]["username"], "bob");
    assert!(carts[1]["lines"].as_array().unwrap().is_empty());

    let orders = app.request(Method::GET, "/orders/all", Some(&alice), None).await;
    assert_eq!(orders.status, StatusCode::OK);
    let orders = orders.body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["user"]["username"], "bob");
    assert_eq!(orders[0]["total"], "449.99");

    let own = app.request(Method::GET, "/orders", Some(&alice), None).await;
    assert!(own.body["orders"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_service_info_and_health() {
    let app = TestApp::new();

    let info = app.request(Method::GET, "/", None, None).await;
    assert_eq!(info.status, StatusCode::OK);
    assert_eq!(info.body["service"], "cartline");
    assert_eq!(info.body["storage"], "memory");
    assert_eq!(info.body["endpoints"]["carts"], "/carts");

    let health = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);

    let ready = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/carts")
        .header("origin", "https://shop.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "authorization,content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-123")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
    assert_eq!(response.headers["x-request-id"], "trace-123");
}
