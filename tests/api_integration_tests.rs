//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each admin endpoint against a
//! default L1/L2/L3 stack.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use layered_cache::{api::create_router, AppState, Config};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

// == Helper Functions ==

async fn create_test_app() -> Router {
    let state = AppState::from_config(&Config::default()).await.unwrap();
    create_router(state)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app().await;

    let (status, json) = send(
        &app,
        "PUT",
        "/set",
        Some(json!({"key": "test_key", "value": "test_value"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_set_unknown_partition_falls_back() {
    let app = create_test_app().await;

    let (status, _) = send(
        &app,
        "PUT",
        "/set",
        Some(json!({"key": "route:1", "value": 1, "partition": "L9"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Pattern routing put it in L2
    let (status, json) = send(&app, "GET", "/get/route:1?layer=L2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], 1);

    let (_, metrics) = send(&app, "GET", "/metrics", None).await;
    assert_eq!(metrics["layers"]["L2"]["hits"], 1);
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app().await;

    send(
        &app,
        "PUT",
        "/set",
        Some(json!({"key": "user:42", "value": {"name": "Ada", "rank": 3}})),
    )
    .await;

    let (status, json) = send(&app, "GET", "/get/user:42", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "user:42");
    assert_eq!(json["value"], json!({"name": "Ada", "rank": 3}));
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app().await;

    let (status, json) = send(&app, "GET", "/get/nonexistent", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("nonexistent"));
}

#[tokio::test]
async fn test_get_promotes_static_entry() {
    let app = create_test_app().await;
    send(
        &app,
        "PUT",
        "/set",
        Some(json!({"key": "static:config", "value": {"fares": "v2"}})),
    )
    .await;

    send(&app, "GET", "/get/static:config", None).await;
    send(&app, "GET", "/get/static:config", None).await;

    let (_, metrics) = send(&app, "GET", "/metrics", None).await;
    assert_eq!(metrics["layers"]["L3"]["hits"], 1);
    // Second read is served by L1 after promotion
    assert_eq!(metrics["layers"]["L1"]["hits"], 1);
    assert_eq!(metrics["layers"]["L1"]["size"], 1);
    assert_eq!(metrics["patterns"]["static"]["requests"], 2);
    assert_eq!(metrics["global"]["overall_hit_rate"], 1.0);
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint_success() {
    let app = create_test_app().await;
    send(&app, "PUT", "/set", Some(json!({"key": "session:1", "value": "tok"}))).await;

    let (status, json) = send(&app, "DELETE", "/del/session:1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("session:1"));

    let (status, _) = send(&app, "GET", "/get/session:1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_endpoint_not_found() {
    let app = create_test_app().await;

    let (status, json) = send(&app, "DELETE", "/del/nonexistent", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json.get("error").is_some());
}

// == Invalidation Endpoint Tests ==

#[tokio::test]
async fn test_invalidate_by_tag_across_layers() {
    let app = create_test_app().await;
    for key in ["user:1", "user:2", "route:9"] {
        send(
            &app,
            "PUT",
            "/set",
            Some(json!({"key": key, "value": key, "tags": ["journey"]})),
        )
        .await;
    }

    let (status, json) = send(&app, "DELETE", "/tags/journey", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"removed": 3}));

    let (status, _) = send(&app, "GET", "/get/route:9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalidate_by_pattern() {
    let app = create_test_app().await;
    send(&app, "PUT", "/set", Some(json!({"key": "location:1", "value": 1}))).await;
    send(&app, "PUT", "/set", Some(json!({"key": "location:2", "value": 2}))).await;
    send(&app, "PUT", "/set", Some(json!({"key": "user:1", "value": 3}))).await;

    let (status, json) = send(&app, "DELETE", "/patterns/location", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);

    let (status, _) = send(&app, "DELETE", "/patterns/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Layer Management Tests ==

#[tokio::test]
async fn test_disable_and_enable_layer() {
    let app = create_test_app().await;
    send(&app, "PUT", "/set", Some(json!({"key": "user:1", "value": 1}))).await;

    let (status, _) = send(&app, "POST", "/layers/L1/disable", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/get/user:1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", "/layers/L1/enable", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/get/user:1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/layers/L9/enable", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_single_layer_and_all() {
    let app = create_test_app().await;
    send(&app, "PUT", "/set", Some(json!({"key": "user:1", "value": 1}))).await;
    send(&app, "PUT", "/set", Some(json!({"key": "route:1", "value": 1}))).await;

    let (status, _) = send(&app, "POST", "/clear?layer=L1", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/get/user:1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", "/get/route:1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/clear", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, metrics) = send(&app, "GET", "/metrics", None).await;
    assert_eq!(metrics["global"]["total_requests"], 0);
    assert_eq!(metrics["layers"]["L2"]["size"], 0);
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["details"]["layer_count"], 3);
    assert_eq!(json["details"]["pattern_count"], 5);
    assert!(json["timestamp"].is_string());
}

// == Error Response Tests ==

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/set")
                .header("content-type", "application/json")
                .body(Body::from("not valid json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_empty_key_request() {
    let app = create_test_app().await;

    let (status, json) = send(&app, "PUT", "/set", Some(json!({"key": "", "value": 1}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("empty"));
}

// == TTL Expiration via API Tests ==

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let app = create_test_app().await;

    send(
        &app,
        "PUT",
        "/set",
        Some(json!({"key": "location:7", "value": "51.5,-0.1", "ttl": 1})),
    )
    .await;

    let (status, _) = send(&app, "GET", "/get/location:7", None).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let (status, _) = send(&app, "GET", "/get/location:7", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_max_ttl_via_api_is_accepted() {
    let app = create_test_app().await;

    let (status, _) = send(
        &app,
        "PUT",
        "/set",
        Some(json!({"key": "user:1", "value": 1, "ttl": u64::MAX})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "GET", "/get/user:1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], 1);
}

#[tokio::test]
async fn test_overlong_key_rejected_at_api() {
    let app = create_test_app().await;
    let key = "k".repeat(300);

    let (status, json) = send(&app, "PUT", "/set", Some(json!({"key": key, "value": 1}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("maximum length"));
}
