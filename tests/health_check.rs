mod common;

use common::TestApp;
use imagegen_service::services::providers::MockImageProvider;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;

// ===== Health =====

#[tokio::test]
async fn health_check_returns_ok_payload() {
    let app = TestApp::spawn_with_api_base("http://127.0.0.1:1").await;
    let client = Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn health_check_does_not_require_credentials() {
    let app = TestApp::spawn_unconfigured().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({ "ok": true }));
}

// ===== Readiness =====

#[tokio::test]
async fn readiness_succeeds_when_token_is_set() {
    let app = TestApp::spawn_with_api_base("http://127.0.0.1:1").await;
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn readiness_fails_without_token() {
    let app = TestApp::spawn_unconfigured().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 503);
}

// ===== CORS =====

#[tokio::test]
async fn any_origin_is_allowed() {
    let app = TestApp::spawn_with_provider(Arc::new(MockImageProvider::returning_url(
        "https://replicate.delivery/pbxt/img.webp",
    )))
    .await;
    let client = Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .header("origin", "https://example.com")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .expect("Missing CORS header"),
        "*"
    );
}

#[tokio::test]
async fn preflight_is_accepted() {
    let app = TestApp::spawn_with_provider(Arc::new(MockImageProvider::returning_url(
        "https://replicate.delivery/pbxt/img.webp",
    )))
    .await;
    let client = Client::new();

    let response = client
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/generate", app.address),
        )
        .header("origin", "https://example.com")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

// ===== Request Id =====

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::spawn_unconfigured().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Missing x-request-id header");
    assert!(!request_id.is_empty());
}

#[tokio::test]
async fn caller_supplied_request_id_is_echoed() {
    let app = TestApp::spawn_unconfigured().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .header("x-request-id", "test-trace-42")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .expect("Missing x-request-id header"),
        "test-trace-42"
    );
}

// ===== Metrics =====

#[tokio::test]
async fn metrics_endpoint_exposes_request_counters() {
    let app = TestApp::spawn_with_provider(Arc::new(MockImageProvider::returning_url(
        "https://replicate.delivery/pbxt/img.webp",
    )))
    .await;

    app.post_generate(&json!({ "prompt": "a cat" })).await;

    let client = Client::new();
    let response = client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("Failed to read response body");
    assert!(body.contains("image_requests_total"));
}
