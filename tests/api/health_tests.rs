//! Health and Metrics Tests

use axum::http::StatusCode;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;

use crate::common::{body_json, TestApp};

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(!body["version"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn liveness_answers() {
    let app = TestApp::new();
    let response = app.get("/health/live").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn readiness_reports_cache_up() {
    let app = TestApp::new();

    let response = app.get("/health/ready").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["cache"], "up");
}

#[tokio::test]
async fn health_routes_bypass_the_pipeline() {
    let app = TestApp::new();

    // No token, no session, still answered
    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("X-RateLimit-Limit"));
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_text() {
    let app = TestApp::new();

    let response = app.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("Content-Type")
        .and_then(|h| h.to_str().ok())
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8(bytes.to_vec()).is_ok());
}
