//! Rate Limit Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use tower::ServiceExt;

use crate::common::{body_json, test_settings, TestApp, TEST_USER};

#[tokio::test]
async fn auth_class_limits_by_client_ip() {
    let app = TestApp::new();

    let body = json!({
        "email": TEST_USER.email,
        "password": "WrongPassword1!",
    });

    // Failed logins consume quota exactly like successful ones
    for _ in 0..5 {
        let response = app
            .post_json("/api/v1/auth/login", &body.to_string())
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .post_json("/api/v1/auth/login", &body.to_string())
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap();
    assert!(retry_after >= 1 && retry_after <= 60);

    let body = body_json(response).await;
    assert_eq!(body["code"], 20008);
    assert!(body["retry_after"].as_u64().is_some());
}

#[tokio::test]
async fn different_client_ips_have_separate_auth_quotas() {
    let app = TestApp::new();

    let body = json!({
        "email": TEST_USER.email,
        "password": "WrongPassword1!",
    });

    for _ in 0..6 {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/v1/auth/login")
            .header("Content-Type", "application/json")
            .header("X-Forwarded-For", "10.1.1.1")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap();
        let _ = app.router.clone().oneshot(request).await.unwrap();
    }

    // A different address still has a full window
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header("Content-Type", "application/json")
        .header("X-Forwarded-For", "10.2.2.2")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn successful_requests_carry_rate_limit_headers() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;

    let response = app
        .get_auth("/api/v1/profile", tokens["access_token"].as_str().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let limit = response
        .headers()
        .get("X-RateLimit-Limit")
        .and_then(|h| h.to_str().ok())
        .unwrap();
    assert_eq!(limit, "60");

    let remaining = response
        .headers()
        .get("X-RateLimit-Remaining")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap();
    assert!(remaining < 60);

    assert!(response.headers().contains_key("X-RateLimit-Reset"));
}

#[tokio::test]
async fn enhance_quota_is_independent_of_the_api_quota() {
    let mut settings = test_settings();
    settings.rate_limit.enhance.limit = 2;
    let app = TestApp::with_settings(settings);

    let tokens = app.login(&TEST_USER).await;
    let access = tokens["access_token"].as_str().unwrap();
    let body = json!({ "text": "shorten this" });

    for _ in 0..2 {
        let response = app
            .post_json_auth("/api/v1/enhance", &body.to_string(), access)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .post_json_auth("/api/v1/enhance", &body.to_string(), access)
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // The general API class still has quota for the same identity
    let response = app.get_auth("/api/v1/profile", access).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_callers_are_metered_by_ip() {
    let mut settings = test_settings();
    settings.rate_limit.api.limit = 1;
    let app = TestApp::with_settings(settings);

    // Identity-keyed class, anonymous caller: falls back to the IP bucket
    let body = json!({ "text": "hello" });
    let response = app
        .post_json("/api/v1/analyze", &body.to_string())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_json("/api/v1/analyze", &body.to_string())
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn rejected_unauthenticated_requests_consume_no_quota() {
    use prompt_gateway::infrastructure::cache::{keys, Cache as _};

    let app = TestApp::new();

    let response = app.get("/api/v1/profile").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The auth stage rejected before the limiter ran, so no counter key
    // was created in either the current or the previous window.
    let window = app.state.settings.rate_limit.api.window_seconds as i64;
    let now = chrono::Utc::now().timestamp();
    let window_start = now - now.rem_euclid(window);
    for start in [window_start, window_start - window] {
        let key = keys::rate_limit("api", "ip:unknown", start);
        assert!(!app.state.cache.exists(&key).await.unwrap());
    }
}

#[tokio::test]
async fn exhausted_api_quota_rejects_before_the_handler() {
    let mut settings = test_settings();
    settings.rate_limit.api.limit = 1;
    let app = TestApp::with_settings(settings);

    let tokens = app.login(&TEST_USER).await;
    let access = tokens["access_token"].as_str().unwrap();

    let response = app.get_auth("/api/v1/profile", access).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get_auth("/api/v1/profile", access).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
