//! Pipeline Tests
//!
//! End-to-end behavior of the per-group stage chains: authentication,
//! expiry and recovery via refresh, role guarding, and session binding.

use std::collections::HashSet;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use tower::ServiceExt;

use prompt_gateway::application::services::token_service::TokenManager;

use crate::common::{body_json, test_settings, TestApp, TEST_ADMIN, TEST_USER};

fn roles(names: &[&str]) -> HashSet<String> {
    names.iter().map(|r| r.to_string()).collect()
}

#[tokio::test]
async fn protected_route_requires_a_token() {
    let app = TestApp::new();

    let response = app.get("/api/v1/profile").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], 20005);
}

#[tokio::test]
async fn garbage_token_is_malformed() {
    let app = TestApp::new();

    let response = app.get_auth("/api/v1/profile", "garbage").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], 20001);
}

#[tokio::test]
async fn refresh_token_is_rejected_on_protected_routes() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;

    let response = app
        .get_auth("/api/v1/profile", tokens["refresh_token"].as_str().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], 20004);
}

#[tokio::test]
async fn expired_access_token_recovers_through_refresh() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;

    // Mint an already-expired access token with the same keys. Expiry is
    // inclusive, so a zero-minute lifetime is expired at once.
    let mut jwt = test_settings().jwt;
    jwt.access_token_expiry_minutes = 0;
    let expired_manager = TokenManager::new(&jwt).unwrap();
    let expired = expired_manager
        .issue(TEST_USER.subject, &roles(&["user"]))
        .unwrap();

    let response = app.get_auth("/api/v1/profile", &expired.access_token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], 20003);

    // The long-lived refresh token still rotates the pair
    let body = json!({
        "refresh_token": tokens["refresh_token"],
        "session_id": tokens["session_id"],
    });
    let response = app
        .post_json("/api/v1/auth/refresh", &body.to_string())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;

    let response = app
        .get_auth("/api/v1/profile", rotated["access_token"].as_str().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_route_forbids_plain_users() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;

    let response = app
        .get_auth("/api/v1/admin/overview", tokens["access_token"].as_str().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["code"], 20007);
}

#[tokio::test]
async fn admin_route_admits_admins() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_ADMIN).await;

    let response = app
        .get_auth("/api/v1/admin/overview", tokens["access_token"].as_str().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["subject"], TEST_ADMIN.subject);
}

#[tokio::test]
async fn developer_route_accepts_the_admin_role() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_ADMIN).await;

    let response = app
        .get_auth("/api/v1/dev/status", tokens["access_token"].as_str().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_route_rejects_anonymous_as_unauthenticated() {
    let app = TestApp::new();

    let response = app.get("/api/v1/admin/overview").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], 20005);
}

#[tokio::test]
async fn unknown_session_header_is_rejected() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/profile")
        .header(
            "Authorization",
            format!("Bearer {}", tokens["access_token"].as_str().unwrap()),
        )
        .header("X-Session-Id", "no-such-session")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], 20006);
}

#[tokio::test]
async fn session_bound_to_another_subject_is_rejected() {
    let app = TestApp::new();
    let alice = app.login(&TEST_USER).await;
    let admin = app.login(&TEST_ADMIN).await;

    // Admin's token presented alongside alice's session
    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/profile")
        .header(
            "Authorization",
            format!("Bearer {}", admin["access_token"].as_str().unwrap()),
        )
        .header("X-Session-Id", alice["session_id"].as_str().unwrap())
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn matching_session_is_echoed_in_the_profile() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;
    let session_id = tokens["session_id"].as_str().unwrap();

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/profile")
        .header(
            "Authorization",
            format!("Bearer {}", tokens["access_token"].as_str().unwrap()),
        )
        .header("X-Session-Id", session_id)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["session_id"], session_id);
}

#[tokio::test]
async fn enhance_requires_authentication() {
    let app = TestApp::new();

    let body = json!({ "text": "write a poem" });
    let response = app
        .post_json("/api/v1/enhance", &body.to_string())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn analyze_serves_anonymous_callers() {
    let app = TestApp::new();

    let body = json!({ "text": "write a poem" });
    let response = app
        .post_json("/api/v1/analyze", &body.to_string())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body.get("subject").is_none());
    assert_eq!(body["complexity"], "simple");
}

#[tokio::test]
async fn analyze_attributes_authenticated_callers() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;

    let body = json!({ "text": "write a poem" });
    let response = app
        .post_json_auth(
            "/api/v1/analyze",
            &body.to_string(),
            tokens["access_token"].as_str().unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["subject"], TEST_USER.subject);
}

#[tokio::test]
async fn enhance_answers_for_authenticated_callers() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;

    let body = json!({ "text": "write a poem" });
    let response = app
        .post_json_auth(
            "/api/v1/enhance",
            &body.to_string(),
            tokens["access_token"].as_str().unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["subject"], TEST_USER.subject);
    assert_eq!(body["original"], "write a poem");
}
