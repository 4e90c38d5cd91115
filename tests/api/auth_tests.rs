//! Authentication API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{body_json, TestApp, TEST_USER};

#[tokio::test]
async fn login_returns_token_pair_and_session() {
    let app = TestApp::new();

    let tokens = app.login(&TEST_USER).await;

    assert!(tokens["access_token"].as_str().unwrap().contains('.'));
    assert!(tokens["refresh_token"].as_str().unwrap().contains('.'));
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 15 * 60);
    assert!(!tokens["session_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let app = TestApp::new();

    let body = json!({
        "email": TEST_USER.email,
        "password": "WrongPassword1!",
    });
    let response = app
        .post_json("/api/v1/auth/login", &body.to_string())
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], 20012);
}

#[tokio::test]
async fn login_with_invalid_email_fails_validation() {
    let app = TestApp::new();

    let body = json!({
        "email": "not-an-email",
        "password": "LongEnough1!",
    });
    let response = app
        .post_json("/api/v1/auth/login", &body.to_string())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], 20013);
}

#[tokio::test]
async fn refresh_rotates_the_pair() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;

    let body = json!({
        "refresh_token": tokens["refresh_token"],
        "session_id": tokens["session_id"],
    });
    let response = app
        .post_json("/api/v1/auth/refresh", &body.to_string())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["refresh_token"], tokens["refresh_token"]);
    assert_eq!(rotated["session_id"], tokens["session_id"]);

    // The new access token works
    let response = app
        .get_auth("/api/v1/profile", rotated["access_token"].as_str().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn stale_refresh_token_is_rejected_after_rotation() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;

    let body = json!({
        "refresh_token": tokens["refresh_token"],
        "session_id": tokens["session_id"],
    });
    let response = app
        .post_json("/api/v1/auth/refresh", &body.to_string())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Replaying the pre-rotation token must fail even though the JWT
    // itself is still within its validity window
    let response = app
        .post_json("/api/v1/auth/refresh", &body.to_string())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], 20006);
}

#[tokio::test]
async fn access_token_is_rejected_for_refresh() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;

    let body = json!({
        "refresh_token": tokens["access_token"],
        "session_id": tokens["session_id"],
    });
    let response = app
        .post_json("/api/v1/auth/refresh", &body.to_string())
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], 20004);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;
    let session_id = tokens["session_id"].as_str().unwrap().to_string();

    let body = json!({ "session_id": session_id });
    let response = app
        .post_json("/api/v1/auth/logout", &body.to_string())
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The session no longer refreshes
    let body = json!({
        "refresh_token": tokens["refresh_token"],
        "session_id": session_id,
    });
    let response = app
        .post_json("/api/v1/auth/refresh", &body.to_string())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_is_idempotent() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;

    let body = json!({ "session_id": tokens["session_id"] });
    let first = app
        .post_json("/api/v1/auth/logout", &body.to_string())
        .await;
    assert_eq!(first.status(), StatusCode::NO_CONTENT);

    let second = app
        .post_json("/api/v1/auth/logout", &body.to_string())
        .await;
    assert_eq!(second.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn profile_echoes_the_identity() {
    let app = TestApp::new();
    let tokens = app.login(&TEST_USER).await;

    let response = app
        .get_auth("/api/v1/profile", tokens["access_token"].as_str().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["subject"], TEST_USER.subject);
    assert_eq!(body["issuer"], "betterprompts");
    assert_eq!(body["roles"], json!(["user"]));
}
