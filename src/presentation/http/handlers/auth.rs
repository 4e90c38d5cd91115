//! Authentication Handlers

use axum::{extract::State, http::StatusCode, Extension, Json};
use validator::Validate;

use crate::application::dto::request::{LoginRequest, LogoutRequest, RefreshTokenRequest};
use crate::application::dto::response::{ProfileResponse, TokenResponse};
use crate::application::services::token_service::TokenManager;
use crate::domain::identity::{AuthOutcome, TokenType};
use crate::presentation::middleware::SessionContext;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Login with credentials
///
/// Issues an access/refresh pair and opens a session. The session record
/// remembers the hash of the refresh token so stale tokens can be
/// rejected after rotation.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = state
        .directory
        .authenticate(&body.email, &body.password)
        .await?;

    let pair = state.tokens.issue(&user.subject, &user.roles)?;
    let session_id = state
        .sessions
        .create_session(&user.subject, body.fingerprint)
        .await?;
    state
        .sessions
        .bind_refresh(&session_id, &TokenManager::hash_refresh_token(&pair.refresh_token))
        .await?;

    tracing::info!(subject = %user.subject, "Login succeeded");
    Ok(Json(TokenResponse::from_pair(pair, session_id)))
}

/// Rotate a refresh token
///
/// Validates the presented refresh token, issues a fresh pair, and swaps
/// the session's stored hash in one step. A refresh token that is valid
/// as a JWT but no longer the session's latest is rejected; the caller
/// must log in again.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let claims = state.tokens.validate(&body.refresh_token, TokenType::Refresh)?;

    let record = state.sessions.lookup(&body.session_id).await?;
    if record.subject != claims.subject {
        tracing::warn!(
            session_subject = %record.subject,
            token_subject = %claims.subject,
            "Refresh attempted against another subject's session"
        );
        return Err(AppError::Unauthenticated);
    }

    let pair = state.tokens.issue(&claims.subject, &claims.roles)?;
    state
        .sessions
        .rotate_refresh(
            &body.session_id,
            &TokenManager::hash_refresh_token(&body.refresh_token),
            &TokenManager::hash_refresh_token(&pair.refresh_token),
        )
        .await?;

    Ok(Json(TokenResponse::from_pair(pair, body.session_id)))
}

/// Logout and invalidate the session
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<LogoutRequest>,
) -> Result<StatusCode, AppError> {
    state.sessions.invalidate(&body.session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Echo the authenticated identity
pub async fn profile(
    Extension(auth): Extension<AuthOutcome>,
    session: Option<Extension<SessionContext>>,
) -> Result<Json<ProfileResponse>, AppError> {
    let claims = auth.claims().ok_or(AppError::Unauthenticated)?;

    let mut roles: Vec<String> = claims.roles.iter().cloned().collect();
    roles.sort();

    Ok(Json(ProfileResponse {
        subject: claims.subject.clone(),
        roles,
        issuer: claims.issuer.clone(),
        session_id: session.map(|Extension(s)| s.session_id),
    }))
}
