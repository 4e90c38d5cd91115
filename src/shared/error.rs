//! Application Error Types
//!
//! The gateway's rejection taxonomy with Axum integration. Every terminal
//! pipeline rejection maps to a stable numeric reason code so that clients
//! can branch on machine-readable codes instead of message strings.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Token could not be parsed as a JWT at all
    #[error("Malformed token")]
    MalformedToken,

    /// Token parsed but its signature does not verify
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token signature verifies but the token is at or past its expiry
    #[error("Token expired")]
    ExpiredToken,

    /// A refresh token was presented where an access token was expected,
    /// or vice versa
    #[error("Wrong token type")]
    WrongTokenType,

    /// No identity present where one is required
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Session record missing or past its TTL
    #[error("Session expired")]
    SessionExpired,

    /// Identity present but its roles do not satisfy the route requirement
    #[error("Forbidden")]
    Forbidden,

    /// Quota exhausted for the current window
    #[error("Rate limit exceeded")]
    RateLimitExceeded {
        /// Seconds until the current window resets
        retry_after: u64,
    },

    /// Limiter could not reach the cache and the route is fail-closed
    #[error("Rate limiter unavailable")]
    RateLimitUnavailable,

    /// Backing cache unreachable
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// A cache round-trip exceeded its time budget
    #[error("Upstream timeout")]
    UpstreamTimeout,

    /// Invalid login credentials
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Request body failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid startup configuration. Fatal at startup; never
    /// produced on the per-request path.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl AppError {
    /// Stable reason code exposed to clients.
    pub fn reason_code(&self) -> u16 {
        match self {
            AppError::Internal(_) | AppError::Config(_) => 20000,
            AppError::MalformedToken => 20001,
            AppError::InvalidSignature => 20002,
            AppError::ExpiredToken => 20003,
            AppError::WrongTokenType => 20004,
            AppError::Unauthenticated => 20005,
            AppError::SessionExpired => 20006,
            AppError::Forbidden => 20007,
            AppError::RateLimitExceeded { .. } => 20008,
            AppError::RateLimitUnavailable => 20009,
            AppError::CacheUnavailable(_) => 20010,
            AppError::UpstreamTimeout => 20011,
            AppError::InvalidCredentials => 20012,
            AppError::Validation(_) => 20013,
        }
    }

    /// Whether this error is a deterministic token failure that must never
    /// be retried by the caller with the same token.
    pub fn is_terminal_token_error(&self) -> bool {
        matches!(
            self,
            AppError::MalformedToken
                | AppError::InvalidSignature
                | AppError::ExpiredToken
                | AppError::WrongTokenType
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.reason_code();
        let (status, message, retry_after) = match &self {
            AppError::MalformedToken => (StatusCode::UNAUTHORIZED, "Malformed token".into(), None),
            AppError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, "Invalid token".into(), None)
            }
            AppError::ExpiredToken => (StatusCode::UNAUTHORIZED, "Token expired".into(), None),
            AppError::WrongTokenType => {
                (StatusCode::UNAUTHORIZED, "Wrong token type".into(), None)
            }
            AppError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Authentication required".into(), None)
            }
            AppError::SessionExpired => {
                (StatusCode::UNAUTHORIZED, "Session expired".into(), None)
            }
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Insufficient role".into(), None),
            AppError::RateLimitExceeded { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "You are being rate limited. Please slow down.".into(),
                Some(*retry_after),
            ),
            AppError::RateLimitUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable".into(),
                None,
            ),
            AppError::CacheUnavailable(detail) => {
                // Infrastructure detail is logged, never leaked to the caller.
                tracing::error!("Cache unavailable: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable".into(),
                    None,
                )
            }
            AppError::UpstreamTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "Service temporarily unavailable".into(),
                None,
            ),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".into(), None)
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Config(msg) => {
                tracing::error!("Configuration error surfaced at runtime: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                    None,
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            code,
            message,
            retry_after,
        };

        let mut response = (status, Json(body)).into_response();

        if let Some(seconds) = retry_after {
            if let Ok(v) = header::HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, v);
            }
        }

        response
    }
}
