//! Admin and Developer Handlers
//!
//! Endpoints behind the role-guarded route groups.

use axum::{Extension, Json};
use serde::Serialize;

use crate::domain::identity::AuthOutcome;
use crate::shared::error::AppError;

#[derive(Debug, Serialize)]
pub struct AdminOverviewResponse {
    pub subject: String,
    pub environment: String,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DevStatusResponse {
    pub subject: String,
    pub roles: Vec<String>,
}

/// Admin-only overview
pub async fn overview(
    Extension(auth): Extension<AuthOutcome>,
) -> Result<Json<AdminOverviewResponse>, AppError> {
    let claims = auth.claims().ok_or(AppError::Unauthenticated)?;

    Ok(Json(AdminOverviewResponse {
        subject: claims.subject.clone(),
        environment: std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// Developer tooling status, open to developer and admin roles
pub async fn dev_status(
    Extension(auth): Extension<AuthOutcome>,
) -> Result<Json<DevStatusResponse>, AppError> {
    let claims = auth.claims().ok_or(AppError::Unauthenticated)?;

    let mut roles: Vec<String> = claims.roles.iter().cloned().collect();
    roles.sort();

    Ok(Json(DevStatusResponse {
        subject: claims.subject.clone(),
        roles,
    }))
}
