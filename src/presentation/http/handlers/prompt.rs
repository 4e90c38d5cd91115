//! Prompt Handlers
//!
//! The protected prompt endpoints sitting behind the pipeline. These are
//! the gateway-local stand-ins for the intent and enhancement backends;
//! swapping in real upstream calls only changes the bodies below, the
//! pipeline in front stays the same.

use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::domain::identity::AuthOutcome;
use crate::shared::error::AppError;

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// Absent for anonymous callers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub intent: String,
    pub complexity: String,
}

#[derive(Debug, Serialize)]
pub struct EnhanceResponse {
    pub subject: String,
    pub original: String,
    pub enhanced: String,
}

/// Classify a prompt's intent. Open to anonymous callers; signed-in
/// callers get the classification attributed to them.
pub async fn analyze(
    Extension(auth): Extension<AuthOutcome>,
    Json(body): Json<PromptRequest>,
) -> Json<AnalyzeResponse> {
    let complexity = if body.text.split_whitespace().count() > 20 {
        "complex"
    } else {
        "simple"
    };

    Json(AnalyzeResponse {
        subject: auth.claims().map(|claims| claims.subject.clone()),
        intent: "general".to_string(),
        complexity: complexity.to_string(),
    })
}

/// Enhance a prompt
pub async fn enhance(
    Extension(auth): Extension<AuthOutcome>,
    Json(body): Json<PromptRequest>,
) -> Result<Json<EnhanceResponse>, AppError> {
    let claims = auth.claims().ok_or(AppError::Unauthenticated)?;

    let enhanced = format!("Please provide a detailed response: {}", body.text.trim());

    Ok(Json(EnhanceResponse {
        subject: claims.subject.clone(),
        original: body.text,
        enhanced,
    }))
}
