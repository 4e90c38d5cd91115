//! Authentication Stage
//!
//! Resolves the Authorization header into an `AuthOutcome`. Required
//! routes reject anything short of a valid access token; optional routes
//! degrade to anonymous so public endpoints can still personalize for
//! signed-in callers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::services::token_service::TokenManager;
use crate::domain::identity::{AuthOutcome, TokenType};
use crate::shared::error::AppError;

use super::pipeline::{RequestContext, Stage};

/// Whether a route group demands a valid access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Required,
    Optional,
}

pub struct AuthStage {
    tokens: Arc<TokenManager>,
    mode: AuthMode,
}

impl AuthStage {
    pub fn new(tokens: Arc<TokenManager>, mode: AuthMode) -> Self {
        Self { tokens, mode }
    }
}

#[async_trait]
impl Stage for AuthStage {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn process(&self, mut ctx: RequestContext) -> Result<RequestContext, AppError> {
        let token = match ctx.bearer_token.as_deref() {
            Some(token) => token,
            None => {
                return match self.mode {
                    AuthMode::Required => Err(AppError::Unauthenticated),
                    AuthMode::Optional => {
                        ctx.auth = Some(AuthOutcome::Anonymous);
                        Ok(ctx)
                    }
                };
            }
        };

        match self.tokens.validate(token, TokenType::Access) {
            Ok(claims) => {
                // A session bound to one subject must not carry another
                // subject's token.
                if let Some(session) = &ctx.session {
                    if session.record.subject != claims.subject {
                        tracing::warn!(
                            session_subject = %session.record.subject,
                            token_subject = %claims.subject,
                            "Session and token subjects disagree"
                        );
                        return Err(AppError::Unauthenticated);
                    }
                }
                ctx.auth = Some(AuthOutcome::Authenticated(claims));
                Ok(ctx)
            }
            Err(err) => match self.mode {
                AuthMode::Required => Err(err),
                AuthMode::Optional => {
                    tracing::debug!(error = %err, "Ignoring invalid bearer on optional route");
                    ctx.auth = Some(AuthOutcome::Anonymous);
                    Ok(ctx)
                }
            },
        }
    }
}
