//! Access Control Stage
//!
//! Role-based authorization over the identity resolved by the auth
//! stage. A request passes when the token's role set intersects the
//! route's required roles; otherwise 403. Anonymous requests reaching a
//! guarded route are a pipeline ordering bug and are rejected as
//! unauthenticated rather than forbidden.

use async_trait::async_trait;

use crate::domain::identity::{AuthOutcome, RoleRequirement};
use crate::shared::error::AppError;

use super::pipeline::{RequestContext, Stage};

pub struct RoleGuardStage {
    requirement: RoleRequirement,
}

impl RoleGuardStage {
    pub fn new(requirement: RoleRequirement) -> Self {
        Self { requirement }
    }

    /// Guard requiring any one of the named roles.
    pub fn any_of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(RoleRequirement::new(roles))
    }
}

#[async_trait]
impl Stage for RoleGuardStage {
    fn name(&self) -> &'static str {
        "role_guard"
    }

    async fn process(&self, ctx: RequestContext) -> Result<RequestContext, AppError> {
        let claims = match ctx.auth.as_ref().and_then(AuthOutcome::claims) {
            Some(claims) => claims,
            None => return Err(AppError::Unauthenticated),
        };

        if !self.requirement.is_satisfied_by(claims) {
            tracing::debug!(
                subject = %claims.subject,
                "Role requirement not met"
            );
            return Err(AppError::Forbidden);
        }

        Ok(ctx)
    }
}
