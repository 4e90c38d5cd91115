//! Session Resolution Stage
//!
//! Looks up the session named by the X-Session-Id header and refreshes
//! its last-seen timestamp. Requests without the header pass through
//! untouched; session tracking is opt-in per request, authentication is
//! not.

use async_trait::async_trait;

use crate::infrastructure::cache::SessionStore;
use crate::shared::error::AppError;

use super::pipeline::{RequestContext, SessionContext, Stage};

pub struct SessionStage {
    store: SessionStore,
}

impl SessionStage {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Stage for SessionStage {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn process(&self, mut ctx: RequestContext) -> Result<RequestContext, AppError> {
        let session_id = match ctx.session_id.clone() {
            Some(id) => id,
            None => return Ok(ctx),
        };

        // A presented but unknown or expired session id is a hard
        // rejection, not a silent downgrade. Callers holding a dead
        // session must re-authenticate.
        let record = self.store.lookup(&session_id).await?;
        self.store.touch(&session_id).await?;

        ctx.session = Some(SessionContext { session_id, record });
        Ok(ctx)
    }
}
