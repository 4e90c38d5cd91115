//! Session Store Adapter
//!
//! Maps authenticated identities to session metadata in the shared cache.
//! The cache is the single source of truth: the adapter holds no local
//! session state, so it is safe to call concurrently from many request
//! tasks without adapter-local locks. Last-seen overwrite races are
//! benign because the timestamp is monotonic.

use std::sync::Arc;

use crate::domain::session::SessionRecord;
use crate::shared::error::AppError;

use super::keys;
use super::Cache;

/// Session store over the injected shared cache.
#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<dyn Cache>,
    session_ttl: u64,
}

impl SessionStore {
    pub fn new(cache: Arc<dyn Cache>, session_ttl: u64) -> Self {
        Self { cache, session_ttl }
    }

    fn serialize(record: &SessionRecord) -> Result<String, AppError> {
        serde_json::to_string(record)
            .map_err(|e| AppError::Internal(format!("Session serialization failed: {}", e)))
    }

    fn deserialize(data: &str) -> Result<SessionRecord, AppError> {
        serde_json::from_str(data)
            .map_err(|e| AppError::Internal(format!("Session deserialization failed: {}", e)))
    }

    /// Create a new session record with a fresh random identifier.
    ///
    /// Cache failures propagate as `CacheUnavailable`; session tracking
    /// failing must not silently disable auth.
    pub async fn create_session(
        &self,
        subject: &str,
        fingerprint: Option<String>,
    ) -> Result<String, AppError> {
        let record = SessionRecord::new(subject, fingerprint);
        self.write(&record).await?;

        tracing::debug!(subject = %subject, session_id = %record.session_id, "Session created");
        Ok(record.session_id)
    }

    /// Look up a session record, or `SessionExpired` if the cache no
    /// longer holds it.
    pub async fn lookup(&self, session_id: &str) -> Result<SessionRecord, AppError> {
        let data = self
            .cache
            .get(&keys::session(session_id))
            .await?
            .ok_or(AppError::SessionExpired)?;
        Self::deserialize(&data)
    }

    /// Update last-seen and renew the TTL. Idempotent; a session that has
    /// already expired surfaces as `SessionExpired`.
    pub async fn touch(&self, session_id: &str) -> Result<(), AppError> {
        let mut record = self.lookup(session_id).await?;
        record.touch();
        self.write(&record).await
    }

    /// Delete a session record. Safe to call on a missing record.
    pub async fn invalidate(&self, session_id: &str) -> Result<(), AppError> {
        let _ = self.cache.delete(&keys::session(session_id)).await?;
        tracing::debug!(session_id = %session_id, "Session invalidated");
        Ok(())
    }

    /// Record the hash of the latest refresh token issued for a session.
    pub async fn bind_refresh(
        &self,
        session_id: &str,
        refresh_token_hash: &str,
    ) -> Result<(), AppError> {
        let mut record = self.lookup(session_id).await?;
        record.refresh_token_hash = Some(refresh_token_hash.to_string());
        record.touch();
        self.write(&record).await
    }

    /// Rotate the stored refresh-token hash.
    ///
    /// Compares the stored hash against `presented_hash` before writing
    /// the replacement; a mismatch means the presented refresh token was
    /// already rotated out and is rejected with `SessionExpired`.
    ///
    /// The compare-and-write is not atomic across callers: two requests
    /// presenting the same still-current token concurrently can both
    /// rotate, and the slower write wins. Within one session that
    /// requires the client to race itself, so the lost-update window is
    /// accepted; a stolen-then-raced token still invalidates the loser's
    /// pair on the next refresh.
    pub async fn rotate_refresh(
        &self,
        session_id: &str,
        presented_hash: &str,
        new_hash: &str,
    ) -> Result<SessionRecord, AppError> {
        let mut record = self.lookup(session_id).await?;

        match record.refresh_token_hash.as_deref() {
            Some(stored) if stored == presented_hash => {}
            _ => {
                tracing::warn!(
                    session_id = %session_id,
                    "Stale refresh token presented, rejecting"
                );
                return Err(AppError::SessionExpired);
            }
        }

        record.refresh_token_hash = Some(new_hash.to_string());
        record.touch();
        self.write(&record).await?;
        Ok(record)
    }

    async fn write(&self, record: &SessionRecord) -> Result<(), AppError> {
        let data = Self::serialize(record)?;
        self.cache
            .set_ex(&keys::session(&record.session_id), &data, self.session_ttl)
            .await
    }
}
