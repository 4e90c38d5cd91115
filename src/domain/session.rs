//! Session record stored in the shared cache.
//!
//! Created on login, touched on each authenticated request, deleted on
//! logout. Expiry is enforced by the cache TTL, not by explicit sweeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session metadata keyed by an opaque session identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque session identifier, generated at login
    pub session_id: String,

    /// Subject this session belongs to
    pub subject: String,

    /// SHA-256 hash of the latest refresh token issued for this session.
    /// Refresh rotation compares against this hash, so a rotated-out
    /// refresh token stops being usable (never store raw tokens).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_hash: Option<String>,

    /// Optional device/client fingerprint captured at login
    pub fingerprint: Option<String>,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session last saw an authenticated request. Monotonic;
    /// concurrent overwrite races are benign.
    pub last_seen: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a new session record with a fresh random identifier.
    pub fn new(subject: impl Into<String>, fingerprint: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            subject: subject.into(),
            refresh_token_hash: None,
            fingerprint,
            created_at: now,
            last_seen: now,
        }
    }

    /// Update the last-seen timestamp.
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }
}
