//! Response DTOs
//!
//! Data structures for API response bodies.

use serde::Serialize;

use crate::application::services::token_service::TokenPair;

/// Authentication tokens response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub session_id: String,
}

impl TokenResponse {
    pub fn from_pair(pair: TokenPair, session_id: String) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
            token_type: pair.token_type,
            session_id,
        }
    }
}

/// Identity echo for the profile endpoint
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub subject: String,
    pub roles: Vec<String>,
    pub issuer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}
