//! Token Manager
//!
//! Issues, validates, and refreshes signed access/refresh token pairs.
//! Access and refresh tokens are signed with distinct secrets so that
//! compromise of one key family cannot forge the other. Pure
//! cryptographic computation; no I/O.

use std::collections::HashSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::JwtSettings;
use crate::domain::identity::{IdentityClaims, TokenType};
use crate::shared::error::AppError;

/// An issued access/refresh pair. Both strings are opaque to callers.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds
    pub expires_in: i64,
    pub token_type: String,
}

/// JWT wire claims.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject (user identifier)
    sub: String,
    /// Roles held by the principal
    roles: Vec<String>,
    /// Expiration time (Unix timestamp)
    exp: i64,
    /// Issued at time (Unix timestamp)
    iat: i64,
    /// Issuer
    iss: String,
    /// Unique token id. Timestamps have second granularity, so without
    /// this a pair reissued within one second would be byte-identical to
    /// its predecessor and rotation could not distinguish them.
    jti: String,
    /// Token type discriminant
    token_use: TokenType,
}

/// Issues and validates token pairs.
pub struct TokenManager {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenManager {
    /// Build a token manager from JWT settings.
    ///
    /// Fails with `Config` if either signing secret is unset or too
    /// short; a gateway with forgeable tokens must not start.
    pub fn new(settings: &JwtSettings) -> Result<Self, AppError> {
        settings.validate_secrets().map_err(AppError::Config)?;

        Ok(Self {
            access_encoding: EncodingKey::from_secret(settings.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(settings.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(settings.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(settings.refresh_secret.as_bytes()),
            issuer: settings.issuer.clone(),
            access_ttl: Duration::minutes(settings.access_token_expiry_minutes),
            refresh_ttl: Duration::days(settings.refresh_token_expiry_days),
        })
    }

    /// Issue a fresh access/refresh pair for a subject.
    ///
    /// The role set must be non-empty: a principal with no roles is an
    /// anonymous request, not a zero-role identity.
    pub fn issue(&self, subject: &str, roles: &HashSet<String>) -> Result<TokenPair, AppError> {
        if roles.is_empty() {
            return Err(AppError::Internal(format!(
                "refusing to issue tokens for {subject} with an empty role set"
            )));
        }

        let now = Utc::now();
        let access_token = self.sign(subject, roles, now, TokenType::Access)?;
        let refresh_token = self.sign(subject, roles, now, TokenType::Refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl.num_seconds(),
            token_type: "Bearer".to_string(),
        })
    }

    /// Verify signature, expiry, issuer, and token-type match.
    ///
    /// Failures are distinct so the pipeline can choose a precise
    /// response: `ExpiredToken` prompts a refresh, the rest reject
    /// outright.
    pub fn validate(
        &self,
        token: &str,
        expected_type: TokenType,
    ) -> Result<IdentityClaims, AppError> {
        let (decoding, other_decoding) = match expected_type {
            TokenType::Access => (&self.access_decoding, &self.refresh_decoding),
            TokenType::Refresh => (&self.refresh_decoding, &self.access_decoding),
        };

        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        // Expiry is checked manually below to make the boundary inclusive
        validation.leeway = 0;
        validation.validate_exp = false;

        let claims = match decode::<Claims>(token, decoding, &validation) {
            Ok(token_data) => token_data.claims,
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    // The key families are distinct, so a token of the
                    // other type fails signature here. Diagnose type
                    // confusion precisely rather than reporting a forgery.
                    return match decode::<Claims>(token, other_decoding, &validation) {
                        Ok(other) if other.claims.token_use != expected_type => {
                            Err(AppError::WrongTokenType)
                        }
                        _ => Err(AppError::InvalidSignature),
                    };
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    return Err(AppError::InvalidSignature)
                }
                _ => return Err(AppError::MalformedToken),
            },
        };

        // A token is invalid at its expiry instant, not only after it.
        if claims.exp <= Utc::now().timestamp() {
            return Err(AppError::ExpiredToken);
        }

        if claims.token_use != expected_type {
            return Err(AppError::WrongTokenType);
        }

        self.into_identity(claims)
    }

    /// Validate a refresh token and issue a brand-new pair.
    ///
    /// Rotation is stateless here; revoke-on-rotation is enforced by the
    /// session store, which tracks the hash of the latest refresh token.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = self.validate(refresh_token, TokenType::Refresh)?;
        self.issue(&claims.subject, &claims.roles)
    }

    /// SHA-256 hash of a refresh token, for storage in the session record.
    pub fn hash_refresh_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn sign(
        &self,
        subject: &str,
        roles: &HashSet<String>,
        now: DateTime<Utc>,
        token_type: TokenType,
    ) -> Result<String, AppError> {
        let (encoding, ttl) = match token_type {
            TokenType::Access => (&self.access_encoding, self.access_ttl),
            TokenType::Refresh => (&self.refresh_encoding, self.refresh_ttl),
        };

        let claims = Claims {
            sub: subject.to_string(),
            roles: roles.iter().cloned().collect(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
            token_use: token_type,
        };

        encode(&Header::default(), &claims, encoding)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    fn into_identity(&self, claims: Claims) -> Result<IdentityClaims, AppError> {
        let issued_at = Utc
            .timestamp_opt(claims.iat, 0)
            .single()
            .ok_or(AppError::MalformedToken)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(AppError::MalformedToken)?;

        if expires_at <= issued_at {
            return Err(AppError::MalformedToken);
        }

        let roles: HashSet<String> = claims.roles.into_iter().collect();
        if roles.is_empty() {
            return Err(AppError::MalformedToken);
        }

        Ok(IdentityClaims {
            subject: claims.sub,
            roles,
            issued_at,
            expires_at,
            token_type: claims.token_use,
            issuer: claims.iss,
        })
    }
}
