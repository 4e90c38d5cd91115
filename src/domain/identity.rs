//! Identity model: verified token claims, role requirements, and the
//! authenticated-or-anonymous outcome threaded through the pipeline.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token type discriminant carried in the `token_use` claim.
///
/// Access and refresh tokens are structurally identical but signed with
/// distinct secrets and must never be accepted in each other's place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The decoded, verified payload of a token.
///
/// Invariants: `expires_at > issued_at`, and `roles` is non-empty; a
/// principal with no roles is modelled as an anonymous request
/// ([`AuthOutcome::Anonymous`]), never as a zero-role identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject (user identifier)
    pub subject: String,

    /// Roles held by the principal
    pub roles: HashSet<String>,

    /// When the token was issued
    pub issued_at: DateTime<Utc>,

    /// When the token expires (exclusive: the token is invalid at this instant)
    pub expires_at: DateTime<Utc>,

    /// Access or refresh
    pub token_type: TokenType,

    /// Issuer string
    pub issuer: String,
}

impl IdentityClaims {
    /// Whether the identity holds the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Tagged authentication outcome attached to the request context.
///
/// Optional-auth routes proceed on the `Anonymous` branch (IP-keyed rate
/// limiting, no role guard); protected routes require `Authenticated`.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    Authenticated(IdentityClaims),
    Anonymous,
}

impl AuthOutcome {
    pub fn claims(&self) -> Option<&IdentityClaims> {
        match self {
            Self::Authenticated(claims) => Some(claims),
            Self::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// A set of acceptable roles attached to a route group.
///
/// Satisfied when the identity's role set intersects it non-emptily.
/// Static configuration; never mutated at runtime.
#[derive(Debug, Clone)]
pub struct RoleRequirement {
    roles: HashSet<String>,
}

impl RoleRequirement {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Pure intersection check against an identity's roles.
    pub fn is_satisfied_by(&self, claims: &IdentityClaims) -> bool {
        self.roles.iter().any(|role| claims.has_role(role))
    }

    pub fn roles(&self) -> &HashSet<String> {
        &self.roles
    }
}
