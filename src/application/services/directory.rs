//! User Directory
//!
//! Resolves a login credential pair to a subject identifier and role set.
//! Invoked only during login; the per-request pipeline never touches it.
//! The directory is an injected collaborator so the backing store can be
//! swapped (PostgreSQL in production, an in-memory table in tests).

use std::collections::{HashMap, HashSet};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::shared::error::AppError;

/// A directory entry resolved from a credential pair.
#[derive(Debug, Clone)]
pub struct DirectoryUser {
    /// Subject identifier used in token claims and session records
    pub subject: String,

    /// Roles held by the principal; never empty for a real user
    pub roles: HashSet<String>,
}

/// Resolves login credentials to an identity.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Verify a credential pair. Fails with `InvalidCredentials` for an
    /// unknown email or a wrong password; the two cases are deliberately
    /// indistinguishable to the caller.
    async fn authenticate(&self, email: &str, password: &str) -> Result<DirectoryUser, AppError>;
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Debug, Clone)]
struct StaticEntry {
    subject: String,
    password_hash: String,
    roles: HashSet<String>,
}

/// In-memory directory for tests and single-process development.
#[derive(Default)]
pub struct StaticUserDirectory {
    users: RwLock<HashMap<String, StaticEntry>>,
}

impl StaticUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user keyed by email. Hashes the password with Argon2id, same
    /// as the production directory.
    pub fn add_user<I, S>(
        &self,
        email: &str,
        password: &str,
        subject: &str,
        roles: I,
    ) -> Result<(), AppError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = StaticEntry {
            subject: subject.to_string(),
            password_hash: hash_password(password)?,
            roles: roles.into_iter().map(Into::into).collect(),
        };
        self.users.write().insert(email.to_string(), entry);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn authenticate(&self, email: &str, password: &str) -> Result<DirectoryUser, AppError> {
        let entry = self
            .users
            .read()
            .get(email)
            .cloned()
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &entry.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        Ok(DirectoryUser {
            subject: entry.subject,
            roles: entry.roles,
        })
    }
}
