//! PostgreSQL User Directory
//!
//! Production implementation of the `UserDirectory` trait against the
//! users table. This is the only component that touches the database;
//! everything on the per-request path goes through the shared cache.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::application::services::directory::{verify_password, DirectoryUser, UserDirectory};
use crate::config::DatabaseSettings;
use crate::shared::error::AppError;

/// Create the user directory connection pool
pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.url)
        .await
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    password_hash: String,
    roles: Vec<String>,
}

/// PostgreSQL user directory.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn authenticate(&self, email: &str, password: &str) -> Result<DirectoryUser, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id::text AS id, password_hash, roles
            FROM users
            WHERE email = $1 AND is_active
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Directory query failed: {}", e)))?
        .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &row.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let roles: HashSet<String> = row.roles.into_iter().collect();
        if roles.is_empty() {
            // A zero-role account cannot authenticate; it would produce an
            // identity the pipeline is not allowed to represent.
            tracing::warn!(email = %email, "Account has no roles, refusing login");
            return Err(AppError::InvalidCredentials);
        }

        Ok(DirectoryUser {
            subject: row.id,
            roles,
        })
    }
}
