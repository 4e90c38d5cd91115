//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all gateway settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// User directory database (PostgreSQL)
    pub database: DatabaseSettings,

    /// Shared cache configuration (Redis)
    pub redis: RedisSettings,

    /// JWT authentication settings
    pub jwt: JwtSettings,

    /// Session tracking configuration
    pub session: SessionSettings,

    /// Per-route-class rate limiting configuration
    pub rate_limit: RateLimitSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL configuration for the user directory.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: String,

    /// Time budget for a single cache round-trip, in milliseconds.
    /// Stages fail with `UpstreamTimeout` instead of hanging past it.
    pub operation_timeout_ms: u64,
}

/// JWT authentication configuration.
///
/// Access and refresh tokens are signed with distinct secrets so that
/// compromise of one key family cannot forge the other.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing access tokens
    pub access_secret: String,

    /// Secret key for signing refresh tokens
    pub refresh_secret: String,

    /// Issuer string embedded in and required from every token
    pub issuer: String,

    /// Access token expiry in minutes
    pub access_token_expiry_minutes: i64,

    /// Refresh token expiry in days
    pub refresh_token_expiry_days: i64,
}

/// Session tracking configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Session record TTL in seconds; expiry is enforced by the cache
    pub ttl_seconds: u64,
}

/// Whether limiter counters key on the authenticated identity or the
/// client IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    Identity,
    Ip,
}

/// Behavior when the limiter cannot reach the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Allow the request through with a warning log (read-only endpoints)
    Open,
    /// Reject with `RateLimitUnavailable` (mutating/expensive endpoints)
    Closed,
}

/// Fixed-window limit for one route class.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteLimit {
    /// Window duration in seconds
    pub window_seconds: u64,

    /// Maximum requests per window
    pub limit: u32,

    /// Identity-keyed or IP-keyed counters
    pub key_strategy: KeyStrategy,

    /// Fail-open or fail-closed on cache unavailability
    pub failure_policy: FailurePolicy,
}

/// Rate limiting configuration, one entry per route class.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Default for plain API routes
    pub api: RouteLimit,

    /// Login/refresh endpoints (strict, IP-keyed)
    pub auth: RouteLimit,

    /// Enhancement endpoints (expensive, fail-closed)
    pub enhance: RouteLimit,

    /// Admin and developer routes
    pub admin: RouteLimit,
}

/// Minimum required length for JWT secrets (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if either JWT secret is missing or too short.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("redis.operation_timeout_ms", 50)?
            .set_default("jwt.issuer", "betterprompts")?
            .set_default("jwt.access_token_expiry_minutes", 15)?
            .set_default("jwt.refresh_token_expiry_days", 7)?
            .set_default("session.ttl_seconds", 7 * 24 * 60 * 60)?
            // Per-route-class limiter defaults. Read-heavy API traffic
            // fails open; auth, enhancement, and admin traffic fails closed.
            .set_default("rate_limit.api.window_seconds", 60)?
            .set_default("rate_limit.api.limit", 60)?
            .set_default("rate_limit.api.key_strategy", "identity")?
            .set_default("rate_limit.api.failure_policy", "open")?
            .set_default("rate_limit.auth.window_seconds", 60)?
            .set_default("rate_limit.auth.limit", 5)?
            .set_default("rate_limit.auth.key_strategy", "ip")?
            .set_default("rate_limit.auth.failure_policy", "closed")?
            .set_default("rate_limit.enhance.window_seconds", 60)?
            .set_default("rate_limit.enhance.limit", 20)?
            .set_default("rate_limit.enhance.key_strategy", "identity")?
            .set_default("rate_limit.enhance.failure_policy", "closed")?
            .set_default("rate_limit.admin.window_seconds", 60)?
            .set_default("rate_limit.admin.limit", 30)?
            .set_default("rate_limit.admin.key_strategy", "identity")?
            .set_default("rate_limit.admin.failure_policy", "closed")?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__SERVER__PORT=8080 -> server.port = 8080
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("jwt.access_secret", std::env::var("JWT_SECRET_KEY").ok())?
            .set_override_option(
                "jwt.refresh_secret",
                std::env::var("JWT_REFRESH_SECRET_KEY").ok(),
            )?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                settings.jwt.validate_secrets().map_err(ConfigError::Message)?;
                Ok(settings)
            })
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl JwtSettings {
    /// Validate that both key families are present and long enough.
    ///
    /// Fatal at startup: a gateway with forgeable tokens must not serve.
    pub fn validate_secrets(&self) -> Result<(), String> {
        for (name, secret) in [
            ("access", &self.access_secret),
            ("refresh", &self.refresh_secret),
        ] {
            if secret.len() < MIN_JWT_SECRET_LENGTH {
                return Err(format!(
                    "JWT {} secret must be at least {} characters. Current length: {}",
                    name,
                    MIN_JWT_SECRET_LENGTH,
                    secret.len()
                ));
            }
        }
        if self.access_secret == self.refresh_secret {
            return Err("JWT access and refresh secrets must be distinct".into());
        }
        Ok(())
    }
}
