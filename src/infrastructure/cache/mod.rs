//! Cache Module
//!
//! Shared cache connection management and the adapters built on top of it.
//!
//! This module provides:
//! - Redis connection management with automatic reconnection
//! - The object-safe `Cache` trait the core components are injected with
//! - `RedisCache` (production) and `MemoryCache` (tests, development)
//! - The `SessionStore` adapter
//! - Predefined key prefixes for consistent cache key naming

mod cache_service;
mod session_store;

pub use cache_service::{Cache, MemoryCache, RedisCache};
pub use session_store::SessionStore;

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Creates the production `RedisCache` from configuration settings.
pub async fn create_redis_cache(settings: &RedisSettings) -> Result<RedisCache, redis::RedisError> {
    let conn = create_redis_client(settings).await?;
    Ok(RedisCache::new(
        conn,
        Duration::from_millis(settings.operation_timeout_ms),
    ))
}

/// Cache key prefixes for the gateway's data.
///
/// Use these helpers to ensure consistent key naming across the core.
pub mod keys {
    /// Prefix for session records (e.g., "session:{session_id}")
    pub const SESSION: &str = "session:";

    /// Prefix for rate limit counters
    /// (e.g., "ratelimit:{class}:{key}:{window_start}")
    pub const RATE_LIMIT: &str = "ratelimit:";

    /// Generates a session record key
    #[inline]
    pub fn session(session_id: impl std::fmt::Display) -> String {
        format!("{}{}", SESSION, session_id)
    }

    /// Generates a rate limit counter key for one fixed window
    #[inline]
    pub fn rate_limit(class: &str, key: impl std::fmt::Display, window_start: i64) -> String {
        format!("{}{}:{}:{}", RATE_LIMIT, class, key, window_start)
    }
}
