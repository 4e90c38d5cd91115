//! Cache Service
//!
//! The shared key-value cache contract and its implementations.
//!
//! This module provides:
//! - A `Cache` trait covering the operations the gateway core needs:
//!   get/set/delete with TTL, and an atomic increment-with-expiry
//! - A `RedisCache` implementation with bounded per-operation timeouts
//! - A `MemoryCache` fake for tests and single-process development
//!
//! The trait is object-safe on purpose: components receive an injected
//! `Arc<dyn Cache>` so the backing store can be substituted without
//! touching the core (serialization is the adapters' concern).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, instrument};

use crate::shared::error::AppError;

/// Shared cache contract.
///
/// All cross-request coordination in the gateway goes through this trait;
/// no component holds private mutable state beyond configuration.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Retrieves the raw value stored at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Stores `value` at `key` with a time-to-live in seconds.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), AppError>;

    /// Deletes `key`. Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, AppError>;

    /// Checks whether `key` exists.
    async fn exists(&self, key: &str) -> Result<bool, AppError>;

    /// Sets a time-to-live on an existing key. Returns false if the key
    /// does not exist.
    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool, AppError>;

    /// Remaining time-to-live in seconds, or None if the key is missing
    /// or has no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<i64>, AppError>;

    /// Atomically increments the integer at `key`, installing `ttl_seconds`
    /// when the key is first created. Returns the post-increment value.
    ///
    /// This is the one primitive the rate limiter requires to be truly
    /// atomic: two concurrent callers must observe a consistent total
    /// count with no lost updates.
    async fn incr_ex(&self, key: &str, ttl_seconds: u64) -> Result<i64, AppError>;
}

/// Redis-backed cache implementation.
///
/// Uses a Redis ConnectionManager for connection pooling and automatic
/// reconnection. Every operation is bounded by a configurable timeout;
/// an overrun surfaces as `UpstreamTimeout` rather than hanging the
/// request.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager, op_timeout: Duration) -> Self {
        Self { conn, op_timeout }
    }

    /// Runs a cache future under the operation time budget.
    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, redis::RedisError>> + Send,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(|e| AppError::CacheUnavailable(e.to_string())),
            Err(_) => Err(AppError::UpstreamTimeout),
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        let result: Option<String> = self.bounded(async move { conn.get(&key).await }).await?;
        Ok(result)
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        debug!(key = %key, ttl = ttl_seconds, "Cache set with expiry");
        let key = key.to_string();
        let value = value.to_string();
        self.bounded(async move { conn.set_ex::<_, _, ()>(&key, value, ttl_seconds).await })
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        let deleted: u64 = self.bounded(async move { conn.del(&key).await }).await?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self), level = "debug")]
    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        let exists: bool = self.bounded(async move { conn.exists(&key).await }).await?;
        Ok(exists)
    }

    #[instrument(skip(self), level = "debug")]
    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        // Redis EXPIRE returns 1 if the timeout was set, 0 if the key is gone
        let result: i32 = self
            .bounded(async move { conn.expire(&key, ttl_seconds as i64).await })
            .await?;
        Ok(result == 1)
    }

    #[instrument(skip(self), level = "debug")]
    async fn ttl(&self, key: &str) -> Result<Option<i64>, AppError> {
        let mut conn = self.conn.clone();
        let key = key.to_string();
        let ttl: i64 = self.bounded(async move { conn.ttl(&key).await }).await?;

        // Redis TTL returns -2 for a missing key, -1 for no expiration
        Ok(match ttl {
            -2 | -1 => None,
            _ => Some(ttl),
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn incr_ex(&self, key: &str, ttl_seconds: u64) -> Result<i64, AppError> {
        // INCR and first-touch EXPIRE must land as one atomic unit so that
        // concurrent requests in the same window never observe a stale
        // count or leave an immortal counter behind.
        let script = redis::Script::new(
            r#"
            local count = redis.call('INCR', KEYS[1])
            if count == 1 then
                redis.call('EXPIRE', KEYS[1], ARGV[1])
            end
            return count
            "#,
        );

        let mut conn = self.conn.clone();
        let key = key.to_string();
        let count: i64 = self
            .bounded(async move {
                script
                    .key(&key)
                    .arg(ttl_seconds)
                    .invoke_async(&mut conn)
                    .await
            })
            .await?;
        Ok(count)
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("op_timeout", &self.op_timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

/// In-process cache fake with the same TTL semantics as Redis.
///
/// Backs tests and single-process development; a mutex around the map is
/// enough to give `incr_ex` the required atomicity.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_value(entry: &MemoryEntry) -> Option<&MemoryEntry> {
        match entry.expires_at {
            Some(deadline) if Instant::now() >= deadline => None,
            _ => Some(entry),
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut entries = self.entries.lock();
        match entries.get(key).and_then(Self::live_value) {
            Some(entry) => Ok(Some(entry.value.clone())),
            None => {
                entries.remove(key);
                Ok(None)
            }
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), AppError> {
        self.entries.lock().insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_seconds)),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.entries.lock().remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool, AppError> {
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(entry) if Self::live_value(entry).is_some() => {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl_seconds));
                Ok(true)
            }
            _ => {
                entries.remove(key);
                Ok(false)
            }
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<i64>, AppError> {
        let entries = self.entries.lock();
        Ok(entries
            .get(key)
            .and_then(Self::live_value)
            .and_then(|entry| entry.expires_at)
            .map(|deadline| deadline.saturating_duration_since(Instant::now()).as_secs() as i64))
    }

    async fn incr_ex(&self, key: &str, ttl_seconds: u64) -> Result<i64, AppError> {
        let mut entries = self.entries.lock();

        let live = entries.get(key).and_then(Self::live_value).cloned();
        let count = match live {
            Some(entry) => entry
                .value
                .parse::<i64>()
                .map_err(|_| AppError::Internal(format!("non-integer counter at {key}")))?
                + 1,
            None => 1,
        };

        let expires_at = if count == 1 {
            Some(Instant::now() + Duration::from_secs(ttl_seconds))
        } else {
            entries.get(key).and_then(|e| e.expires_at)
        };

        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: count.to_string(),
                expires_at,
            },
        );
        Ok(count)
    }
}
