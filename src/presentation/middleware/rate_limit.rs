//! Rate Limiting
//!
//! Fixed-window counters backed by the shared cache. Every route class
//! (api, auth, enhance, admin) carries its own window length, limit, key
//! strategy, and failure policy. The counter increment is a single atomic
//! cache operation, so concurrent requests within a window can never
//! admit more than the configured limit.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::config::{FailurePolicy, KeyStrategy, RouteLimit};
use crate::infrastructure::cache::{keys, Cache};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

use super::pipeline::{RequestContext, Stage};

/// Route classes with independent quota pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Api,
    Auth,
    Enhance,
    Admin,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Api => "api",
            RouteClass::Auth => "auth",
            RouteClass::Enhance => "enhance",
            RouteClass::Admin => "admin",
        }
    }
}

/// Outcome of a rate limit check for one request.
#[derive(Debug, Clone)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp at which the current window closes
    pub reset_at: i64,
    /// Seconds until the window closes, for the Retry-After header
    pub retry_after: u64,
}

/// Fixed-window rate limiter over the shared cache.
#[derive(Clone)]
pub struct RateLimiter {
    cache: Arc<dyn Cache>,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// Check and consume one unit of quota for `key` in `class`.
    ///
    /// The counter key embeds the window start, so a new window begins
    /// with a fresh counter and stale counters expire on their own. The
    /// TTL is one second longer than the window to cover clock skew
    /// between the increment and the window boundary.
    pub async fn check(
        &self,
        class: RouteClass,
        key: &str,
        config: &RouteLimit,
    ) -> Result<RateDecision, AppError> {
        let now = Utc::now().timestamp();
        let window = config.window_seconds as i64;
        let window_start = now - now.rem_euclid(window);
        let reset_at = window_start + window;

        let counter_key = keys::rate_limit(class.as_str(), key, window_start);
        let count = self
            .cache
            .incr_ex(&counter_key, config.window_seconds + 1)
            .await?;

        let limit = u64::from(config.limit);
        let count = count.max(0) as u64;
        let allowed = count <= limit;
        let remaining = limit.saturating_sub(count);
        let retry_after = (reset_at - now).max(1) as u64;

        Ok(RateDecision {
            allowed,
            limit,
            remaining,
            reset_at,
            retry_after,
        })
    }
}

/// Pipeline stage enforcing one route class's quota.
pub struct RateLimitStage {
    limiter: RateLimiter,
    class: RouteClass,
    config: RouteLimit,
}

impl RateLimitStage {
    pub fn new(limiter: RateLimiter, class: RouteClass, config: RouteLimit) -> Self {
        Self {
            limiter,
            class,
            config,
        }
    }

    /// Resolve the quota key per the configured strategy.
    ///
    /// Identity-keyed classes fall back to the client IP for anonymous
    /// requests so that optional-auth routes still get limited.
    fn quota_key(&self, ctx: &RequestContext) -> String {
        match self.config.key_strategy {
            KeyStrategy::Identity => ctx.identity_key().unwrap_or_else(|| ctx.ip_key()),
            KeyStrategy::Ip => ctx.ip_key(),
        }
    }
}

#[async_trait]
impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn process(&self, mut ctx: RequestContext) -> Result<RequestContext, AppError> {
        let key = self.quota_key(&ctx);

        let decision = match self.limiter.check(self.class, &key, &self.config).await {
            Ok(decision) => decision,
            Err(err) => {
                // Counter store unreachable. Admit or reject per the
                // route class policy, never guess.
                return match self.config.failure_policy {
                    FailurePolicy::Open => {
                        tracing::warn!(
                            class = self.class.as_str(),
                            error = %err,
                            "Rate limit store unavailable, failing open"
                        );
                        metrics::record_rate_limit_decision(self.class.as_str(), "fail_open");
                        Ok(ctx)
                    }
                    FailurePolicy::Closed => {
                        tracing::error!(
                            class = self.class.as_str(),
                            error = %err,
                            "Rate limit store unavailable, failing closed"
                        );
                        metrics::record_rate_limit_decision(self.class.as_str(), "fail_closed");
                        Err(AppError::RateLimitUnavailable)
                    }
                };
            }
        };

        if !decision.allowed {
            metrics::record_rate_limit_decision(self.class.as_str(), "limited");
            return Err(AppError::RateLimitExceeded {
                retry_after: decision.retry_after,
            });
        }

        metrics::record_rate_limit_decision(self.class.as_str(), "allowed");
        ctx.rate = Some(decision);
        Ok(ctx)
    }
}
