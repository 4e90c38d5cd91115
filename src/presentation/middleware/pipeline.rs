//! Middleware Pipeline
//!
//! Orders and composes the gateway stages into a per-request decision
//! chain. A pipeline is an explicit, ordered list of stage values sharing
//! a uniform `process(context) -> context | rejection` contract. There is
//! no implicit registration order and no reflection-based discovery.
//!
//! Per-request flow: session resolution, authentication, rate limiting,
//! authorization, handoff. Rate limiting runs after authentication so
//! limits can be identity-scoped, and before authorization so that
//! forbidden requests still consume quota (role probing is not free).
//!
//! Stages consume and return the request context; they never mutate
//! shared state except through the session store's and rate limiter's
//! own atomic cache operations.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::header::{self, AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::domain::identity::AuthOutcome;
use crate::domain::session::SessionRecord;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

use super::rate_limit::RateDecision;

/// Session data attached to the request after session resolution.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub record: SessionRecord,
}

/// Request-scoped context threaded through the stages.
///
/// Each stage takes ownership and returns an augmented copy; nothing here
/// is shared between requests.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Bearer token from the Authorization header, if present
    pub bearer_token: Option<String>,

    /// Session identifier from the X-Session-Id header, if present
    pub session_id: Option<String>,

    /// Client IP, from the socket or a forwarding header
    pub client_ip: Option<IpAddr>,

    /// Resolved session, set by the session stage
    pub session: Option<SessionContext>,

    /// Authentication outcome, set by the auth stage
    pub auth: Option<AuthOutcome>,

    /// Rate limiter decision, set by the rate limit stage
    pub rate: Option<RateDecision>,
}

impl RequestContext {
    /// Build the initial context from an inbound request.
    pub fn from_request(request: &Request, socket_ip: Option<IpAddr>) -> Self {
        let bearer_token = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string);

        let session_id = request
            .headers()
            .get("x-session-id")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        Self {
            bearer_token,
            session_id,
            client_ip: extract_client_ip(request, socket_ip),
            session: None,
            auth: None,
            rate: None,
        }
    }

    /// The rate-limit key for this request: subject when authenticated,
    /// client IP otherwise.
    pub fn identity_key(&self) -> Option<String> {
        self.auth
            .as_ref()
            .and_then(AuthOutcome::claims)
            .map(|claims| format!("user:{}", claims.subject))
    }

    pub fn ip_key(&self) -> String {
        match self.client_ip {
            Some(ip) => format!("ip:{}", ip),
            None => "ip:unknown".to_string(),
        }
    }
}

/// One unit of the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Consume the context and either augment it or reject the request.
    async fn process(&self, ctx: RequestContext) -> Result<RequestContext, AppError>;
}

/// An ordered chain of stages for one route group.
pub struct Pipeline {
    group: &'static str,
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn new(group: &'static str, stages: Vec<Arc<dyn Stage>>) -> Self {
        Self { group, stages }
    }

    pub fn group(&self) -> &'static str {
        self.group
    }

    /// Run every stage in order. The first rejection is terminal.
    pub async fn run(&self, mut ctx: RequestContext) -> Result<RequestContext, AppError> {
        for stage in &self.stages {
            ctx = match stage.process(ctx).await {
                Ok(ctx) => ctx,
                Err(reason) => {
                    tracing::debug!(
                        group = self.group,
                        stage = stage.name(),
                        reason = %reason,
                        "Request rejected"
                    );
                    metrics::record_pipeline_verdict(
                        self.group,
                        &reason.reason_code().to_string(),
                    );
                    return Err(reason);
                }
            };
        }

        metrics::record_pipeline_verdict(self.group, "forwarded");
        Ok(ctx)
    }
}

/// Extract the client IP for rate limiting.
///
/// Priority: X-Forwarded-For (first hop), X-Real-IP, then the socket
/// address. Forwarding headers are only as trustworthy as the proxy in
/// front of the gateway.
fn extract_client_ip(request: &Request, socket_ip: Option<IpAddr>) -> Option<IpAddr> {
    if let Some(forwarded_for) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first) = forwarded_for.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }

    if let Some(real_ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
    {
        if let Ok(ip) = real_ip.parse::<IpAddr>() {
            return Some(ip);
        }
    }

    socket_ip
}

/// Axum adapter: runs a route group's pipeline, then either forwards the
/// request with the resolved context attached to its extensions or
/// converts the rejection into a response.
pub async fn pipeline_middleware(
    State(pipeline): State<Arc<Pipeline>>,
    mut request: Request,
    next: Next,
) -> Response {
    let socket_ip = request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip());
    let ctx = RequestContext::from_request(&request, socket_ip);

    match pipeline.run(ctx).await {
        Ok(ctx) => {
            if let Some(auth) = ctx.auth.clone() {
                request.extensions_mut().insert(auth);
            }
            if let Some(session) = ctx.session.clone() {
                request.extensions_mut().insert(session);
            }

            let mut response = next.run(request).await;
            if let Some(rate) = &ctx.rate {
                add_rate_limit_headers(response.headers_mut(), rate);
            }
            response
        }
        Err(reason) => reason.into_response(),
    }
}

/// Add rate limit headers to a response.
///
/// Headers follow the IETF draft standard for rate limiting:
/// https://datatracker.ietf.org/doc/draft-ietf-httpapi-ratelimit-headers/
pub fn add_rate_limit_headers(headers: &mut header::HeaderMap, decision: &RateDecision) {
    if let Ok(v) = header::HeaderValue::from_str(&decision.limit.to_string()) {
        headers.insert("X-RateLimit-Limit", v);
    }
    if let Ok(v) = header::HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", v);
    }
    if let Ok(v) = header::HeaderValue::from_str(&decision.reset_at.to_string()) {
        headers.insert("X-RateLimit-Reset", v);
    }
}
