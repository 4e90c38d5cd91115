//! Route Configuration
//!
//! Wires the route groups to their pipelines. Each group carries exactly
//! one pipeline, assembled here so the full stage order for any endpoint
//! is readable in one place.

use std::sync::Arc;

use axum::{
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{
    pipeline_middleware, AuthMode, AuthStage, Pipeline, RateLimitStage, RoleGuardStage,
    RouteClass, SessionStage, Stage,
};
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // Health and metrics stay outside every pipeline
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// API v1 routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(state.clone()))
        .merge(public_routes(state.clone()))
        .merge(protected_routes(state.clone()))
        .nest("/enhance", enhance_routes(state.clone()))
        .nest("/admin", admin_routes(state.clone()))
        .nest("/dev", developer_routes(state))
}

fn with_pipeline(router: Router<AppState>, pipeline: Pipeline) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(
        Arc::new(pipeline),
        pipeline_middleware,
    ))
}

fn session_stage(state: &AppState) -> Arc<dyn Stage> {
    Arc::new(SessionStage::new(state.sessions.clone()))
}

fn auth_stage(state: &AppState, mode: AuthMode) -> Arc<dyn Stage> {
    Arc::new(AuthStage::new(state.tokens.clone(), mode))
}

fn rate_stage(state: &AppState, class: RouteClass) -> Arc<dyn Stage> {
    let config = match class {
        RouteClass::Api => state.settings.rate_limit.api.clone(),
        RouteClass::Auth => state.settings.rate_limit.auth.clone(),
        RouteClass::Enhance => state.settings.rate_limit.enhance.clone(),
        RouteClass::Admin => state.settings.rate_limit.admin.clone(),
    };
    Arc::new(RateLimitStage::new(state.limiter.clone(), class, config))
}

/// Login, refresh, and logout. IP-keyed limits, no token demanded; the
/// caller is here precisely because it has no usable token.
fn auth_routes(state: AppState) -> Router<AppState> {
    let pipeline = Pipeline::new(
        "auth",
        vec![
            session_stage(&state),
            auth_stage(&state, AuthMode::Optional),
            rate_stage(&state, RouteClass::Auth),
        ],
    );

    with_pipeline(
        Router::new()
            .route("/login", post(handlers::auth::login))
            .route("/refresh", post(handlers::auth::refresh_token))
            .route("/logout", post(handlers::auth::logout)),
        pipeline,
    )
}

/// Optional-auth routes. Anonymous callers are served and metered by
/// client IP; authenticated callers are metered by identity.
fn public_routes(state: AppState) -> Router<AppState> {
    let pipeline = Pipeline::new(
        "public",
        vec![
            session_stage(&state),
            auth_stage(&state, AuthMode::Optional),
            rate_stage(&state, RouteClass::Api),
        ],
    );

    with_pipeline(
        Router::new().route("/analyze", post(handlers::prompt::analyze)),
        pipeline,
    )
}

/// General protected routes under the default API quota
fn protected_routes(state: AppState) -> Router<AppState> {
    let pipeline = Pipeline::new(
        "protected",
        vec![
            session_stage(&state),
            auth_stage(&state, AuthMode::Required),
            rate_stage(&state, RouteClass::Api),
        ],
    );

    with_pipeline(
        Router::new().route("/profile", get(handlers::auth::profile)),
        pipeline,
    )
}

/// Prompt enhancement, under its own tighter quota
fn enhance_routes(state: AppState) -> Router<AppState> {
    let pipeline = Pipeline::new(
        "enhance",
        vec![
            session_stage(&state),
            auth_stage(&state, AuthMode::Required),
            rate_stage(&state, RouteClass::Enhance),
        ],
    );

    with_pipeline(
        Router::new().route("/", post(handlers::prompt::enhance)),
        pipeline,
    )
}

/// Admin-only routes
fn admin_routes(state: AppState) -> Router<AppState> {
    let pipeline = Pipeline::new(
        "admin",
        vec![
            session_stage(&state),
            auth_stage(&state, AuthMode::Required),
            rate_stage(&state, RouteClass::Admin),
            Arc::new(RoleGuardStage::any_of(["admin"])),
        ],
    );

    with_pipeline(
        Router::new().route("/overview", get(handlers::admin::overview)),
        pipeline,
    )
}

/// Developer tooling, open to developer and admin roles
fn developer_routes(state: AppState) -> Router<AppState> {
    let pipeline = Pipeline::new(
        "developer",
        vec![
            session_stage(&state),
            auth_stage(&state, AuthMode::Required),
            rate_stage(&state, RouteClass::Api),
            Arc::new(RoleGuardStage::any_of(["developer", "admin"])),
        ],
    );

    with_pipeline(
        Router::new().route("/status", get(handlers::admin::dev_status)),
        pipeline,
    )
}
