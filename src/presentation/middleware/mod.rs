//! Middleware
//!
//! The gateway's request pipeline and its stages.

pub mod auth;
pub mod guard;
pub mod pipeline;
pub mod rate_limit;
pub mod session;

pub use auth::{AuthMode, AuthStage};
pub use guard::RoleGuardStage;
pub use pipeline::{pipeline_middleware, Pipeline, RequestContext, SessionContext, Stage};
pub use rate_limit::{RateDecision, RateLimitStage, RateLimiter, RouteClass};
pub use session::SessionStage;
