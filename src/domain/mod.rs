//! # Domain Layer
//!
//! Core types of the access-control core, independent of any framework
//! or infrastructure concern.
//!
//! - **identity**: verified token claims, role requirements, auth outcomes
//! - **session**: the session record tracked in the shared cache

pub mod identity;
pub mod session;

pub use identity::{AuthOutcome, IdentityClaims, RoleRequirement, TokenType};
pub use session::SessionRecord;
