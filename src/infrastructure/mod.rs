//! Infrastructure Layer
//!
//! Implementations for external collaborators:
//! - Shared cache (Redis) and the session store built on it
//! - The PostgreSQL-backed user directory
//! - Prometheus metrics

pub mod cache;
pub mod directory;
pub mod metrics;
