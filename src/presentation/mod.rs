//! Presentation Layer
//!
//! HTTP surface and the middleware pipeline in front of it.

pub mod http;
pub mod middleware;
