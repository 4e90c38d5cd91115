//! Shared Utilities
//!
//! Error types and other cross-cutting helpers.

pub mod error;

pub use error::{AppError, ErrorResponse};
