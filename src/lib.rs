//! # Prompt Gateway
//!
//! The authentication, authorization, and rate limiting core of an API
//! gateway:
//! - JWT access/refresh token pairs signed with distinct secrets
//! - Cache-backed session tracking with refresh token rotation
//! - Fixed-window rate limiting with per-route-class policies
//! - Role-based access control
//! - An explicit, ordered middleware pipeline composing the above
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Identity and session value types
//! - **Application Layer**: Token management and the user directory seam
//! - **Infrastructure Layer**: Cache, database, and metrics implementations
//! - **Presentation Layer**: HTTP routes and the middleware pipeline
//!
//! ## Module Structure
//!
//! ```text
//! prompt_gateway/
//! +-- config/        Configuration management
//! +-- domain/        Identity claims, sessions, role requirements
//! +-- application/   Token service, user directory, DTOs
//! +-- infrastructure/ Cache, user directory, metrics
//! +-- presentation/  HTTP routes and the pipeline stages
//! +-- shared/        Common utilities (errors)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP handlers and the pipeline
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
