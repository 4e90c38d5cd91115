//! # Configuration Module
//!
//! This module handles gateway configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__, plus the well-known
//!   JWT_SECRET_KEY / JWT_REFRESH_SECRET_KEY / REDIS_URL / DATABASE_URL)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use prompt_gateway::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Gateway will listen on {}", settings.server_addr());
//! ```

mod settings;

pub use settings::*;
