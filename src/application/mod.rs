//! Application Layer
//!
//! Business services (token management, user directory) and data transfer
//! objects. This layer orchestrates the flow between the presentation and
//! domain layers.

pub mod dto;
pub mod services;
