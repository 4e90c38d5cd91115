//! Application Services
//!
//! Token issuance/validation and the user directory seam.

pub mod directory;
pub mod token_service;

pub use directory::{DirectoryUser, StaticUserDirectory, UserDirectory};
pub use token_service::{TokenManager, TokenPair};
