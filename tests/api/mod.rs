//! API Tests

mod auth_tests;
mod health_tests;
mod pipeline_tests;
mod rate_limit_tests;
