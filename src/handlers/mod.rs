//! HTTP handlers for the relay.

pub mod generate;
pub mod health;

pub use generate::generate_image;
pub use health::{health_check, readiness_check};
