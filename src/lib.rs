pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod startup;
pub mod telemetry;
