//! Image provider abstractions and implementations.
//!
//! This module provides a trait-based abstraction over the hosted inference
//! backend, allowing the real Replicate client and the test mock to be
//! swapped behind the same interface.

pub mod mock;
pub mod replicate;

pub use mock::MockImageProvider;
pub use replicate::{ReplicateConfig, ReplicateProvider};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Error type for provider operations.
///
/// The handler boundary collapses every variant to the same HTTP 500 shape;
/// the variants exist so causes stay distinguishable in logs and metrics.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response from model: {0}")]
    UnexpectedResponse(String),

    #[error("No image returned from model")]
    NoImage,

    #[error("Generation failed: {0}")]
    Failed(String),
}

impl ProviderError {
    /// Stable label for the provider error metrics series.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::Authentication(_) => "authentication",
            ProviderError::RateLimited(_) => "rate_limited",
            ProviderError::Api(_) => "api",
            ProviderError::Network(_) => "network",
            ProviderError::UnexpectedResponse(_) => "unexpected_response",
            ProviderError::NoImage => "no_image",
            ProviderError::Failed(_) => "generation_failed",
        }
    }
}

/// Input for one generation call, already validated and composed by the
/// handler. Serializes to the provider's `input` object; the `seed` key is
/// omitted entirely when no seed survived parsing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub width: i64,
    pub height: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

/// Result of a successful generation.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// URL of the first image produced by the model.
    pub url: String,

    /// Model-side inference time in seconds, when the provider reports it.
    pub predict_time: Option<f64>,
}

/// Trait for image generation providers.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Run one generation to completion and return the first image.
    async fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
