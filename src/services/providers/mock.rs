//! Mock provider implementation for testing.

use super::{GeneratedImage, ImageProvider, ImageRequest, ProviderError};
use async_trait::async_trait;
use std::sync::Mutex;

/// Mock image provider for testing. Returns a canned result and records every
/// request it receives, so tests can assert on the exact values that crossed
/// the provider boundary.
pub struct MockImageProvider {
    result: Result<GeneratedImage, ProviderError>,
    requests: Mutex<Vec<ImageRequest>>,
}

impl MockImageProvider {
    /// Mock that succeeds with the given image URL.
    pub fn returning_url(url: &str) -> Self {
        Self {
            result: Ok(GeneratedImage {
                url: url.to_string(),
                predict_time: None,
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Mock that fails every generation with the given error.
    pub fn failing_with(error: ProviderError) -> Self {
        Self {
            result: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in call order.
    pub fn received(&self) -> Vec<ImageRequest> {
        self.requests.lock().expect("requests lock poisoned").clone()
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    async fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage, ProviderError> {
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .push(request.clone());
        self.result.clone()
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
