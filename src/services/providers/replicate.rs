//! Replicate image provider client.
//!
//! Speaks Replicate's predictions API: the model slug is resolved to its
//! latest published version, a prediction is created against that version,
//! and the prediction is polled until it reaches a terminal status.

use super::{GeneratedImage, ImageProvider, ImageRequest, ProviderError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Replicate provider configuration.
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: Secret<String>,
    /// Model slug in `owner/name` form.
    pub model: String,
    /// API base URL, overridable for tests.
    pub api_base: String,
    /// Interval between prediction status polls.
    pub poll_interval: Duration,
}

/// Replicate image provider.
pub struct ReplicateProvider {
    config: ReplicateConfig,
    client: Client,
}

/// Request body for prediction creation.
#[derive(Debug, Serialize)]
struct CreatePredictionRequest<'a> {
    version: &'a str,
    input: &'a ImageRequest,
}

/// Subset of a Replicate model resource.
#[derive(Debug, Deserialize)]
struct ModelResponse {
    latest_version: Option<ModelVersion>,
}

#[derive(Debug, Deserialize)]
struct ModelVersion {
    id: String,
}

/// Subset of a Replicate prediction resource.
#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    metrics: Option<PredictionMetrics>,
}

#[derive(Debug, Deserialize)]
struct PredictionMetrics {
    #[serde(default)]
    predict_time: Option<f64>,
}

/// Replicate API error body.
#[derive(Debug, Deserialize)]
struct ReplicateErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

impl ReplicateProvider {
    /// Create a new Replicate provider.
    pub fn new(config: ReplicateConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Check if the API token is set.
    pub fn is_configured(&self) -> bool {
        !self.config.api_token.expose_secret().trim().is_empty()
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base, path)
    }

    /// Resolve the configured model slug to its latest published version id.
    async fn resolve_latest_version(&self) -> Result<String, ProviderError> {
        let url = self.api_url(&format!("/v1/models/{}", self.config.model));

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.config.api_token.expose_secret())
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(error_for_status(status, &body));
        }

        let model: ModelResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::UnexpectedResponse(format!("Failed to parse model response: {}", e))
        })?;

        model.latest_version.map(|v| v.id).ok_or_else(|| {
            ProviderError::UnexpectedResponse(format!(
                "Model {} has no published versions",
                self.config.model
            ))
        })
    }

    async fn create_prediction(
        &self,
        version: &str,
        input: &ImageRequest,
    ) -> Result<Prediction, ProviderError> {
        let url = self.api_url("/v1/predictions");
        let request = CreatePredictionRequest { version, input };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_token.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        tracing::debug!(status = %status, "Replicate create prediction response");

        if !status.is_success() {
            return Err(error_for_status(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::UnexpectedResponse(format!("Failed to parse prediction: {}", e))
        })
    }

    async fn get_prediction(&self, id: &str) -> Result<Prediction, ProviderError> {
        let url = self.api_url(&format!("/v1/predictions/{}", id));

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.config.api_token.expose_secret())
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(error_for_status(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::UnexpectedResponse(format!("Failed to parse prediction: {}", e))
        })
    }

    /// Poll until the prediction reaches a terminal status. Predictions that
    /// come back already terminal (fast models) skip the poll loop entirely.
    async fn wait_for_completion(
        &self,
        mut prediction: Prediction,
    ) -> Result<Prediction, ProviderError> {
        while !is_terminal(&prediction.status) {
            tracing::debug!(
                prediction_id = %prediction.id,
                status = %prediction.status,
                "Waiting for prediction"
            );
            tokio::time::sleep(self.config.poll_interval).await;
            prediction = self.get_prediction(&prediction.id).await?;
        }

        Ok(prediction)
    }
}

#[async_trait]
impl ImageProvider for ReplicateProvider {
    async fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage, ProviderError> {
        let version = self.resolve_latest_version().await?;

        tracing::debug!(
            model = %self.config.model,
            version = %version,
            width = request.width,
            height = request.height,
            seed = ?request.seed,
            "Creating prediction"
        );

        let created = self.create_prediction(&version, request).await?;
        let prediction = self.wait_for_completion(created).await?;

        match prediction.status.as_str() {
            "succeeded" => {
                let url = first_image_url(prediction.output.as_ref())?;
                let predict_time = prediction.metrics.and_then(|m| m.predict_time);
                tracing::info!(
                    prediction_id = %prediction.id,
                    predict_time = ?predict_time,
                    "Prediction succeeded"
                );
                Ok(GeneratedImage { url, predict_time })
            }
            "canceled" => Err(ProviderError::Failed("Prediction was canceled".to_string())),
            _ => {
                let message = prediction
                    .error
                    .unwrap_or_else(|| "Prediction failed without an error message".to_string());
                tracing::error!(
                    prediction_id = %prediction.id,
                    error = %message,
                    "Prediction failed"
                );
                Err(ProviderError::Failed(message))
            }
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::NotConfigured(
                "REPLICATE_API_TOKEN is not set".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_terminal(status: &str) -> bool {
    matches!(status, "succeeded" | "failed" | "canceled")
}

/// Map a non-success API status to a provider error, preferring the `detail`
/// field of Replicate's error body over the raw body text.
fn error_for_status(status: StatusCode, body: &str) -> ProviderError {
    let detail = serde_json::from_str::<ReplicateErrorBody>(body)
        .ok()
        .and_then(|e| e.detail)
        .unwrap_or_else(|| body.to_string());

    match status.as_u16() {
        401 | 403 => ProviderError::Authentication(detail),
        429 => ProviderError::RateLimited(detail),
        _ => ProviderError::Api(format!("Replicate API error {}: {}", status, detail)),
    }
}

/// Extract "the" image URL from a prediction output: the first element of a
/// URL array, or of an `images` array inside an object. Anything else counts
/// as no image.
fn first_image_url(output: Option<&Value>) -> Result<String, ProviderError> {
    let output = output.ok_or(ProviderError::NoImage)?;

    let candidates = match output {
        Value::Array(items) => items,
        Value::Object(fields) => match fields.get("images") {
            Some(Value::Array(items)) => items,
            _ => return Err(ProviderError::NoImage),
        },
        _ => return Err(ProviderError::NoImage),
    };

    match candidates.first() {
        Some(Value::String(url)) => Ok(url.clone()),
        _ => Err(ProviderError::NoImage),
    }
}
