//! Image generation handler.
//!
//! The inbound contract is deliberately lenient: a malformed JSON body is
//! treated as an empty object, dimensions accept numbers or numeric strings
//! and fall back to a default when absent or falsy, and an unparseable seed
//! is dropped rather than rejected. The only hard requirement is a non-empty
//! prompt.

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use crate::error::AppError;
use crate::services::metrics;
use crate::services::providers::ImageRequest;
use crate::startup::AppState;

const DEFAULT_DIMENSION: i64 = 1024;

/// Response for a successful generation.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub image: String,
}

#[tracing::instrument(skip(state, body))]
pub async fn generate_image(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, AppError> {
    let data: Value =
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::Object(Default::default()));

    let request = match parse_request(&data) {
        Ok(request) => request,
        Err(err) => {
            metrics::record_image_request("invalid_request");
            return Err(err);
        }
    };

    tracing::info!(
        prompt_len = request.prompt.len(),
        width = request.width,
        height = request.height,
        seed = ?request.seed,
        "Dispatching generation request"
    );

    let start = Instant::now();
    match state.image_provider.generate(&request).await {
        Ok(image) => {
            let elapsed = start.elapsed().as_secs_f64();
            metrics::record_provider_latency(&state.config.replicate_model, elapsed);
            metrics::record_image_request("success");
            tracing::info!(
                url = %image.url,
                predict_time = ?image.predict_time,
                elapsed_secs = elapsed,
                "Image generated"
            );
            Ok(Json(GenerateResponse { image: image.url }))
        }
        Err(e) => {
            metrics::record_provider_error(e.kind());
            metrics::record_image_request("error");
            tracing::error!(error = %e, "Image generation failed");
            Err(AppError::Provider(e))
        }
    }
}

/// Build the provider input from the raw body: validate the prompt, compose
/// the exclusion clause, coerce dimensions and seed.
fn parse_request(data: &Value) -> Result<ImageRequest, AppError> {
    let mut prompt = required_text(data, "prompt")?;
    if let Some(negative) = optional_text(data, "negative_prompt")? {
        prompt = format!("{}. Avoid: {}", prompt, negative);
    }

    Ok(ImageRequest {
        prompt,
        width: dimension(data, "width")?,
        height: dimension(data, "height")?,
        seed: lenient_seed(data.get("seed")),
    })
}

/// Required text field: must be a string, non-empty after trimming.
fn required_text(data: &Value, field: &str) -> Result<String, AppError> {
    match data.get(field) {
        None | Some(Value::Null) => Err(AppError::BadRequest(anyhow::anyhow!(
            "{} is required",
            field
        ))),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Err(AppError::BadRequest(anyhow::anyhow!(
                    "{} is required",
                    field
                )))
            } else {
                Ok(trimmed.to_string())
            }
        }
        Some(_) => Err(AppError::InternalError(anyhow::anyhow!(
            "{} must be a string",
            field
        ))),
    }
}

/// Optional text field: empty after trimming means absent.
fn optional_text(data: &Value, field: &str) -> Result<Option<String>, AppError> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(_) => Err(AppError::InternalError(anyhow::anyhow!(
            "{} must be a string",
            field
        ))),
    }
}

/// Integer dimension: absent or falsy (`null`, `0`, `""`, `false`) means the
/// default; numbers truncate toward zero and numeric strings parse.
fn dimension(data: &Value, field: &str) -> Result<i64, AppError> {
    let value = match data.get(field) {
        None | Some(Value::Null) => return Ok(DEFAULT_DIMENSION),
        Some(value) => value,
    };

    match value {
        Value::Bool(false) => Ok(DEFAULT_DIMENSION),
        Value::Number(n) => {
            if matches!(n.as_f64(), Some(f) if f == 0.0) {
                return Ok(DEFAULT_DIMENSION);
            }
            n.as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| {
                    AppError::InternalError(anyhow::anyhow!("{} must be an integer", field))
                })
        }
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(DEFAULT_DIMENSION);
            }
            trimmed.parse::<i64>().map_err(|_| {
                AppError::InternalError(anyhow::anyhow!("{} must be an integer", field))
            })
        }
        _ => Err(AppError::InternalError(anyhow::anyhow!(
            "{} must be an integer",
            field
        ))),
    }
}

/// Lenient seed parse: integers pass, numeric strings parse, fractional
/// numbers truncate toward zero, anything else is silently dropped.
fn lenient_seed(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}
