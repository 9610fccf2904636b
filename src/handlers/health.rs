use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::startup::AppState;

/// Liveness probe. Fixed payload, never depends on credential state.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// Readiness probe: 200 once the provider has a credential to work with.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.image_provider.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
