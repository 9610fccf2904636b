//! Application startup and lifecycle management.

use crate::config::ServiceConfig;
use crate::error::AppError;
use crate::handlers;
use crate::middleware::{request_id_middleware, REQUEST_ID_HEADER};
use crate::services::metrics::{get_metrics, init_metrics};
use crate::services::providers::{ImageProvider, ReplicateConfig, ReplicateProvider};
use axum::middleware::from_fn;
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ServiceConfig,
    pub image_provider: Arc<dyn ImageProvider>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the production Replicate provider.
    pub async fn build(config: ServiceConfig) -> Result<Self, AppError> {
        let replicate_config = ReplicateConfig {
            api_token: config.replicate_api_token.clone(),
            model: config.replicate_model.clone(),
            api_base: config.replicate_api_base.clone(),
            poll_interval: Duration::from_millis(config.replicate_poll_interval_ms),
        };
        let provider = ReplicateProvider::new(replicate_config);

        if provider.is_configured() {
            tracing::info!(model = %config.replicate_model, "Replicate provider initialized");
        } else {
            tracing::warn!(
                "REPLICATE_API_TOKEN is not set - generation requests will fail until it is configured"
            );
        }

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application with an injected provider (used by tests).
    pub async fn build_with_provider(
        config: ServiceConfig,
        image_provider: Arc<dyn ImageProvider>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let state = AppState {
            config: config.clone(),
            image_provider,
        };

        // CORS is wide open on every route; the relay carries no credentials
        // of its own.
        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(metrics_handler))
            .route("/generate", post(handlers::generate_image))
            .layer(CorsLayer::permissive())
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
            )
            .with_state(state);

        // Port 0 binds a random free port for tests.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!("Listening on port {}", self.port);

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
