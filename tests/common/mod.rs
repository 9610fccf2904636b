use imagegen_service::config::ServiceConfig;
use imagegen_service::services::providers::ImageProvider;
use imagegen_service::startup::Application;
use secrecy::Secret;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    /// Spawn the app with the production provider pointed at `api_base`
    /// (normally a wiremock server).
    pub async fn spawn_with_api_base(api_base: &str) -> Self {
        let config = test_config(api_base);
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        Self::run(app).await
    }

    /// Spawn the app with an injected provider.
    pub async fn spawn_with_provider(provider: Arc<dyn ImageProvider>) -> Self {
        let config = test_config("http://127.0.0.1:1");
        let app = Application::build_with_provider(config, provider)
            .await
            .expect("Failed to build test application");
        Self::run(app).await
    }

    /// Spawn the app with the production provider and no API token set.
    pub async fn spawn_unconfigured() -> Self {
        let mut config = test_config("http://127.0.0.1:1");
        config.replicate_api_token = Secret::new(String::new());
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        Self::run(app).await
    }

    async fn run(app: Application) -> Self {
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }

        TestApp { address, port }
    }

    pub async fn post_generate(&self, body: &serde_json::Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/generate", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

fn test_config(api_base: &str) -> ServiceConfig {
    // Port 0 binds a random free port per test
    ServiceConfig {
        port: 0,
        replicate_api_token: Secret::new("r8_test_token".to_string()),
        replicate_model: "black-forest-labs/flux-schnell".to_string(),
        replicate_api_base: api_base.trim_end_matches('/').to_string(),
        replicate_poll_interval_ms: 10,
    }
}
