use crate::error::AppError;
use config::{Config as Cfg, File};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

/// Runtime configuration, loaded once at startup and passed explicitly to the
/// components that need it. Every field has a default so the service boots in
/// a bare environment; a missing API token is warned about at startup and
/// surfaces as a provider-side authentication failure at call time.
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_api_token")]
    pub replicate_api_token: Secret<String>,

    /// Model slug in `owner/name` form, resolved to its latest published
    /// version on every generation call.
    #[serde(default = "default_model")]
    pub replicate_model: String,

    #[serde(default = "default_api_base")]
    pub replicate_api_base: String,

    /// Interval between prediction status polls.
    #[serde(default = "default_poll_interval_ms")]
    pub replicate_poll_interval_ms: u64,
}

fn default_port() -> u16 {
    10000
}

fn default_api_token() -> Secret<String> {
    Secret::new(String::new())
}

fn default_model() -> String {
    "black-forest-labs/flux-schnell".to_string()
}

fn default_api_base() -> String {
    "https://api.replicate.com".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl ServiceConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::default())
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn has_api_token(&self) -> bool {
        !self.replicate_api_token.expose_secret().trim().is_empty()
    }
}
