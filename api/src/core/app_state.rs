use std::sync::Arc;

use contextor::Contextor;

use crate::core::health::HealthReporter;

/// Default listen address.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:8000";
/// Default browser origin allowed by CORS.
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000";

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Answering pipeline with its injected provider clients.
    pub contextor: Arc<Contextor>,
    /// Provider and index health probes.
    pub health: Arc<dyn HealthReporter>,
    /// Shared secret for `POST /index/refresh`; `None` disables the route.
    pub refresh_secret: Option<String>,
}

/// HTTP server settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiConfig {
    pub address: String,
    pub cors_allowed_origins: Vec<String>,
}

impl ApiConfig {
    /// Load from `API_ADDRESS` and `CORS_ALLOWED_ORIGINS` (comma-separated).
    pub fn from_env() -> Self {
        let address = std::env::var("API_ADDRESS")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
        let origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string());
        Self {
            address,
            cors_allowed_origins: split_origins(&origins),
        }
    }
}

/// Reads `INDEX_REFRESH_SECRET`; empty means disabled.
pub fn refresh_secret_from_env() -> Option<String> {
    std::env::var("INDEX_REFRESH_SECRET")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
