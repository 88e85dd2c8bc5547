//! Health probes for the hosted model providers.
//!
//! - OpenAI / Groq: `GET {endpoint}/v1/models` with Bearer auth (best-effort model existence check)
//! - HuggingFace:   `GET {endpoint}/status/{model}` with Bearer auth
//!
//! The returned [`HealthStatus`] is JSON-serializable and suitable for a `/health` endpoint.
//! [`HealthService::check`] is resilient and never fails (errors mapped to `ok=false`).

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};

/// A serializable health snapshot for a single provider/config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Backend/provider (e.g. "groq").
    pub provider: String,
    /// Target endpoint base URL.
    pub endpoint: String,
    /// Model identifier relevant to the probe.
    pub model: Option<String>,
    /// Overall health flag.
    pub ok: bool,
    /// Measured HTTP latency in milliseconds for the main probe.
    pub latency_ms: u128,
    /// Short human-readable message with details.
    pub message: String,
}

impl HealthStatus {
    fn new(
        cfg: &LlmModelConfig,
        ok: bool,
        latency_ms: u128,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: cfg.provider.to_string(),
            endpoint: cfg.endpoint.clone(),
            model: Some(cfg.model.clone()),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// A health checker that reuses a single HTTP client.
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// Creates a new health service with an optional client timeout (seconds).
    ///
    /// # Errors
    /// Returns [`AiLlmError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        info!(
            default_timeout_secs = timeout.as_secs(),
            "HealthService initialized"
        );

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Checks health for a single config. Never returns an error.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let endpoint = cfg.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            warn!(provider = %cfg.provider, endpoint = %cfg.endpoint, "invalid endpoint");
            return HealthStatus::new(cfg, false, 0, "endpoint is empty or missing http/https");
        }

        let start = Instant::now();
        let result = match cfg.provider {
            LlmProvider::OpenAI | LlmProvider::Groq => self.try_probe_openai_compatible(cfg).await,
            LlmProvider::HuggingFace => self.try_probe_huggingface(cfg).await,
        };

        match result {
            Ok(status) => {
                info!(
                    provider = %status.provider,
                    model = %status.model.as_deref().unwrap_or("n/a"),
                    ok = status.ok,
                    latency_ms = status.latency_ms,
                    "health probe completed"
                );
                status
            }
            Err(err) => {
                let status =
                    HealthStatus::new(cfg, false, start.elapsed().as_millis(), err.to_string());
                warn!(
                    provider = %status.provider,
                    latency_ms = status.latency_ms,
                    message = %status.message,
                    "health probe failed"
                );
                status
            }
        }
    }

    /// Checks several configs sequentially.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        debug!(count = configs.len(), "running batch health probes");
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    fn auth(cfg: &LlmModelConfig) -> Result<header::HeaderValue, AiLlmError> {
        let key = cfg
            .api_key
            .as_ref()
            .ok_or_else(|| HealthError::Decode("missing API key".into()))?;
        header::HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|e| HealthError::Decode(format!("invalid API key header: {e}")).into())
    }

    async fn get(
        &self,
        cfg: &LlmModelConfig,
        url: &str,
    ) -> Result<(reqwest::Response, u128), AiLlmError> {
        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        debug!(provider = %cfg.provider, model = %cfg.model, "GET {}", url);
        let start = Instant::now();
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .header(header::AUTHORIZATION, Self::auth(cfg)?)
            .send()
            .await?;
        let latency = start.elapsed().as_millis();

        if !resp.status().is_success() {
            let status = resp.status();
            let snippet = make_snippet(&resp.text().await.unwrap_or_default());
            error!(
                provider = %cfg.provider,
                %url,
                %status,
                %snippet,
                latency_ms = latency,
                "health probe returned non-success status"
            );
            return Err(HealthError::HttpStatus(HttpError {
                status,
                url: url.to_string(),
                snippet,
            })
            .into());
        }
        Ok((resp, latency))
    }

    /// `GET /v1/models` and look for the configured model id.
    async fn try_probe_openai_compatible(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<HealthStatus, AiLlmError> {
        let url = format!("{}/v1/models", cfg.endpoint.trim().trim_end_matches('/'));
        let (resp, latency) = self.get(cfg, &url).await?;

        #[derive(Deserialize)]
        struct ModelItem {
            id: String,
        }
        #[derive(Deserialize)]
        struct Models {
            data: Vec<ModelItem>,
        }

        match resp.json::<Models>().await {
            Ok(models) if models.data.iter().any(|m| m.id == cfg.model) => Ok(HealthStatus::new(
                cfg,
                true,
                latency,
                "provider is healthy; model is available",
            )),
            Ok(_) => Ok(HealthStatus::new(
                cfg,
                false,
                latency,
                "provider is up, but model not found in /v1/models",
            )),
            Err(e) => {
                warn!(provider = %cfg.provider, error = %e, "failed to decode /v1/models; treating server as reachable");
                Ok(HealthStatus::new(
                    cfg,
                    true,
                    latency,
                    format!("provider is reachable; failed to decode /v1/models: {e}"),
                ))
            }
        }
    }

    /// `GET /status/{model}`; any 2xx means the model is served.
    async fn try_probe_huggingface(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<HealthStatus, AiLlmError> {
        let url = format!(
            "{}/status/{}",
            cfg.endpoint.trim().trim_end_matches('/'),
            cfg.model.trim_matches('/')
        );
        let (_resp, latency) = self.get(cfg, &url).await?;
        Ok(HealthStatus::new(
            cfg,
            true,
            latency,
            "HuggingFace inference is reachable",
        ))
    }
}
