//! HuggingFace Inference API client for sentence embeddings.
//!
//! - `POST {endpoint}/models/{model}` with `{"inputs": "<text>"}`
//!
//! Sentence-transformers models answer either with a flat vector `[f32]` or
//! with a batch `[[f32]]`; anything else is a decode error.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, HttpError, ProviderError, ProviderErrorKind, make_snippet},
};

#[derive(Debug)]
pub struct HuggingFaceService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_model: String,
}

impl HuggingFaceService {
    /// Creates a new client from config.
    ///
    /// # Errors
    /// - `InvalidProvider` unless `cfg.provider` is HuggingFace
    /// - `MissingApiKey` / `InvalidEndpoint` on incomplete configs
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::HuggingFace {
            return Err(
                ProviderError::new(cfg.provider, ProviderErrorKind::InvalidProvider).into(),
            );
        }
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::new(cfg.provider, ProviderErrorKind::MissingApiKey))?;

        let endpoint = cfg.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ProviderError::new(
                cfg.provider,
                ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
            )
            .into());
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                ProviderError::new(
                    cfg.provider,
                    ProviderErrorKind::Decode(format!("invalid API key header: {e}")),
                )
            })?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.unwrap_or(30)))
            .default_headers(headers)
            .build()?;

        let url_model = format!(
            "{}/models/{}",
            endpoint.trim_end_matches('/'),
            cfg.model.trim_matches('/')
        );

        info!(model = %cfg.model, endpoint = %cfg.endpoint, "HuggingFaceService initialized");

        Ok(Self {
            client,
            cfg,
            url_model,
        })
    }

    /// Model URL, also used by the health probe.
    pub fn model_url(&self) -> &str {
        &self.url_model
    }

    /// Embeds `input` with the configured sentence-transformers model.
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let started = Instant::now();
        debug!(model = %self.cfg.model, input_len = input.len(), "POST {}", self.url_model);

        let resp = self
            .client
            .post(&self.url_model)
            .json(&FeatureRequest { inputs: input })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);
            error!(
                %status,
                url = %self.url_model,
                %snippet,
                latency_ms = started.elapsed().as_millis(),
                "HuggingFace inference returned non-success status"
            );
            return Err(ProviderError::new(
                LlmProvider::HuggingFace,
                ProviderErrorKind::HttpStatus(HttpError {
                    status,
                    url: self.url_model.clone(),
                    snippet,
                }),
            )
            .into());
        }

        let raw = resp.text().await?;
        let vector = parse_feature_vector(&raw).map_err(|kind| {
            error!(model = %self.cfg.model, error = %kind, "unexpected HuggingFace response shape");
            ProviderError::new(LlmProvider::HuggingFace, kind)
        })?;

        info!(
            model = %self.cfg.model,
            dim = vector.len(),
            latency_ms = started.elapsed().as_millis(),
            "embeddings completed"
        );
        Ok(vector)
    }
}

#[derive(Serialize)]
struct FeatureRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureResponse {
    Flat(Vec<f32>),
    Batch(Vec<Vec<f32>>),
}

/// Accepts `[f32]` or `[[f32], ...]` (first row) and rejects empty vectors.
pub fn parse_feature_vector(raw: &str) -> Result<Vec<f32>, ProviderErrorKind> {
    let parsed: FeatureResponse = serde_json::from_str(raw).map_err(|_| {
        ProviderErrorKind::Decode(format!(
            "expected [f32] or [[f32]], got: {}",
            make_snippet(raw)
        ))
    })?;
    let v = match parsed {
        FeatureResponse::Flat(v) => v,
        FeatureResponse::Batch(rows) => rows.into_iter().next().unwrap_or_default(),
    };
    if v.is_empty() {
        return Err(ProviderErrorKind::Decode("empty embedding".into()));
    }
    Ok(v)
}
