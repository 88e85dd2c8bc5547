//! Thin adapter around the Pinecone data-plane REST API.
//!
//! This facade concentrates all Pinecone interactions behind a minimal API
//! (`query`, `upsert`, `describe_index_stats`) so the rest of the crate never
//! deals with wire shapes or headers.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::errors::RagError;

/// Pinecone REST API version pinned for request/response shapes.
pub const PINECONE_API_VERSION: &str = "2024-07";

const SNIPPET_CHARS: usize = 240;

/// Body of `POST /query`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest<'a> {
    pub namespace: &'a str,
    pub vector: &'a [f32],
    pub top_k: u64,
    pub include_metadata: bool,
}

/// One ranked match from `POST /query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

/// A vector as sent to `POST /vectors/upsert`.
#[derive(Debug, Serialize)]
pub struct UpsertVector {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Value,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [UpsertVector],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: u64,
}

/// Per-namespace summary in index stats.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSummary {
    #[serde(default)]
    pub vector_count: u64,
}

/// Response of `POST /describe_index_stats`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub dimension: Option<u32>,
    #[serde(default)]
    pub total_vector_count: u64,
    #[serde(default)]
    pub index_fullness: Option<f32>,
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceSummary>,
}

/// A facade over the Pinecone REST API.
pub struct PineconeFacade {
    client: reqwest::Client,
    host: String,
    namespace: String,
}

impl PineconeFacade {
    /// Creates a new facade from the given configuration.
    ///
    /// # Errors
    /// - [`RagError::Config`] if the config is invalid or the key is not a valid header
    /// - [`RagError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: &RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(cfg.api_key.trim())
            .map_err(|e| RagError::Config(format!("invalid Pinecone API key header: {e}")))?;
        headers.insert("Api-Key", key);
        headers.insert(
            "X-Pinecone-API-Version",
            HeaderValue::from_static(PINECONE_API_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()?;

        info!(
            index = %cfg.index_name,
            namespace = %cfg.namespace,
            "Pinecone facade initialized"
        );

        Ok(Self {
            client,
            host: cfg.index_host.trim().trim_end_matches('/').to_string(),
            namespace: cfg.namespace.clone(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host, path)
    }

    /// Nearest-neighbour query with metadata.
    pub async fn query(
        &self,
        vector: &[f32],
        top_k: u64,
    ) -> Result<Vec<QueryMatch>, RagError> {
        let body = QueryRequest {
            namespace: &self.namespace,
            vector,
            top_k,
            include_metadata: true,
        };
        let resp: QueryResponse = self.post("query", &body).await?;
        debug!(matches = resp.matches.len(), top_k, "Pinecone query done");
        Ok(resp.matches)
    }

    /// Upserts a batch of vectors. Returns the count acknowledged by Pinecone.
    pub async fn upsert(&self, vectors: &[UpsertVector]) -> Result<u64, RagError> {
        if vectors.is_empty() {
            debug!("No vectors provided for upsert");
            return Ok(0);
        }
        info!(
            count = vectors.len(),
            namespace = %self.namespace,
            "Upserting vectors"
        );
        let body = UpsertRequest {
            vectors,
            namespace: &self.namespace,
        };
        let resp: UpsertResponse = self.post("vectors/upsert", &body).await?;
        Ok(resp.upserted_count)
    }

    /// Index-wide statistics (dimension, vector counts per namespace).
    pub async fn describe_index_stats(&self) -> Result<IndexStats, RagError> {
        self.post("describe_index_stats", &serde_json::json!({}))
            .await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, RagError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let url = self.url(path);
        let resp = self.client.post(&url).json(body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let snippet = crate::record::clamp_snippet(&text, SNIPPET_CHARS);
            error!(%url, %status, %snippet, "Pinecone returned non-success status");
            return Err(RagError::PineconeStatus {
                status,
                url,
                snippet,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            error!(%url, error = %e, "failed to decode Pinecone response");
            RagError::PineconeDecode(format!("{path}: {e}"))
        })
    }
}
