//! Index connection and retrieval configuration.

use crate::errors::RagError;

/// Default index name the documentation is stored under.
pub const DEFAULT_INDEX: &str = "arven";
/// Default namespace inside the index.
pub const DEFAULT_NAMESPACE: &str = "company-documents";

/// Configuration for RAG ingestion and retrieval against Pinecone.
#[derive(Clone, Debug)]
pub struct RagConfig {
    /// Data-plane host of the index, e.g. `https://arven-abc123.svc.us-east-1.pinecone.io`.
    pub index_host: String,
    /// Pinecone API key.
    pub api_key: String,
    /// Logical index name (used in logs and health output).
    pub index_name: String,
    /// Namespace queried and upserted into.
    pub namespace: String,
    /// Upsert batch size (Pinecone accepts up to 1000 small vectors; 100 is safe).
    pub upsert_batch: usize,
    /// Expected embedding dimensionality; checked when set.
    pub embedding_dim: Option<usize>,
    /// Parallel embedding calls during ingestion.
    pub embedding_concurrency: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl RagConfig {
    /// Creates a sane default config for a given index host and key.
    pub fn new_default(index_host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            index_host: index_host.into(),
            api_key: api_key.into(),
            index_name: DEFAULT_INDEX.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            upsert_batch: 100,
            embedding_dim: None,
            embedding_concurrency: 4,
            timeout_secs: 30,
        }
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        let host = self.index_host.trim();
        if host.is_empty() {
            return Err(RagError::Config("index_host is empty".into()));
        }
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(RagError::Config(
                "index_host must start with http:// or https://".into(),
            ));
        }
        if self.api_key.trim().is_empty() {
            return Err(RagError::Config("api_key is empty".into()));
        }
        if self.upsert_batch == 0 {
            return Err(RagError::Config("upsert_batch must be > 0".into()));
        }
        if self.embedding_concurrency == 0 {
            return Err(RagError::Config("embedding_concurrency must be > 0".into()));
        }
        Ok(())
    }
}
