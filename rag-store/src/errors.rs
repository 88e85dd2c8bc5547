//! Unified error types for the crate.

use ai_llm_service::AiLlmError;
use thiserror::Error;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// JSON parsing / serialization errors.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Mismatch in vector dimensionality.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// Record has no vector and none could be computed.
    #[error("missing embedding for record {0}")]
    MissingEmbedding(String),

    /// Embedding provider failed.
    #[error("embedding error: {0}")]
    Embedding(#[from] AiLlmError),

    /// Pinecone answered with a non-success status.
    #[error("pinecone HTTP {status} from {url}: {snippet}")]
    PineconeStatus {
        status: reqwest::StatusCode,
        url: String,
        snippet: String,
    },

    /// Pinecone response did not have the expected shape.
    #[error("pinecone decode error: {0}")]
    PineconeDecode(String),

    /// Transport failure talking to Pinecone.
    #[error("pinecone transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
