//! High-level RAG facade: ingestion + retrieval over Pinecone.
//!
//! This crate provides a clean API to:
//! - Retrieve top‑K hits (RAG) for a textual query
//! - Upsert embedded documents in batches
//! - Report index statistics for health checks
//!
//! The pipeline talks to the index through [`VectorIndex`] and to the
//! embedding model through [`EmbeddingsProvider`], so both can be swapped
//! for fakes in tests.

mod config;
mod embed;
mod errors;
mod ingest;
mod normalize;
mod pinecone_facade;
mod record;
mod retrieve;

pub use config::{DEFAULT_INDEX, DEFAULT_NAMESPACE, RagConfig};
pub use embed::{EmbeddingsProvider, llm_embedder::LlmEmbedder};
pub use errors::RagError;
pub use ingest::{IngestOptions, IngestReport, document_id, ingest_records};
pub use normalize::normalize_text;
pub use pinecone_facade::{IndexStats, NamespaceSummary};
pub use record::{RagHit, RagQuery, RagRecord, clamp_snippet};
pub use retrieve::rag_context;

use std::{
    future::Future,
    pin::Pin,
    time::Instant,
};

use serde::Serialize;
use tracing::{debug, trace, warn};

use pinecone_facade::{PineconeFacade, UpsertVector};

/// Vector index seam used by the answering pipeline and ingestion.
pub trait VectorIndex: Send + Sync {
    /// Nearest neighbours of `vector`, best first, with metadata.
    fn query<'a>(
        &'a self,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RagHit>, RagError>> + Send + 'a>>;

    /// Inserts or replaces records; every record must carry an embedding.
    fn upsert<'a>(
        &'a self,
        records: Vec<RagRecord>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, RagError>> + Send + 'a>>;
}

/// Serializable index health snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct IndexHealth {
    pub index: String,
    pub namespace: String,
    pub ok: bool,
    pub latency_ms: u128,
    pub vector_count: Option<u64>,
    pub dimension: Option<u32>,
    pub message: String,
}

/// High-level facade that wires configuration and the Pinecone client.
///
/// This is the single entry point recommended for application code.
pub struct RagStore {
    cfg: RagConfig,
    client: PineconeFacade,
}

impl RagStore {
    /// Constructs a new store from the given configuration.
    ///
    /// # Errors
    /// Returns `RagError::Config` if the configuration is invalid.
    pub fn new(cfg: RagConfig) -> Result<Self, RagError> {
        trace!("RagStore::new index={}", cfg.index_name);
        let client = PineconeFacade::new(&cfg)?;
        Ok(Self { cfg, client })
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    /// Raw index statistics.
    ///
    /// # Errors
    /// Returns transport, status or decode errors.
    pub async fn stats(&self) -> Result<IndexStats, RagError> {
        self.client.describe_index_stats().await
    }

    /// Health probe built on `describe_index_stats`. Never fails.
    pub async fn health(&self) -> IndexHealth {
        let start = Instant::now();
        let res = self.stats().await;
        let latency_ms = start.elapsed().as_millis();
        let mut h = IndexHealth {
            index: self.cfg.index_name.clone(),
            namespace: self.cfg.namespace.clone(),
            ok: false,
            latency_ms,
            vector_count: None,
            dimension: None,
            message: String::new(),
        };
        match res {
            Ok(stats) => {
                let count = stats
                    .namespaces
                    .get(&self.cfg.namespace)
                    .map(|n| n.vector_count)
                    .unwrap_or(0);
                h.ok = true;
                h.vector_count = Some(count);
                h.dimension = stats.dimension;
                h.message = if count == 0 {
                    "index reachable; namespace is empty".into()
                } else {
                    "index reachable".into()
                };
            }
            Err(e) => {
                warn!(index = %self.cfg.index_name, error = %e, "index health probe failed");
                h.message = e.to_string();
            }
        }
        h
    }
}

impl VectorIndex for RagStore {
    fn query<'a>(
        &'a self,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RagHit>, RagError>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(want) = self.cfg.embedding_dim {
                if vector.len() != want {
                    return Err(RagError::VectorSizeMismatch {
                        got: vector.len(),
                        want,
                    });
                }
            }
            let matches = self.client.query(&vector, top_k).await?;
            Ok(matches
                .into_iter()
                .map(|m| {
                    RagHit::from_metadata(m.id, m.score, m.metadata.unwrap_or_default())
                })
                .collect())
        })
    }

    fn upsert<'a>(
        &'a self,
        records: Vec<RagRecord>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, RagError>> + Send + 'a>> {
        Box::pin(async move {
            let mut vectors = Vec::with_capacity(records.len());
            for r in records {
                let metadata = r.metadata();
                let values = r.embedding.ok_or_else(|| RagError::MissingEmbedding(r.id.clone()))?;
                vectors.push(UpsertVector {
                    id: r.id,
                    values,
                    metadata,
                });
            }
            debug!(count = vectors.len(), namespace = %self.client.namespace(), "RagStore::upsert");
            self.client.upsert(&vectors).await
        })
    }
}
