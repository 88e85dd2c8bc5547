//! Ingestion pipeline: embed → upsert into the index in batches.
//!
//! Only the embedding input is normalized and capped; the stored text is
//! kept as received. Records that already carry a vector are used as-is. Records whose
//! embedding fails (provider error, wrong dimension) are skipped and logged;
//! an upsert failure aborts the run.

use crate::VectorIndex;
use crate::config::RagConfig;
use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::normalize::normalize_text;
use crate::record::RagRecord;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Knobs for [`ingest_records`].
#[derive(Clone, Debug)]
pub struct IngestOptions {
    pub batch_size: usize,
    pub concurrency: usize,
    pub expected_dim: Option<usize>,
    /// Embedding input is normalized and cut to this many characters.
    pub max_chars: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            concurrency: 4,
            expected_dim: None,
            max_chars: 8000,
        }
    }
}

impl From<&RagConfig> for IngestOptions {
    fn from(cfg: &RagConfig) -> Self {
        Self {
            batch_size: cfg.upsert_batch,
            concurrency: cfg.embedding_concurrency,
            expected_dim: cfg.embedding_dim,
            ..Default::default()
        }
    }
}

/// Outcome of one ingestion run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub received: usize,
    pub embedded: usize,
    pub skipped: usize,
    pub upserted: u64,
}

/// Builds a document id of the form `{prefix}-{index}-{uuid4}`.
pub fn document_id(prefix: &str, index: usize) -> String {
    format!("{prefix}-{index}-{}", uuid::Uuid::new_v4())
}

/// Embeds records lacking a vector and upserts everything in batches.
///
/// # Errors
/// Returns the first upsert failure. Embedding failures are not errors.
pub async fn ingest_records(
    index: &dyn VectorIndex,
    provider: &dyn EmbeddingsProvider,
    records: Vec<RagRecord>,
    opts: &IngestOptions,
) -> Result<IngestReport, RagError> {
    let mut report = IngestReport {
        received: records.len(),
        ..Default::default()
    };
    if records.is_empty() {
        debug!("ingest_records: nothing to ingest");
        return Ok(report);
    }

    let embedded: Vec<Option<RagRecord>> = stream::iter(records)
        .map(|mut r| async move {
            if r.embedding.is_none() {
                let input = normalize_text(&r.text, opts.max_chars);
                match provider.embed(&input).await {
                    Ok(v) => r.embedding = Some(v),
                    Err(e) => {
                        warn!(id = %r.id, error = %e, "embedding failed; record skipped");
                        return None;
                    }
                }
            }
            if let (Some(want), Some(v)) = (opts.expected_dim, r.embedding.as_ref()) {
                if v.len() != want {
                    warn!(id = %r.id, got = v.len(), want, "vector size mismatch; record skipped");
                    return None;
                }
            }
            Some(r)
        })
        .buffered(opts.concurrency.max(1))
        .collect()
        .await;

    let ready: Vec<RagRecord> = embedded.into_iter().flatten().collect();
    report.embedded = ready.len();
    report.skipped = report.received - report.embedded;

    let batch_size = opts.batch_size.max(1);
    let mut batches = 0usize;
    let mut iter = ready.into_iter().peekable();
    while iter.peek().is_some() {
        let batch: Vec<RagRecord> = iter.by_ref().take(batch_size).collect();
        report.upserted += index.upsert(batch).await?;
        batches += 1;
    }

    info!(
        received = report.received,
        skipped = report.skipped,
        upserted = report.upserted,
        batches,
        "ingestion finished"
    );
    Ok(report)
}
