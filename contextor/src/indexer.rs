//! Index refresh: pull pages from live web search and upsert them as
//! documents.
//!
//! Queries run sequentially to stay under provider rate limits. Failing
//! queries and failing embeddings are skipped; an upsert failure aborts.

use std::collections::BTreeMap;

use rag_store::{EmbeddingsProvider, IngestOptions, RagRecord, VectorIndex, document_id, ingest_records};
use serde_json::Value;
use tracing::{info, warn};
use web_search::{SearchResult, WebSearchProvider};

use crate::api_types::RefreshReport;
use crate::cfg::IndexRefreshConfig;
use crate::error::ContextorError;

/// Converts a search result into an index record.
///
/// `position` is the result's position across all queries of the run.
pub fn to_record(cfg: &IndexRefreshConfig, position: usize, r: SearchResult) -> RagRecord {
    let mut extra = BTreeMap::new();
    extra.insert(
        "publishedDate".to_string(),
        Value::String(r.published_date.unwrap_or_default()),
    );
    extra.insert(
        "highlights".to_string(),
        Value::String(r.highlights.join(" ")),
    );
    extra.insert("source".to_string(), Value::String(cfg.source_tag.clone()));

    RagRecord {
        id: document_id(&cfg.id_prefix, position),
        text: r.text.unwrap_or_default(),
        title: r.title.filter(|t| !t.trim().is_empty()),
        url: Some(r.url).filter(|u| !u.trim().is_empty()),
        embedding: None,
        extra,
    }
}

/// Runs every refresh template and ingests the long-enough results.
///
/// # Errors
/// [`ContextorError::Rag`] when an upsert batch fails.
pub async fn refresh_index(
    search: &dyn WebSearchProvider,
    embedder: &dyn EmbeddingsProvider,
    index: &dyn VectorIndex,
    cfg: &IndexRefreshConfig,
    opts: &IngestOptions,
) -> Result<RefreshReport, ContextorError> {
    let options = cfg.search_options();
    let mut report = RefreshReport {
        queries: cfg.templates.len(),
        ..Default::default()
    };

    let mut all = Vec::new();
    for q in &cfg.templates {
        match search.search(q, &options).await {
            Ok(found) => all.extend(found),
            Err(e) => {
                warn!(query = %q, error = %e, "refresh query failed; skipped");
                report.failed_queries += 1;
            }
        }
    }
    report.results = all.len();

    let records: Vec<RagRecord> = all
        .into_iter()
        .enumerate()
        .filter(|(_, r)| r.text_chars() > cfg.min_text_chars)
        .map(|(i, r)| to_record(cfg, i, r))
        .collect();
    report.kept = records.len();

    let ingested = ingest_records(index, embedder, records, opts).await?;
    report.upserted = ingested.upserted;
    report.skipped_embeddings = ingested.skipped;

    info!(
        queries = report.queries,
        failed_queries = report.failed_queries,
        results = report.results,
        upserted = report.upserted,
        "index refresh finished"
    );
    Ok(report)
}
