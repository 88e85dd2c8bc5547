//! Live web search used when indexed retrieval is insufficient.
//!
//! Every template query is attempted once; a failing query is logged and
//! skipped without affecting the others.

use futures::future::join_all;
use rag_store::RagHit;
use tracing::{debug, info, warn};
use web_search::{SearchResult, WebSearchError, WebSearchProvider};

use crate::cfg::{FallbackPolicy, QUERY_PLACEHOLDER};

/// Results of one fallback round.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FallbackOutcome {
    /// Queries issued, in template order.
    pub queries: Vec<String>,
    pub failed: usize,
    /// Kept results (long enough, capped), in template then rank order.
    pub results: Vec<SearchResult>,
}

/// Highest score among `hits`, if any.
pub fn best_score(hits: &[RagHit]) -> Option<f32> {
    hits.iter().map(|h| h.score).reduce(f32::max)
}

/// `true` when there are no hits or the best one is below `threshold`.
pub fn needs_fallback(hits: &[RagHit], threshold: f32) -> bool {
    best_score(hits).is_none_or(|s| s < threshold)
}

/// Substitutes the question into each template.
pub fn expand_templates(templates: &[String], question: &str) -> Vec<String> {
    let q = question.trim();
    templates
        .iter()
        .map(|t| t.replace(QUERY_PLACEHOLDER, q))
        .collect()
}

/// Runs the fallback queries and filters their results.
pub async fn search_fallback(
    provider: &dyn WebSearchProvider,
    question: &str,
    policy: &FallbackPolicy,
) -> FallbackOutcome {
    let queries = expand_templates(&policy.templates, question);

    let per_query: Vec<Result<Vec<SearchResult>, WebSearchError>> = if policy.concurrent {
        join_all(
            queries
                .iter()
                .map(|q| provider.search(q, &policy.options)),
        )
        .await
    } else {
        let mut out = Vec::with_capacity(queries.len());
        for q in &queries {
            out.push(provider.search(q, &policy.options).await);
        }
        out
    };

    let mut failed = 0usize;
    let mut results = Vec::new();
    for (q, res) in queries.iter().zip(per_query) {
        match res {
            Ok(found) => {
                debug!(query = %q, results = found.len(), "fallback query done");
                results.extend(
                    found
                        .into_iter()
                        .filter(|r| r.text_chars() > policy.min_text_chars),
                );
            }
            Err(e) => {
                warn!(query = %q, error = %e, "fallback query failed; skipped");
                failed += 1;
            }
        }
    }
    results.truncate(policy.max_excerpts);

    info!(
        queries = queries.len(),
        failed,
        kept = results.len(),
        "fallback search finished"
    );
    FallbackOutcome {
        queries,
        failed,
        results,
    }
}
