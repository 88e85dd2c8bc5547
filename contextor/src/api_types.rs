//! Public API types re-used by external crates (e.g., the HTTP API layer).

use ai_llm_service::TokenStream;
use rag_store::RagHit;
use serde::Serialize;

/// Domain whose pages count as first-party sources.
pub const AVEN_DOMAIN: &str = "aven.com";

/// A retrieved document that cleared the relevance threshold.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RetrievedMatch {
    pub id: String,
    pub title: Option<String>,
    pub content: String,
    pub url: Option<String>,
    pub score: f32,
}

impl From<RagHit> for RetrievedMatch {
    fn from(h: RagHit) -> Self {
        Self {
            id: h.id,
            title: h.title,
            content: h.text,
            url: h.url,
            score: h.score,
        }
    }
}

/// Source citation shown next to an answer.
///
/// # Example
/// ```
/// use contextor::SourceRef;
/// let s = SourceRef::new(Some("Fees".into()), Some("https://www.aven.com/fees".into()), 0.81);
/// assert_eq!(s.domain.as_deref(), Some("www.aven.com"));
/// assert!(s.is_aven_domain);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceRef {
    pub title: String,
    pub url: Option<String>,
    pub score: f32,
    pub domain: Option<String>,
    pub is_aven_domain: bool,
}

impl SourceRef {
    pub fn new(title: Option<String>, url: Option<String>, score: f32) -> Self {
        let domain = url
            .as_deref()
            .and_then(|u| reqwest::Url::parse(u).ok())
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase));
        let is_aven_domain = domain
            .as_deref()
            .is_some_and(|d| d == AVEN_DOMAIN || d.ends_with(".aven.com"));
        Self {
            title: title.unwrap_or_else(|| "Aven Documentation".into()),
            url,
            score,
            domain,
            is_aven_domain,
        }
    }
}

impl From<&RetrievedMatch> for SourceRef {
    fn from(m: &RetrievedMatch) -> Self {
        Self::new(m.title.clone(), m.url.clone(), m.score)
    }
}

/// What retrieval produced for one question.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Retrieval {
    /// Matches at or above the relevance threshold, in index rank order.
    pub matches: Vec<RetrievedMatch>,
    /// Number of hits returned by the index before thresholding.
    pub total_hits: usize,
    pub best_score: Option<f32>,
    pub fallback_used: bool,
    /// Fallback queries that failed and were skipped.
    pub fallback_failures: usize,
    /// Web excerpts appended to the context.
    pub web_results: usize,
    /// Text appended to the final user message (may be empty).
    pub context: String,
}

/// Streamed answer plus the retrieval summary it was grounded on.
pub struct AnswerStream {
    pub retrieval: Retrieval,
    pub tokens: TokenStream,
}

impl std::fmt::Debug for AnswerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerStream")
            .field("retrieval", &self.retrieval)
            .finish_non_exhaustive()
    }
}

/// Outcome of an index refresh.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RefreshReport {
    pub queries: usize,
    pub failed_queries: usize,
    pub results: usize,
    pub kept: usize,
    pub upserted: u64,
    pub skipped_embeddings: usize,
}
