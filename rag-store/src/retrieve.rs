//! Retrieval helpers: low-level vector search and high-level RAG context.

use crate::VectorIndex;
use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::record::{RagHit, RagQuery};

use tracing::{debug, trace};

/// Embeds the query text and returns the ranked hits from the index.
///
/// Hits are returned in the order the index ranked them; no threshold is
/// applied here.
///
/// # Errors
/// Returns embedding/provider errors or index failures.
pub async fn rag_context(
    index: &dyn VectorIndex,
    provider: &dyn EmbeddingsProvider,
    query: RagQuery<'_>,
) -> Result<Vec<RagHit>, RagError> {
    trace!("retrieve::rag_context top_k={}", query.top_k);

    let qv = provider.embed(query.text).await?;
    let hits = index.query(qv, query.top_k).await?;

    debug!(
        hits = hits.len(),
        best = hits.first().map(|h| h.score).unwrap_or_default(),
        "retrieve::rag_context done"
    );
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RagRecord;
    use serde_json::json;
    use std::{
        future::Future,
        pin::Pin,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    struct FixedEmbedder;

    impl EmbeddingsProvider for FixedEmbedder {
        fn embed<'a>(
            &'a self,
            text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
            Box::pin(async move { Ok(vec![text.len() as f32, 1.0]) })
        }
    }

    #[derive(Default)]
    struct RecordingIndex {
        calls: AtomicUsize,
        seen: Mutex<Option<(Vec<f32>, u64)>>,
    }

    impl VectorIndex for RecordingIndex {
        fn query<'a>(
            &'a self,
            vector: Vec<f32>,
            top_k: u64,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<RagHit>, RagError>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                *self.seen.lock().unwrap() = Some((vector, top_k));
                Ok(vec![RagHit::from_metadata(
                    "doc-1",
                    0.92,
                    json!({"title": "Aven Card", "content": "The Aven card is a HELOC card."}),
                )])
            })
        }

        fn upsert<'a>(
            &'a self,
            _records: Vec<RagRecord>,
        ) -> Pin<Box<dyn Future<Output = Result<u64, RagError>> + Send + 'a>> {
            Box::pin(async { Ok(0) })
        }
    }

    #[tokio::test]
    async fn embeds_then_queries() {
        let index = RecordingIndex::default();
        let hits = rag_context(
            &index,
            &FixedEmbedder,
            RagQuery {
                text: "What is the Aven card?",
                top_k: 3,
            },
        )
        .await
        .unwrap();

        assert_eq!(index.calls.load(Ordering::SeqCst), 1);
        let (v, k) = index.seen.lock().unwrap().clone().unwrap();
        assert_eq!(v, vec![22.0, 1.0]);
        assert_eq!(k, 3);
        assert_eq!(hits[0].title.as_deref(), Some("Aven Card"));
    }
}
