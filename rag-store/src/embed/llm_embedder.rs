//! [`EmbeddingsProvider`] backed by the shared [`LlmServiceProfiles`].

use std::{future::Future, pin::Pin, sync::Arc};

use ai_llm_service::LlmServiceProfiles;
use tracing::{debug, error};

use super::EmbeddingsProvider;
use crate::errors::RagError;

/// Embeds through the `embedding` profile of the shared LLM service.
pub struct LlmEmbedder {
    svc: Arc<LlmServiceProfiles>,
    expected_dim: Option<usize>,
}

impl LlmEmbedder {
    /// `expected_dim`, when set, rejects vectors of any other length.
    pub fn new(svc: Arc<LlmServiceProfiles>, expected_dim: Option<usize>) -> Self {
        Self { svc, expected_dim }
    }
}

impl EmbeddingsProvider for LlmEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(async move {
            let v = self.svc.embed(text).await.map_err(|e| {
                error!(error = %e, "embedding request failed");
                RagError::Embedding(e)
            })?;
            check_dim(&v, self.expected_dim)?;
            debug!(dim = v.len(), chars = text.len(), "embedded text");
            Ok(v)
        })
    }
}

fn check_dim(v: &[f32], expected: Option<usize>) -> Result<(), RagError> {
    match expected {
        Some(want) if v.len() != want => Err(RagError::VectorSizeMismatch { got: v.len(), want }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_check() {
        assert!(check_dim(&[0.0; 3], None).is_ok());
        assert!(check_dim(&[0.0; 3], Some(3)).is_ok());
        assert!(matches!(
            check_dim(&[0.0; 3], Some(384)),
            Err(RagError::VectorSizeMismatch { got: 3, want: 384 })
        ));
    }
}
