use crate::errors::RagError;
use std::{future::Future, pin::Pin};

/// Provider interface for embedding generation.
///
/// Async is required because the real providers (OpenAI, HuggingFace)
/// perform HTTP requests. Implement this trait to plug in another backend or
/// a test fake.
pub trait EmbeddingsProvider: Send + Sync {
    /// Async embedding function.
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>;
}

pub mod llm_embedder;
