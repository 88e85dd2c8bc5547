//! Typed error for the contextor crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// The latest user message is empty or whitespace.
    #[error("message content must not be empty")]
    EmptyInput,

    /// The conversation cannot be answered (empty, wrong last role, etc.).
    #[error("invalid conversation: {0}")]
    InvalidConversation(String),

    /// Environment-driven configuration failed to parse or validate.
    #[error("invalid config {var}: {reason}")]
    Config { var: &'static str, reason: String },

    /// Errors from the underlying rag-store crate (embedding, vector search, upsert).
    #[error("RAG error: {0}")]
    Rag(#[from] rag_store::RagError),

    /// Completion provider failed before streaming started.
    #[error("completion error: {0}")]
    Completion(#[from] ai_llm_service::AiLlmError),

    /// Index refresh requested but no web search provider is configured.
    #[error("web search is not configured")]
    SearchUnavailable,
}

impl ContextorError {
    /// `true` for errors caused by the caller's input rather than a provider.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyInput | Self::InvalidConversation(_))
    }
}
