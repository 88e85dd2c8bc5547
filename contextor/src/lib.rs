//! Retrieval-augmented answering for the Aven support assistant.
//!
//! Public API: [`Contextor`]. For each question it embeds the latest user
//! message, retrieves top-K documents from the vector index, keeps those at
//! or above the relevance threshold, falls back to live web search when
//! retrieval is weak, appends the context to the user turn and streams the
//! completion back.
//!
//! Sources are reported separately ([`Contextor::sources`],
//! [`Retrieval::matches`]); the token stream carries answer text only.

mod api_types;
mod cfg;
mod error;
mod fallback;
mod indexer;
mod pipeline;
pub mod prompt;

pub use api_types::{AVEN_DOMAIN, AnswerStream, RefreshReport, Retrieval, RetrievedMatch, SourceRef};
pub use cfg::{
    ContextorConfig, FALLBACK_TEMPLATES, FallbackPolicy, INDEX_REFRESH_TEMPLATES,
    IndexRefreshConfig,
};
pub use error::ContextorError;
pub use fallback::{FallbackOutcome, expand_templates, needs_fallback, search_fallback};
pub use pipeline::{Contextor, validate_conversation};
