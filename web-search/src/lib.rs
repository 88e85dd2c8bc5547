//! Live web search used by the answering pipeline when indexed retrieval is
//! insufficient, and by index refresh as the document source.
//!
//! The pipeline depends only on [`WebSearchProvider`]; [`ExaClient`] is the
//! production implementation.

pub mod config;
pub mod error;
pub mod exa_client;
pub mod types;

pub use config::ExaConfig;
pub use error::WebSearchError;
pub use exa_client::ExaClient;
pub use types::{SearchOptions, SearchResult};

use std::{future::Future, pin::Pin};

/// Web search seam.
pub trait WebSearchProvider: Send + Sync {
    fn search<'a>(
        &'a self,
        query: &'a str,
        options: &'a SearchOptions,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SearchResult>, WebSearchError>> + Send + 'a>>;
}
