use thiserror::Error;

/// Errors raised by web search providers.
#[derive(Debug, Error)]
pub enum WebSearchError {
    /// Missing or invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Empty query string.
    #[error("search query is empty")]
    EmptyQuery,

    /// Provider answered with a non-success status.
    #[error("search HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
        snippet: String,
    },

    /// Response body did not match the expected shape.
    #[error("search decode error: {0}")]
    Decode(String),

    /// Network / TLS / timeout failure.
    #[error("search transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
