//! Exa search client: `POST {endpoint}/search` with page contents.

use std::{future::Future, pin::Pin, time::Duration};

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    WebSearchProvider,
    config::ExaConfig,
    error::WebSearchError,
    types::{SearchOptions, SearchResult},
};

const SNIPPET_CHARS: usize = 240;

#[derive(Debug, Serialize)]
struct Contents {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    text: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    highlights: bool,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    #[serde(flatten)]
    options: &'a SearchOptions,
    contents: Contents,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// HTTP client for the Exa search API.
pub struct ExaClient {
    client: reqwest::Client,
    url_search: String,
}

impl ExaClient {
    /// # Errors
    /// [`WebSearchError::Config`] on invalid config, transport errors if the
    /// HTTP client cannot be built.
    pub fn new(cfg: &ExaConfig) -> Result<Self, WebSearchError> {
        cfg.validate()?;
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(cfg.api_key.trim())
            .map_err(|e| WebSearchError::Config(format!("invalid EXA_API_KEY header: {e}")))?;
        headers.insert("x-api-key", key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            url_search: format!("{}/search", cfg.endpoint.trim().trim_end_matches('/')),
        })
    }

    /// Runs one search and returns results in provider rank order.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, WebSearchError> {
        if query.trim().is_empty() {
            return Err(WebSearchError::EmptyQuery);
        }
        let body = build_request(query, options);
        debug!(%query, num_results = options.num_results, "exa search");

        let resp = self.client.post(&self.url_search).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            let snippet: String = text.chars().take(SNIPPET_CHARS).collect();
            error!(url = %self.url_search, %status, %snippet, "exa search failed");
            return Err(WebSearchError::HttpStatus {
                status,
                url: self.url_search.clone(),
                snippet,
            });
        }

        let parsed: SearchResponse =
            serde_json::from_str(&text).map_err(|e| WebSearchError::Decode(e.to_string()))?;
        debug!(%query, results = parsed.results.len(), "exa search done");
        Ok(parsed.results)
    }
}

fn build_request<'a>(query: &'a str, options: &'a SearchOptions) -> SearchRequest<'a> {
    SearchRequest {
        query,
        options,
        contents: Contents {
            text: options.text,
            highlights: options.highlights,
        },
    }
}

impl WebSearchProvider for ExaClient {
    fn search<'a>(
        &'a self,
        query: &'a str,
        options: &'a SearchOptions,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SearchResult>, WebSearchError>> + Send + 'a>>
    {
        Box::pin(ExaClient::search(self, query, options))
    }
}
