//! Search request options and normalized results.

use serde::{Deserialize, Serialize};

/// Options for one search call.
///
/// Field names serialize to the Exa `/search` body.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// `neural`, `keyword` or `auto`.
    #[serde(rename = "type")]
    pub search_type: String,
    pub num_results: u32,
    pub use_autoprompt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_published_date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_domains: Vec<String>,
    #[serde(skip)]
    pub text: bool,
    #[serde(skip)]
    pub highlights: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            search_type: "neural".into(),
            num_results: 3,
            use_autoprompt: true,
            start_published_date: Some("2023-01-01".into()),
            include_domains: Vec::new(),
            text: true,
            highlights: true,
        }
    }
}

impl SearchOptions {
    pub fn with_num_results(mut self, n: u32) -> Self {
        self.num_results = n;
        self
    }

    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_domains = domains.into_iter().map(Into::into).collect();
        self
    }
}

/// One search hit with its retrieved page content.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl SearchResult {
    /// Length of the retrieved text in characters (0 when absent).
    pub fn text_chars(&self) -> usize {
        self.text.as_deref().map(|t| t.chars().count()).unwrap_or(0)
    }
}
