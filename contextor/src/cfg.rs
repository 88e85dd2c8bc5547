//! Runtime configuration loaded from environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `RAG_TOP_K` | `3` |
//! | `RAG_RELEVANCE_THRESHOLD` | `0.7` |
//! | `FALLBACK_SEARCH` | `true` |
//! | `FALLBACK_CONCURRENT` | `true` |
//! | `FALLBACK_MIN_TEXT_CHARS` | `100` |
//! | `FALLBACK_EXCERPT_CHARS` | `500` |
//! | `FALLBACK_MAX_EXCERPTS` | `8` |

use std::str::FromStr;

use web_search::SearchOptions;

use crate::error::ContextorError;
use crate::prompt::AVEN_SYSTEM;

/// Placeholder replaced by the user's question in query templates.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Site-scoped queries issued when indexed retrieval is insufficient.
pub const FALLBACK_TEMPLATES: [&str; 4] = [
    r#"site:aven.com "{query}" support help"#,
    r#"site:aven.com "aven card" {query}"#,
    r#""Aven card" {query} customer service help"#,
    "Aven financial services {query} support",
];

/// Queries used to (re)populate the index from the live site.
pub const INDEX_REFRESH_TEMPLATES: [&str; 8] = [
    "site:aven.com aven card",
    r#"site:aven.com "aven card" support articles"#,
    r#"site:aven.com "aven card" education how it works"#,
    r#"site:aven.com "aven card" reviews testimonials"#,
    r#"site:aven.com "aven card" about us"#,
    r#"site:aven.com "aven card" features benefits"#,
    r#"site:aven.com "aven card" application process"#,
    r#"site:aven.com "aven card" customer support help"#,
];

/// How the pipeline supplements weak retrieval with live web search.
#[derive(Clone, Debug, PartialEq)]
pub struct FallbackPolicy {
    pub enabled: bool,
    /// Run the template queries concurrently (results keep template order).
    pub concurrent: bool,
    pub templates: Vec<String>,
    pub options: SearchOptions,
    /// Results must have strictly more characters of text than this.
    pub min_text_chars: usize,
    /// Each excerpt is cut to this many characters.
    pub excerpt_chars: usize,
    pub max_excerpts: usize,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrent: true,
            templates: FALLBACK_TEMPLATES.iter().map(|t| t.to_string()).collect(),
            options: SearchOptions::default()
                .with_num_results(3)
                .with_domains(["aven.com"]),
            min_text_chars: 100,
            excerpt_chars: 500,
            max_excerpts: 8,
        }
    }
}

/// Index refresh settings.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexRefreshConfig {
    pub templates: Vec<String>,
    /// Total result budget, split evenly across templates.
    pub total_results: u32,
    /// Results must have strictly more characters of text than this.
    pub min_text_chars: usize,
    pub id_prefix: String,
    pub source_tag: String,
}

impl Default for IndexRefreshConfig {
    fn default() -> Self {
        Self {
            templates: INDEX_REFRESH_TEMPLATES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            total_results: 100,
            min_text_chars: 50,
            id_prefix: "aven-doc".into(),
            source_tag: "exa-search".into(),
        }
    }
}

impl IndexRefreshConfig {
    /// Search options for one refresh query: `total_results / templates` each.
    pub fn search_options(&self) -> SearchOptions {
        let per_query = self.total_results / (self.templates.len().max(1) as u32);
        SearchOptions::default().with_num_results(per_query.max(1))
    }
}

/// Config bag for the pipeline. All fields have defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextorConfig {
    pub top_k: u64,
    pub relevance_threshold: f32,
    pub system_prompt: String,
    pub fallback: FallbackPolicy,
    pub refresh: IndexRefreshConfig,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            relevance_threshold: 0.7,
            system_prompt: AVEN_SYSTEM.to_string(),
            fallback: FallbackPolicy::default(),
            refresh: IndexRefreshConfig::default(),
        }
    }
}

impl ContextorConfig {
    /// Build from environment variables with the defaults above.
    ///
    /// # Errors
    /// [`ContextorError::Config`] when a value does not parse or is out of range.
    pub fn from_env() -> Result<Self, ContextorError> {
        let d = Self::default();
        let cfg = Self {
            top_k: parse("RAG_TOP_K", d.top_k)?,
            relevance_threshold: parse("RAG_RELEVANCE_THRESHOLD", d.relevance_threshold)?,
            fallback: FallbackPolicy {
                enabled: flag("FALLBACK_SEARCH", d.fallback.enabled)?,
                concurrent: flag("FALLBACK_CONCURRENT", d.fallback.concurrent)?,
                min_text_chars: parse("FALLBACK_MIN_TEXT_CHARS", d.fallback.min_text_chars)?,
                excerpt_chars: parse("FALLBACK_EXCERPT_CHARS", d.fallback.excerpt_chars)?,
                max_excerpts: parse("FALLBACK_MAX_EXCERPTS", d.fallback.max_excerpts)?,
                ..d.fallback
            },
            ..d
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ContextorError> {
        if self.top_k == 0 {
            return Err(ContextorError::Config {
                var: "RAG_TOP_K",
                reason: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(ContextorError::Config {
                var: "RAG_RELEVANCE_THRESHOLD",
                reason: format!("{} is outside 0.0..=1.0", self.relevance_threshold),
            });
        }
        if self.fallback.excerpt_chars == 0 {
            return Err(ContextorError::Config {
                var: "FALLBACK_EXCERPT_CHARS",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn env(k: &str) -> Option<String> {
    std::env::var(k).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T>(k: &'static str, dflt: T) -> Result<T, ContextorError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env(k) {
        Some(v) => v.trim().parse().map_err(|e: T::Err| ContextorError::Config {
            var: k,
            reason: e.to_string(),
        }),
        None => Ok(dflt),
    }
}

fn flag(k: &'static str, dflt: bool) -> Result<bool, ContextorError> {
    match env(k).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(dflt),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ContextorError::Config {
                var: k,
                reason: format!("expected a boolean, got '{v}'"),
            }),
        },
    }
}
