//! Core data models used by the library.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Canonical record stored in Pinecone and used in ingestion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RagRecord {
    pub id: String,
    pub text: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

impl RagRecord {
    /// Metadata object sent alongside the vector.
    ///
    /// `title`, `content` and `url` are always present (empty strings when
    /// unknown); `extra` fields are merged on top.
    pub fn metadata(&self) -> Value {
        let mut m = Map::new();
        m.insert(
            "title".into(),
            Value::String(self.title.clone().unwrap_or_default()),
        );
        m.insert("content".into(), Value::String(self.text.clone()));
        m.insert(
            "url".into(),
            Value::String(self.url.clone().unwrap_or_default()),
        );
        for (k, v) in &self.extra {
            m.insert(k.clone(), v.clone());
        }
        Value::Object(m)
    }
}

/// Query parameters for RAG retrieval.
pub struct RagQuery<'a> {
    pub text: &'a str,
    pub top_k: u64,
}

/// A single retrieval hit with score, text and source.
#[derive(Clone, Debug, PartialEq)]
pub struct RagHit {
    pub id: String,
    pub score: f32,
    pub title: Option<String>,
    pub text: String,
    pub url: Option<String>,
    pub raw_payload: Value,
}

impl RagHit {
    /// Builds a hit from a Pinecone match.
    ///
    /// Text comes from `metadata.content`, falling back to `metadata.text`.
    pub fn from_metadata(id: impl Into<String>, score: f32, metadata: Value) -> Self {
        let text = non_empty_str(&metadata, "content")
            .or_else(|| non_empty_str(&metadata, "text"))
            .unwrap_or_default();
        Self {
            id: id.into(),
            score,
            title: non_empty_str(&metadata, "title"),
            text,
            url: non_empty_str(&metadata, "url"),
            raw_payload: metadata,
        }
    }
}

fn non_empty_str(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Truncates `s` to at most `max_chars` characters on a char boundary.
pub fn clamp_snippet(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
