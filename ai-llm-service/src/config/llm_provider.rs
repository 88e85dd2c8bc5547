use std::{fmt, str::FromStr};

use crate::error_handler::ConfigError;

/// Represents the provider (backend) used for chat completion or embeddings.
///
/// Groq exposes an OpenAI-compatible REST surface, so both are served by the
/// same client; HuggingFace is only used for embeddings.
///
/// # Examples
///
/// ```
/// use ai_llm_service::LlmProvider;
///
/// let p: LlmProvider = "groq".parse().unwrap();
/// assert_eq!(p, LlmProvider::Groq);
/// assert!(p.supports_chat());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// OpenAI REST API (chat + embeddings).
    OpenAI,
    /// Groq cloud, OpenAI-compatible (chat only).
    Groq,
    /// HuggingFace Inference API (embeddings only).
    HuggingFace,
}

impl LlmProvider {
    /// Whether this provider can serve streamed chat completions.
    pub fn supports_chat(self) -> bool {
        matches!(self, LlmProvider::OpenAI | LlmProvider::Groq)
    }

    /// Whether this provider can produce embeddings.
    pub fn supports_embeddings(self) -> bool {
        matches!(self, LlmProvider::OpenAI | LlmProvider::HuggingFace)
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LlmProvider::OpenAI => "openai",
            LlmProvider::Groq => "groq",
            LlmProvider::HuggingFace => "huggingface",
        };
        f.write_str(s)
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            "groq" => Ok(LlmProvider::Groq),
            "huggingface" | "hf" => Ok(LlmProvider::HuggingFace),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
