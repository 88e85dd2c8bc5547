use crate::config::llm_provider::LlmProvider;

/// Configuration for a single model invocation profile.
///
/// # Fields
///
/// - `provider`: Which backend serves this profile (Groq, OpenAI, HuggingFace).
/// - `model`: The model identifier (e.g. `"llama-3.1-8b-instant"`).
/// - `endpoint`: Base URL of the provider API, without the `/v1/...` suffix.
/// - `api_key`: API key; all hosted providers require one.
/// - `max_tokens`: Maximum number of tokens to generate (chat only).
/// - `temperature`: Sampling temperature (chat only).
/// - `top_p`: Nucleus sampling cutoff (chat only).
/// - `timeout_secs`: Optional request timeout in seconds.
///
/// # Examples
///
/// ```
/// use ai_llm_service::{LlmModelConfig, LlmProvider};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::Groq,
///     model: "llama-3.1-8b-instant".to_string(),
///     endpoint: "https://api.groq.com/openai".to_string(),
///     api_key: Some("gsk_...".to_string()),
///     max_tokens: Some(1000),
///     temperature: None,
///     top_p: None,
///     timeout_secs: Some(60),
/// };
/// assert!(cfg.provider.supports_chat());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The provider/backend.
    pub provider: LlmProvider,

    /// Model identifier string.
    pub model: String,

    /// Provider base URL.
    pub endpoint: String,

    /// API key for authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}
