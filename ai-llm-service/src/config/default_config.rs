//! Default model configs loaded from environment variables.
//!
//! Two roles are configured:
//!
//! - **Chat**      → streamed completion (`CHAT_PROVIDER` = `groq` | `openai`)
//! - **Embedding** → query/document vectors (`EMBEDDING_PROVIDER` = `openai` | `huggingface`)
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_MAX_TOKENS`  = optional max tokens (u32)
//! - `LLM_TEMPERATURE` = optional temperature (0.0..=2.0)
//! - `LLM_TIMEOUT_SECS` = optional header/request timeout (u32)
//!
//! Groq: `GROQ_API_KEY` (required), `GROQ_URL`, `GROQ_MODEL`
//!
//! OpenAI: `OPENAI_API_KEY` (required), `OPENAI_URL`, `OPENAI_CHAT_MODEL`,
//! `OPENAI_EMBEDDING_MODEL`
//!
//! HuggingFace: `HUGGINGFACE_API_KEY` (required), `HUGGINGFACE_URL`,
//! `HUGGINGFACE_EMBEDDING_MODEL`

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_f32, env_opt_u32, env_or, must_env,
        validate_http_endpoint, validate_range_f32,
    },
};

pub const GROQ_URL: &str = "https://api.groq.com/openai";
pub const GROQ_MODEL: &str = "llama-3.1-8b-instant";
pub const OPENAI_URL: &str = "https://api.openai.com";
pub const OPENAI_CHAT_MODEL: &str = "gpt-4o-mini";
pub const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const HUGGINGFACE_URL: &str = "https://api-inference.huggingface.co";
pub const HUGGINGFACE_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

fn timeout_secs() -> Result<Option<u64>, AiLlmError> {
    Ok(env_opt_u32("LLM_TIMEOUT_SECS")?.map(u64::from))
}

fn chat_knobs() -> Result<(Option<u32>, Option<f32>), AiLlmError> {
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;
    let temperature = env_opt_f32("LLM_TEMPERATURE")?;
    if let Some(t) = temperature {
        validate_range_f32("temperature", t, 0.0, 2.0)?;
    }
    Ok((max_tokens, temperature))
}

/// Groq chat profile (`llama-3.1-8b-instant` by default).
pub fn config_groq_chat() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = env_or("GROQ_URL", GROQ_URL);
    validate_http_endpoint("GROQ_URL", &endpoint)?;
    let (max_tokens, temperature) = chat_knobs()?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Groq,
        model: env_or("GROQ_MODEL", GROQ_MODEL),
        endpoint,
        api_key: Some(must_env("GROQ_API_KEY")?),
        max_tokens,
        temperature,
        top_p: None,
        timeout_secs: Some(timeout_secs()?.unwrap_or(60)),
    })
}

/// OpenAI chat profile (`gpt-4o-mini` by default).
pub fn config_openai_chat() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = env_or("OPENAI_URL", OPENAI_URL);
    validate_http_endpoint("OPENAI_URL", &endpoint)?;
    let (max_tokens, temperature) = chat_knobs()?;

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model: env_or("OPENAI_CHAT_MODEL", OPENAI_CHAT_MODEL),
        endpoint,
        api_key: Some(must_env("OPENAI_API_KEY")?),
        max_tokens,
        temperature,
        top_p: None,
        timeout_secs: Some(timeout_secs()?.unwrap_or(60)),
    })
}

/// OpenAI embedding profile (`text-embedding-3-small` by default).
pub fn config_openai_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = env_or("OPENAI_URL", OPENAI_URL);
    validate_http_endpoint("OPENAI_URL", &endpoint)?;

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model: env_or("OPENAI_EMBEDDING_MODEL", OPENAI_EMBEDDING_MODEL),
        endpoint,
        api_key: Some(must_env("OPENAI_API_KEY")?),
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: Some(30),
    })
}

/// HuggingFace embedding profile (`all-MiniLM-L6-v2` by default).
pub fn config_huggingface_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = env_or("HUGGINGFACE_URL", HUGGINGFACE_URL);
    validate_http_endpoint("HUGGINGFACE_URL", &endpoint)?;

    Ok(LlmModelConfig {
        provider: LlmProvider::HuggingFace,
        model: env_or("HUGGINGFACE_EMBEDDING_MODEL", HUGGINGFACE_EMBEDDING_MODEL),
        endpoint,
        api_key: Some(must_env("HUGGINGFACE_API_KEY")?),
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: Some(30),
    })
}

/// Chat profile selected by `CHAT_PROVIDER` (default `groq`).
pub fn config_chat_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider: LlmProvider = env_or("CHAT_PROVIDER", "groq").parse()?;
    match provider {
        LlmProvider::Groq => config_groq_chat(),
        LlmProvider::OpenAI => config_openai_chat(),
        LlmProvider::HuggingFace => Err(ConfigError::UnsupportedRole {
            provider,
            role: "chat",
        }
        .into()),
    }
}

/// Embedding profile selected by `EMBEDDING_PROVIDER` (default `openai`).
pub fn config_embedding_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider: LlmProvider = env_or("EMBEDDING_PROVIDER", "openai").parse()?;
    match provider {
        LlmProvider::OpenAI => config_openai_embedding(),
        LlmProvider::HuggingFace => config_huggingface_embedding(),
        LlmProvider::Groq => Err(ConfigError::UnsupportedRole {
            provider,
            role: "embeddings",
        }
        .into()),
    }
}
