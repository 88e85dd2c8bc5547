//! Shared LLM service: provider configs, streaming chat completions,
//! embeddings and health probes behind one unified error type.
//!
//! Construct [`service_profiles::LlmServiceProfiles`] once at startup, wrap it
//! in `Arc`, and hand clones to whoever needs chat or embeddings.

pub mod config {
    pub mod default_config;
    pub mod llm_model_config;
    pub mod llm_provider;
}

pub mod services {
    pub mod hugging_face_service;
    pub mod open_ai_service;
    pub mod sse;
}

pub mod chat_types;
pub mod completion;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod telemetry;

pub use chat_types::{ChatMessage, ChatRole};
pub use completion::{ChatCompletion, TokenStream};
pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::AiLlmError;
pub use health_service::HealthStatus;
pub use service_profiles::LlmServiceProfiles;
