//! Shared LLM service with two profiles: `chat` and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once at startup, wrap in `Arc`, and pass clones to dependents.
//! - Provider clients are built eagerly in [`LlmServiceProfiles::new`], so a
//!   broken config fails startup instead of the first request.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::LlmServiceProfiles;
//! use ai_llm_service::config::default_config::{config_chat_from_env, config_embedding_from_env};
//!
//! # async fn run() -> Result<(), ai_llm_service::AiLlmError> {
//! let svc = Arc::new(LlmServiceProfiles::new(
//!     config_chat_from_env()?,
//!     config_embedding_from_env()?,
//!     Some(10),
//! )?);
//! let emb = svc.embed("What is the Aven card?").await?;
//! println!("Embedding dim = {}", emb.len());
//! # Ok(()) }
//! ```

use std::{future::Future, pin::Pin};

use tracing::debug;

use crate::{
    chat_types::ChatMessage,
    completion::{ChatCompletion, TokenStream},
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ConfigError},
    health_service::{HealthService, HealthStatus},
    services::{hugging_face_service::HuggingFaceService, open_ai_service::OpenAiService},
};

enum EmbeddingClient {
    OpenAI(OpenAiService),
    HuggingFace(HuggingFaceService),
}

/// Shared service holding the chat and embedding clients.
pub struct LlmServiceProfiles {
    chat: OpenAiService,
    embedding: EmbeddingClient,
    embedding_cfg: LlmModelConfig,
    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates the service and builds both provider clients.
    ///
    /// # Errors
    /// - [`ConfigError::UnsupportedRole`] if a provider cannot serve its role
    /// - provider construction errors (missing key, invalid endpoint)
    pub fn new(
        chat: LlmModelConfig,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        if !chat.provider.supports_chat() {
            return Err(ConfigError::UnsupportedRole {
                provider: chat.provider,
                role: "chat",
            }
            .into());
        }
        let embedding_client = match embedding.provider {
            LlmProvider::OpenAI => EmbeddingClient::OpenAI(OpenAiService::new(embedding.clone())?),
            LlmProvider::HuggingFace => {
                EmbeddingClient::HuggingFace(HuggingFaceService::new(embedding.clone())?)
            }
            LlmProvider::Groq => {
                return Err(ConfigError::UnsupportedRole {
                    provider: embedding.provider,
                    role: "embeddings",
                }
                .into());
            }
        };

        Ok(Self {
            chat: OpenAiService::new(chat)?,
            embedding: embedding_client,
            embedding_cfg: embedding,
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Computes embeddings using the **embedding** profile.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if the provider call fails or the payload is malformed.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        match &self.embedding {
            EmbeddingClient::OpenAI(cli) => cli.embeddings(input).await,
            EmbeddingClient::HuggingFace(cli) => cli.embeddings(input).await,
        }
    }

    /// Returns a health snapshot for both profiles.
    ///
    /// If both profiles point to the same provider endpoint and model, it is
    /// checked only once.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = vec![self.chat.config().clone()];
        if self.embedding_cfg != *self.chat.config() {
            list.push(self.embedding_cfg.clone());
        }
        self.health.check_many(&list).await
    }

    /// Returns references to the current profiles `(chat, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig) {
        (self.chat.config(), &self.embedding_cfg)
    }
}

impl ChatCompletion for LlmServiceProfiles {
    fn stream_chat<'a>(
        &'a self,
        messages: Vec<ChatMessage>,
    ) -> Pin<Box<dyn Future<Output = Result<TokenStream, AiLlmError>> + Send + 'a>> {
        Box::pin(async move {
            debug!(
                provider = %self.chat.config().provider,
                messages = messages.len(),
                "stream_chat"
            );
            self.chat.stream_chat(&messages).await
        })
    }
}
