//! Streaming chat-completion seam.
//!
//! Callers depend on [`ChatCompletion`] instead of a concrete client so the
//! answering pipeline can be driven by fakes in tests.

use std::{future::Future, pin::Pin};

use futures::stream::BoxStream;

use crate::{chat_types::ChatMessage, error_handler::AiLlmError};

/// Lazily produced text fragments of one completion, in emission order.
///
/// The stream ends when the provider signals completion. An `Err` item is
/// terminal: nothing follows it.
pub type TokenStream = BoxStream<'static, Result<String, AiLlmError>>;

/// Provider interface for streamed chat completions.
pub trait ChatCompletion: Send + Sync {
    /// Starts a streamed completion for `messages`.
    ///
    /// Resolves once the upstream accepted the request (2xx); the returned
    /// stream then yields deltas as they arrive.
    fn stream_chat<'a>(
        &'a self,
        messages: Vec<ChatMessage>,
    ) -> Pin<Box<dyn Future<Output = Result<TokenStream, AiLlmError>> + Send + 'a>>;
}
