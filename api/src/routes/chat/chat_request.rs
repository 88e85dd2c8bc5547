use ai_llm_service::ChatMessage;
use serde::Deserialize;

/// Body accepted by `POST /chat` and `POST /sources`.
///
/// Either the full conversation (most recent message last) or a single
/// message, which is treated as a one-turn conversation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChatRequest {
    Conversation(Vec<ChatMessage>),
    Single {
        message: String,
        #[serde(default)]
        conversation_id: Option<String>,
    },
}

impl ChatRequest {
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            ChatRequest::Conversation(_) => None,
            ChatRequest::Single {
                conversation_id, ..
            } => conversation_id.as_deref(),
        }
    }

    pub fn into_conversation(self) -> Vec<ChatMessage> {
        match self {
            ChatRequest::Conversation(messages) => messages,
            ChatRequest::Single { message, .. } => vec![ChatMessage::user(message)],
        }
    }
}
