//! Prompt builder: brand system message + context blocks appended to the
//! latest user turn.

use ai_llm_service::{ChatMessage, ChatRole};
use rag_store::clamp_snippet;
use web_search::SearchResult;

use crate::api_types::RetrievedMatch;

/// Default system instructions for the customer-support assistant.
pub const AVEN_SYSTEM: &str = "You are Aven's customer service AI assistant. You help customers with questions about Aven Card, which is a financial services product that helps users build credit and manage their finances.

Your role is to:
- Provide helpful, accurate information about Aven Card features and services
- Guide customers through common processes and troubleshooting
- Maintain a friendly, professional, and supportive tone
- Use the provided context from Aven's official documentation and website
- If you don't know something specific, direct customers to contact Aven support directly

Always prioritize customer satisfaction and provide clear, actionable responses based on the retrieved information about Aven.";

pub const DOC_CONTEXT_HEADER: &str = "\n\nRelevant Aven Documentation:\n";
pub const WEB_CONTEXT_HEADER: &str = "\n\nReal-time Aven Information:\n";

const DEFAULT_DOC_TITLE: &str = "Aven Documentation";
const DEFAULT_DOC_SOURCE: &str = "Aven Official Documentation";
const DEFAULT_WEB_TITLE: &str = "Aven";
const DEFAULT_PUBLISHED: &str = "Recent";

/// Formats grounded matches. Empty input yields an empty string.
///
/// # Example
/// ```
/// use contextor::{RetrievedMatch, prompt::format_doc_context};
/// let m = RetrievedMatch {
///     id: "a".into(),
///     title: None,
///     content: "No annual fee.".into(),
///     url: None,
///     score: 0.923,
/// };
/// let block = format_doc_context(&[m]);
/// assert!(block.contains("Title: Aven Documentation"));
/// assert!(block.contains("Relevance Score: 92.3%"));
/// ```
pub fn format_doc_context(matches: &[RetrievedMatch]) -> String {
    if matches.is_empty() {
        return String::new();
    }
    let mut out = String::from(DOC_CONTEXT_HEADER);
    for (i, m) in matches.iter().enumerate() {
        out.push_str(&format!(
            "\nContext {}:\nTitle: {}\nContent: {}\nSource: {}\nRelevance Score: {:.1}%\n---\n",
            i + 1,
            m.title.as_deref().unwrap_or(DEFAULT_DOC_TITLE),
            m.content.trim(),
            m.url.as_deref().unwrap_or(DEFAULT_DOC_SOURCE),
            m.score * 100.0,
        ));
    }
    out
}

/// Formats web excerpts, each cut to `excerpt_chars` characters.
/// Empty input yields an empty string.
pub fn format_web_context(results: &[SearchResult], excerpt_chars: usize) -> String {
    if results.is_empty() {
        return String::new();
    }
    let mut out = String::from(WEB_CONTEXT_HEADER);
    for (i, r) in results.iter().enumerate() {
        let text = r.text.as_deref().unwrap_or_default().trim();
        out.push_str(&format!(
            "\nReal-time Result {}:\nTitle: {}\nContent: {}...\nURL: {}\nPublished: {}\n---\n",
            i + 1,
            r.title
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(DEFAULT_WEB_TITLE),
            clamp_snippet(text, excerpt_chars),
            r.url,
            r.published_date
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or(DEFAULT_PUBLISHED),
        ));
    }
    out
}

/// System prompt, prior turns unchanged, then the final user turn with
/// `context` appended after its original content.
///
/// The caller guarantees the conversation is non-empty and ends with a user
/// message.
pub fn build_messages(system: &str, conversation: &[ChatMessage], context: &str) -> Vec<ChatMessage> {
    let mut out = Vec::with_capacity(conversation.len() + 1);
    out.push(ChatMessage::system(system));
    if let Some((last, prior)) = conversation.split_last() {
        out.extend(prior.iter().cloned());
        out.push(ChatMessage {
            role: ChatRole::User,
            content: format!("{}{}", last.content, context),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web(text: &str) -> SearchResult {
        SearchResult {
            title: Some("Aven Card FAQ".into()),
            url: "https://www.aven.com/support".into(),
            text: Some(text.into()),
            published_date: None,
            highlights: vec![],
        }
    }

    #[test]
    fn doc_block_layout() {
        let m = RetrievedMatch {
            id: "a".into(),
            title: Some("Aven Card".into()),
            content: "The Aven card is a credit card backed by home equity.".into(),
            url: Some("https://www.aven.com/card".into()),
            score: 0.92,
        };
        let block = format_doc_context(&[m]);
        assert_eq!(
            block,
            "\n\nRelevant Aven Documentation:\n\nContext 1:\nTitle: Aven Card\nContent: The Aven card is a credit card backed by home equity.\nSource: https://www.aven.com/card\nRelevance Score: 92.0%\n---\n"
        );
        assert_eq!(format_doc_context(&[]), "");
    }

    #[test]
    fn web_block_truncates_and_defaults_published() {
        let long = "a".repeat(800);
        let block = format_web_context(&[web(&long)], 500);
        assert!(block.starts_with(WEB_CONTEXT_HEADER));
        assert!(block.contains(&format!("Content: {}...\n", "a".repeat(500))));
        assert!(!block.contains(&"a".repeat(501)));
        assert!(block.contains("Published: Recent"));
        assert_eq!(format_web_context(&[], 500), "");
    }

    #[test]
    fn messages_keep_history_and_append_context() {
        let conv = vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("Hello! How can I help?"),
            ChatMessage::user("What is the Aven card?"),
        ];
        let msgs = build_messages("SYS", &conv, "\n\nCTX");
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[0], ChatMessage::system("SYS"));
        assert_eq!(&msgs[1..3], &conv[..2]);
        assert_eq!(msgs[3], ChatMessage::user("What is the Aven card?\n\nCTX"));
    }
}
