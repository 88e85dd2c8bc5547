//! The answering pipeline: embed → vector search → optional web fallback →
//! prompt assembly → streamed completion.
//!
//! All collaborators are injected as trait objects and built once at startup;
//! the pipeline itself holds no per-request state.

use std::sync::Arc;
use std::time::Instant;

use ai_llm_service::{ChatCompletion, ChatMessage, ChatRole};
use futures::{StreamExt, TryStreamExt};
use rag_store::{EmbeddingsProvider, IngestOptions, RagQuery, VectorIndex, rag_context};
use tracing::{debug, error, info};
use web_search::WebSearchProvider;

use crate::api_types::{AnswerStream, RefreshReport, Retrieval, RetrievedMatch, SourceRef};
use crate::cfg::ContextorConfig;
use crate::error::ContextorError;
use crate::fallback::{best_score, needs_fallback, search_fallback};
use crate::indexer::refresh_index;
use crate::prompt::{build_messages, format_doc_context, format_web_context};

/// Checks a conversation and returns the latest user message.
///
/// # Errors
/// - [`ContextorError::InvalidConversation`] for an empty list, a `system`
///   turn, or a last turn not from the user
/// - [`ContextorError::EmptyInput`] when the last message is blank
pub fn validate_conversation(conversation: &[ChatMessage]) -> Result<&str, ContextorError> {
    let last = conversation
        .last()
        .ok_or_else(|| ContextorError::InvalidConversation("conversation is empty".into()))?;
    if conversation.iter().any(|m| m.role == ChatRole::System) {
        return Err(ContextorError::InvalidConversation(
            "system messages are not accepted".into(),
        ));
    }
    if last.role != ChatRole::User {
        return Err(ContextorError::InvalidConversation(
            "last message must come from the user".into(),
        ));
    }
    let text = last.content.trim();
    if text.is_empty() {
        return Err(ContextorError::EmptyInput);
    }
    Ok(text)
}

/// Retrieval-augmented answering pipeline.
pub struct Contextor {
    embedder: Arc<dyn EmbeddingsProvider>,
    index: Arc<dyn VectorIndex>,
    chat: Arc<dyn ChatCompletion>,
    search: Option<Arc<dyn WebSearchProvider>>,
    cfg: ContextorConfig,
    ingest: IngestOptions,
}

impl Contextor {
    pub fn new(
        embedder: Arc<dyn EmbeddingsProvider>,
        index: Arc<dyn VectorIndex>,
        chat: Arc<dyn ChatCompletion>,
        cfg: ContextorConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            chat,
            search: None,
            cfg,
            ingest: IngestOptions::default(),
        }
    }

    /// Enables fallback search and index refresh.
    pub fn with_search(mut self, search: Arc<dyn WebSearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_ingest_options(mut self, opts: IngestOptions) -> Self {
        self.ingest = opts;
        self
    }

    pub fn config(&self) -> &ContextorConfig {
        &self.cfg
    }

    pub fn has_search(&self) -> bool {
        self.search.is_some()
    }

    async fn ranked_hits(&self, question: &str) -> Result<Vec<rag_store::RagHit>, ContextorError> {
        let started = Instant::now();
        let query = RagQuery {
            text: question,
            top_k: self.cfg.top_k,
        };
        let hits = rag_context(self.index.as_ref(), self.embedder.as_ref(), query)
            .await
            .map_err(|e| {
                error!(error = %e, "embedding or vector search failed");
                ContextorError::Rag(e)
            })?;
        debug!(
            hits = hits.len(),
            latency_ms = started.elapsed().as_millis(),
            "vector search done"
        );
        Ok(hits)
    }

    fn grounded(&self, hits: Vec<rag_store::RagHit>) -> Vec<RetrievedMatch> {
        let threshold = self.cfg.relevance_threshold;
        hits.into_iter()
            .filter(|h| h.score >= threshold)
            .map(RetrievedMatch::from)
            .collect()
    }

    /// Embeds `question`, searches the index and, when retrieval is weak,
    /// the web. Returns the context block to append to the user turn.
    ///
    /// # Errors
    /// Embedding and vector search failures. Web search failures never fail.
    pub async fn retrieve(&self, question: &str) -> Result<Retrieval, ContextorError> {
        let hits = self.ranked_hits(question).await?;
        let total_hits = hits.len();
        let best = best_score(&hits);
        let weak = needs_fallback(&hits, self.cfg.relevance_threshold);

        let matches = self.grounded(hits);
        let mut context = format_doc_context(&matches);
        let mut out = Retrieval {
            total_hits,
            best_score: best,
            ..Default::default()
        };

        match (&self.search, weak && self.cfg.fallback.enabled) {
            (Some(search), true) => {
                let outcome = search_fallback(search.as_ref(), question, &self.cfg.fallback).await;
                context.push_str(&format_web_context(
                    &outcome.results,
                    self.cfg.fallback.excerpt_chars,
                ));
                out.fallback_used = true;
                out.fallback_failures = outcome.failed;
                out.web_results = outcome.results.len();
            }
            (None, true) => debug!("retrieval is weak but no web search is configured"),
            _ => {}
        }

        info!(
            total_hits,
            grounded = matches.len(),
            best_score = best.unwrap_or_default(),
            fallback = out.fallback_used,
            web_results = out.web_results,
            "retrieval finished"
        );
        out.matches = matches;
        out.context = context;
        Ok(out)
    }

    /// Runs retrieval and opens the completion stream.
    ///
    /// Tokens are forwarded as the provider emits them; a provider error
    /// mid-stream is the stream's last item.
    ///
    /// # Errors
    /// Input errors (before any provider call), embedding / vector search
    /// failures, and completion failures before the first token.
    pub async fn answer(&self, conversation: Vec<ChatMessage>) -> Result<AnswerStream, ContextorError> {
        let question = validate_conversation(&conversation)?;
        let retrieval = self.retrieve(question).await?;

        let messages = build_messages(&self.cfg.system_prompt, &conversation, &retrieval.context);
        debug!(messages = messages.len(), context_chars = retrieval.context.len(), "prompt assembled");

        let tokens = self.chat.stream_chat(messages).await.map_err(|e| {
            error!(error = %e, "completion request failed");
            ContextorError::Completion(e)
        })?;
        let tokens = tokens
            .inspect_err(|e| error!(error = %e, "completion stream failed"))
            .boxed();

        Ok(AnswerStream { retrieval, tokens })
    }

    /// Sources for the latest user message: grounded matches only, no web
    /// fallback and no completion.
    ///
    /// # Errors
    /// Input errors, embedding and vector search failures.
    pub async fn sources(&self, conversation: &[ChatMessage]) -> Result<Vec<SourceRef>, ContextorError> {
        let question = validate_conversation(conversation)?;
        let hits = self.ranked_hits(question).await?;
        Ok(self.grounded(hits).iter().map(SourceRef::from).collect())
    }

    /// Repopulates the index from live web search.
    ///
    /// # Errors
    /// [`ContextorError::SearchUnavailable`] without a search provider;
    /// upsert failures.
    pub async fn refresh_index(&self) -> Result<RefreshReport, ContextorError> {
        let search = self
            .search
            .as_ref()
            .ok_or(ContextorError::SearchUnavailable)?;
        refresh_index(
            search.as_ref(),
            self.embedder.as_ref(),
            self.index.as_ref(),
            &self.cfg.refresh,
            &self.ingest,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_llm_service::{AiLlmError, TokenStream};
    use ai_llm_service::error_handler::{ProviderError, ProviderErrorKind};
    use ai_llm_service::LlmProvider;
    use futures::stream;
    use rag_store::{RagError, RagHit, RagRecord};
    use serde_json::json;
    use std::{
        future::Future,
        pin::Pin,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };
    use web_search::{SearchOptions, SearchResult, WebSearchError};

    type Fut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

    #[derive(Default)]
    pub struct FakeEmbedder {
        pub calls: AtomicUsize,
        pub fail: bool,
    }

    impl EmbeddingsProvider for FakeEmbedder {
        fn embed<'a>(&'a self, _text: &'a str) -> Fut<'a, Result<Vec<f32>, RagError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    Err(RagError::Config("embedding provider down".into()))
                } else {
                    Ok(vec![0.1, 0.2, 0.3])
                }
            })
        }
    }

    #[derive(Default)]
    pub struct FakeIndex {
        pub hits: Vec<RagHit>,
        pub calls: AtomicUsize,
        pub upsert_calls: AtomicUsize,
        pub upserted: Mutex<Vec<RagRecord>>,
    }

    impl FakeIndex {
        pub fn with_hits(hits: Vec<RagHit>) -> Self {
            Self {
                hits,
                ..Default::default()
            }
        }
    }

    impl VectorIndex for FakeIndex {
        fn query<'a>(
            &'a self,
            _vector: Vec<f32>,
            top_k: u64,
        ) -> Fut<'a, Result<Vec<RagHit>, RagError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.hits.iter().take(top_k as usize).cloned().collect())
            })
        }

        fn upsert<'a>(&'a self, records: Vec<RagRecord>) -> Fut<'a, Result<u64, RagError>> {
            Box::pin(async move {
                self.upsert_calls.fetch_add(1, Ordering::SeqCst);
                let n = records.len() as u64;
                self.upserted.lock().unwrap().extend(records);
                Ok(n)
            })
        }
    }

    /// Web search fake: counts calls, records queries, optionally fails all.
    #[derive(Default)]
    pub struct FakeSearch {
        pub queries: Mutex<Vec<String>>,
        pub fail: bool,
        pub results: Vec<SearchResult>,
    }

    impl WebSearchProvider for FakeSearch {
        fn search<'a>(
            &'a self,
            query: &'a str,
            _options: &'a SearchOptions,
        ) -> Fut<'a, Result<Vec<SearchResult>, WebSearchError>> {
            Box::pin(async move {
                self.queries.lock().unwrap().push(query.to_string());
                if self.fail {
                    Err(WebSearchError::Decode("search provider down".into()))
                } else {
                    Ok(self.results.clone())
                }
            })
        }
    }

    /// Completion fake: records the prompt and streams fixed tokens; an
    /// `Err` entry becomes a mid-stream provider error.
    pub struct FakeChat {
        pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
        pub tokens: Vec<Result<&'static str, &'static str>>,
    }

    impl FakeChat {
        pub fn streaming(tokens: &[&'static str]) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                tokens: tokens.iter().map(|t| Ok(*t)).collect(),
            }
        }
    }

    impl ChatCompletion for FakeChat {
        fn stream_chat<'a>(
            &'a self,
            messages: Vec<ChatMessage>,
        ) -> Fut<'a, Result<TokenStream, AiLlmError>> {
            Box::pin(async move {
                self.prompts.lock().unwrap().push(messages);
                let items: Vec<Result<String, AiLlmError>> = self
                    .tokens
                    .iter()
                    .map(|t| match t {
                        Ok(s) => Ok(s.to_string()),
                        Err(m) => Err(AiLlmError::Provider(ProviderError::new(
                            LlmProvider::Groq,
                            ProviderErrorKind::Stream(m.to_string()),
                        ))),
                    })
                    .collect();
                Ok(stream::iter(items).boxed())
            })
        }
    }

    pub fn card_hit(score: f32) -> RagHit {
        RagHit::from_metadata(
            "aven-doc-0",
            score,
            json!({
                "title": "What is the Aven card?",
                "content": "The Aven card is a credit card backed by home equity.",
                "url": "https://www.aven.com/card"
            }),
        )
    }

    fn long_result(tag: &str) -> SearchResult {
        SearchResult {
            title: Some(format!("Aven {tag}")),
            url: format!("https://www.aven.com/{tag}"),
            text: Some(format!("{tag} ").repeat(60)),
            published_date: Some("2024-05-01".into()),
            highlights: vec![],
        }
    }

    struct Rig {
        embedder: Arc<FakeEmbedder>,
        index: Arc<FakeIndex>,
        search: Arc<FakeSearch>,
        chat: Arc<FakeChat>,
    }

    impl Rig {
        fn new(hits: Vec<RagHit>, search: FakeSearch, chat: FakeChat) -> Self {
            Self {
                embedder: Arc::new(FakeEmbedder::default()),
                index: Arc::new(FakeIndex::with_hits(hits)),
                search: Arc::new(search),
                chat: Arc::new(chat),
            }
        }

        fn contextor(&self) -> Contextor {
            Contextor::new(
                self.embedder.clone(),
                self.index.clone(),
                self.chat.clone(),
                ContextorConfig::default(),
            )
            .with_search(self.search.clone())
        }

        fn last_prompt(&self) -> Vec<ChatMessage> {
            self.chat.prompts.lock().unwrap().last().cloned().unwrap()
        }
    }

    async fn collect(tokens: TokenStream) -> (Vec<String>, Option<AiLlmError>) {
        let mut out = Vec::new();
        let mut tokens = tokens;
        while let Some(item) = tokens.next().await {
            match item {
                Ok(t) => out.push(t),
                Err(e) => return (out, Some(e)),
            }
        }
        (out, None)
    }

    #[tokio::test]
    async fn strong_match_skips_fallback_and_grounds_prompt() {
        let rig = Rig::new(
            vec![card_hit(0.92)],
            FakeSearch::default(),
            FakeChat::streaming(&["The ", "Aven ", "card ", "is..."]),
        );
        let ans = rig
            .contextor()
            .answer(vec![ChatMessage::user("What is the Aven card?")])
            .await
            .unwrap();

        assert!(!ans.retrieval.fallback_used);
        assert!(rig.search.queries.lock().unwrap().is_empty());
        assert_eq!(rig.embedder.calls.load(Ordering::SeqCst), 1);

        let prompt = rig.last_prompt();
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt[0].role, ChatRole::System);
        assert!(prompt[1].content.starts_with("What is the Aven card?"));
        assert!(prompt[1].content.contains("The Aven card is a credit card backed by home equity."));
        assert!(!prompt[1].content.contains("Real-time Aven Information"));

        let (tokens, err) = collect(ans.tokens).await;
        assert!(err.is_none());
        assert_eq!(tokens, vec!["The ", "Aven ", "card ", "is..."]);
    }

    #[tokio::test]
    async fn below_threshold_hit_stays_out_of_grounded_prompt() {
        let low = RagHit::from_metadata(
            "aven-doc-9",
            0.5,
            json!({
                "title": "Mortgage rates",
                "content": "Thirty-year fixed mortgage rates this week.",
                "url": "https://www.aven.com/rates"
            }),
        );
        let rig = Rig::new(
            vec![card_hit(0.92), low],
            FakeSearch::default(),
            FakeChat::streaming(&["ok"]),
        );
        let ans = rig
            .contextor()
            .answer(vec![ChatMessage::user("What is the Aven card?")])
            .await
            .unwrap();

        assert!(!ans.retrieval.fallback_used);
        assert_eq!(ans.retrieval.total_hits, 2);
        assert_eq!(ans.retrieval.matches.len(), 1);
        assert!(rig.search.queries.lock().unwrap().is_empty());

        let content = &rig.last_prompt()[1].content;
        assert!(content.contains("The Aven card is a credit card backed by home equity."));
        assert!(!content.contains("Thirty-year fixed mortgage rates"));
        assert!(!content.contains("https://www.aven.com/rates"));
    }

    #[tokio::test]
    async fn no_matches_all_searches_fail_still_completes() {
        let rig = Rig::new(
            vec![],
            FakeSearch {
                fail: true,
                ..Default::default()
            },
            FakeChat::streaming(&["Sorry, ", "could you rephrase?"]),
        );
        let ans = rig
            .contextor()
            .answer(vec![ChatMessage::user("asdasdasd")])
            .await
            .unwrap();

        assert!(ans.retrieval.fallback_used);
        assert_eq!(ans.retrieval.fallback_failures, 4);
        assert_eq!(
            *rig.search.queries.lock().unwrap(),
            vec![
                r#"site:aven.com "asdasdasd" support help"#,
                r#"site:aven.com "aven card" asdasdasd"#,
                r#""Aven card" asdasdasd customer service help"#,
                "Aven financial services asdasdasd support",
            ]
        );
        let prompt = rig.last_prompt();
        assert_eq!(prompt[1].content, "asdasdasd");

        let (tokens, _) = collect(ans.tokens).await;
        assert_eq!(tokens.concat(), "Sorry, could you rephrase?");
    }

    #[tokio::test]
    async fn weak_match_is_excluded_and_web_results_appended() {
        let rig = Rig::new(
            vec![card_hit(0.42)],
            FakeSearch {
                results: vec![
                    long_result("fees"),
                    SearchResult {
                        text: Some("too short".into()),
                        ..long_result("short")
                    },
                ],
                ..Default::default()
            },
            FakeChat::streaming(&["ok"]),
        );
        let ans = rig
            .contextor()
            .answer(vec![ChatMessage::user("What are the fees?")])
            .await
            .unwrap();

        let r = &ans.retrieval;
        assert!(r.matches.is_empty());
        assert_eq!(r.best_score, Some(0.42));
        assert!(r.fallback_used);
        // four templates, one long result each
        assert_eq!(r.web_results, 4);

        let content = &rig.last_prompt()[1].content;
        assert!(!content.contains("Relevant Aven Documentation"));
        assert!(!content.contains("backed by home equity"));
        assert!(content.contains("Real-time Aven Information"));
        assert!(content.contains("URL: https://www.aven.com/fees"));
        assert!(!content.contains("too short"));
    }

    #[tokio::test]
    async fn history_is_forwarded_unchanged() {
        let rig = Rig::new(vec![card_hit(0.95)], FakeSearch::default(), FakeChat::streaming(&["x"]));
        let conv = vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("Hello! How can I help with your Aven card?"),
            ChatMessage::user("What is the Aven card?"),
        ];
        rig.contextor().answer(conv.clone()).await.unwrap();
        let prompt = rig.last_prompt();
        assert_eq!(prompt.len(), 4);
        assert_eq!(&prompt[1..3], &conv[..2]);
    }

    #[tokio::test]
    async fn empty_input_makes_no_provider_calls() {
        let rig = Rig::new(vec![card_hit(0.9)], FakeSearch::default(), FakeChat::streaming(&[]));
        let err = rig
            .contextor()
            .answer(vec![ChatMessage::user("   ")])
            .await
            .unwrap_err();
        assert!(matches!(err, ContextorError::EmptyInput));
        assert!(err.is_client_error());
        assert_eq!(rig.embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(rig.index.calls.load(Ordering::SeqCst), 0);
        assert!(rig.chat.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_aborts_before_completion() {
        let rig = Rig::new(vec![], FakeSearch::default(), FakeChat::streaming(&["x"]));
        let embedder = Arc::new(FakeEmbedder {
            fail: true,
            ..Default::default()
        });
        let ctx = Contextor::new(
            embedder,
            rig.index.clone(),
            rig.chat.clone(),
            ContextorConfig::default(),
        );
        let err = ctx
            .answer(vec![ChatMessage::user("What is the Aven card?")])
            .await
            .unwrap_err();
        assert!(matches!(err, ContextorError::Rag(_)));
        assert!(!err.is_client_error());
        assert!(rig.chat.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mid_stream_error_is_terminal_after_flushed_tokens() {
        let chat = FakeChat {
            prompts: Mutex::new(Vec::new()),
            tokens: vec![Ok("Partial "), Ok("answer"), Err("connection reset")],
        };
        let rig = Rig::new(vec![card_hit(0.9)], FakeSearch::default(), chat);
        let ans = rig
            .contextor()
            .answer(vec![ChatMessage::user("What is the Aven card?")])
            .await
            .unwrap();
        let (tokens, err) = collect(ans.tokens).await;
        assert_eq!(tokens, vec!["Partial ", "answer"]);
        assert!(err.is_some());
    }

    #[tokio::test]
    async fn sources_lists_only_grounded_matches() {
        let mut low = card_hit(0.5);
        low.url = Some("https://example.com/x".into());
        let rig = Rig::new(
            vec![card_hit(0.88), low],
            FakeSearch::default(),
            FakeChat::streaming(&[]),
        );
        let src = rig
            .contextor()
            .sources(&[ChatMessage::user("What is the Aven card?")])
            .await
            .unwrap();
        assert_eq!(src.len(), 1);
        assert_eq!(src[0].domain.as_deref(), Some("www.aven.com"));
        assert!(src[0].is_aven_domain);
        assert!(rig.search.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fallback_disabled_never_searches() {
        let rig = Rig::new(vec![], FakeSearch::default(), FakeChat::streaming(&["x"]));
        let mut cfg = ContextorConfig::default();
        cfg.fallback.enabled = false;
        let ctx = Contextor::new(rig.embedder.clone(), rig.index.clone(), rig.chat.clone(), cfg)
            .with_search(rig.search.clone());
        let r = ctx.retrieve("anything").await.unwrap();
        assert!(!r.fallback_used);
        assert!(r.context.is_empty());
        assert!(rig.search.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_upserts_long_results_with_metadata() {
        let rig = Rig::new(
            vec![],
            FakeSearch {
                results: vec![
                    long_result("about"),
                    SearchResult {
                        text: Some("short".into()),
                        ..long_result("tiny")
                    },
                ],
                ..Default::default()
            },
            FakeChat::streaming(&[]),
        );
        let report = rig.contextor().refresh_index().await.unwrap();

        assert_eq!(report.queries, 8);
        assert_eq!(report.results, 16);
        assert_eq!(report.kept, 8);
        assert_eq!(report.upserted, 8);
        let stored = rig.index.upserted.lock().unwrap();
        assert!(stored.iter().all(|r| r.id.starts_with("aven-doc-")));
        assert_eq!(stored[0].extra["source"], "exa-search");
        assert!(stored[0].embedding.is_some());
    }

    #[tokio::test]
    async fn refresh_batches_follow_ingest_options() {
        let rig = Rig::new(
            vec![],
            FakeSearch {
                results: vec![long_result("about")],
                ..Default::default()
            },
            FakeChat::streaming(&[]),
        );
        let ctx = rig.contextor().with_ingest_options(IngestOptions {
            batch_size: 3,
            ..Default::default()
        });
        let report = ctx.refresh_index().await.unwrap();

        assert_eq!(report.kept, 8);
        assert_eq!(report.upserted, 8);
        assert_eq!(rig.index.upsert_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn refresh_without_search_is_rejected() {
        let rig = Rig::new(vec![], FakeSearch::default(), FakeChat::streaming(&[]));
        let ctx = Contextor::new(
            rig.embedder.clone(),
            rig.index.clone(),
            rig.chat.clone(),
            ContextorConfig::default(),
        );
        assert!(matches!(
            ctx.refresh_index().await,
            Err(ContextorError::SearchUnavailable)
        ));
    }

    #[test]
    fn conversation_validation() {
        assert!(matches!(
            validate_conversation(&[]),
            Err(ContextorError::InvalidConversation(_))
        ));
        assert!(matches!(
            validate_conversation(&[ChatMessage::assistant("hi")]),
            Err(ContextorError::InvalidConversation(_))
        ));
        assert!(matches!(
            validate_conversation(&[ChatMessage::system("x"), ChatMessage::user("hi")]),
            Err(ContextorError::InvalidConversation(_))
        ));
        assert_eq!(
            validate_conversation(&[ChatMessage::user("  hello ")]).unwrap(),
            "hello"
        );
    }
}
