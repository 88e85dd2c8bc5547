//! HTTP surface of the Aven support assistant.
//!
//! Routes:
//! - `POST /chat` streams the answer as plain text
//! - `POST /sources` returns the documents an answer would be grounded on
//! - `GET /health` reports provider and index health
//! - `POST /index/refresh` repopulates the index (only with a refresh secret)

use std::sync::Arc;

pub mod core;
pub mod error_handler;
pub mod middleware_layer;
pub mod routes;

use axum::{
    Router,
    http::{HeaderName, HeaderValue},
    middleware,
    routing::{get, post},
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

pub use crate::core::app_state::{ApiConfig, AppState, refresh_secret_from_env};
pub use crate::core::health::{HealthReport, HealthReporter, ServiceHealth};
pub use crate::error_handler::{APOLOGY, AppError, AppResult};

use crate::{
    middleware_layer::{json_extractor::json_error_mapper, request_id::request_id},
    routes::{
        chat::chat_route::{X_RETRIEVAL_FALLBACK, X_RETRIEVAL_MATCHES, chat},
        health::health_route::health,
        index::refresh_index_route::refresh_index,
        sources::sources_route::sources,
    },
};

/// Builds the CORS layer for the configured browser origins; an empty
/// list allows any origin.
fn cors_layer(cfg: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .cors_allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };
    cors.allow_headers(Any)
        .allow_methods(Any)
        .expose_headers([
            HeaderName::from_static(X_RETRIEVAL_MATCHES),
            HeaderName::from_static(X_RETRIEVAL_FALLBACK),
            HeaderName::from_static(middleware_layer::request_id::X_REQUEST_ID),
        ])
}

/// The application router with all middleware applied.
pub fn router(state: Arc<AppState>, cfg: &ApiConfig) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/sources", post(sources))
        .route("/health", get(health))
        .route("/index/refresh", post(refresh_index))
        .with_state(state)
        .layer(middleware::from_fn(json_error_mapper))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(cfg))
}

pub async fn start(state: Arc<AppState>, cfg: ApiConfig) -> Result<(), AppError> {
    let app = router(state, &cfg);

    let listener = tokio::net::TcpListener::bind(&cfg.address)
        .await
        .map_err(|source| AppError::Bind {
            addr: cfg.address.clone(),
            source,
        })?;
    info!(address = %cfg.address, "api listening");

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("api stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed. If the handler cannot be installed the
/// server keeps running until killed.
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::health::HealthReport;
    use ai_llm_service::error_handler::{ProviderError, ProviderErrorKind};
    use ai_llm_service::{AiLlmError, ChatCompletion, ChatMessage, LlmProvider, TokenStream};
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use contextor::{Contextor, ContextorConfig};
    use futures::{StreamExt, stream};
    use rag_store::{EmbeddingsProvider, RagError, RagHit, RagRecord, VectorIndex};
    use serde_json::{Value, json};
    use std::{
        future::Future,
        pin::Pin,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };
    use tower::ServiceExt;
    use web_search::{SearchOptions, SearchResult, WebSearchError, WebSearchProvider};

    type Fut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

    #[derive(Default)]
    struct FakeEmbedder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl EmbeddingsProvider for FakeEmbedder {
        fn embed<'a>(&'a self, _text: &'a str) -> Fut<'a, Result<Vec<f32>, RagError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    Err(RagError::Config("embedding provider down".into()))
                } else {
                    Ok(vec![0.5, 0.5])
                }
            })
        }
    }

    #[derive(Default)]
    struct FakeIndex {
        hits: Vec<RagHit>,
        upserted: Mutex<Vec<RagRecord>>,
    }

    impl VectorIndex for FakeIndex {
        fn query<'a>(
            &'a self,
            _vector: Vec<f32>,
            top_k: u64,
        ) -> Fut<'a, Result<Vec<RagHit>, RagError>> {
            Box::pin(async move { Ok(self.hits.iter().take(top_k as usize).cloned().collect()) })
        }

        fn upsert<'a>(&'a self, records: Vec<RagRecord>) -> Fut<'a, Result<u64, RagError>> {
            Box::pin(async move {
                let n = records.len() as u64;
                self.upserted.lock().unwrap().extend(records);
                Ok(n)
            })
        }
    }

    #[derive(Default)]
    struct FakeSearch {
        queries: Mutex<Vec<String>>,
    }

    impl WebSearchProvider for FakeSearch {
        fn search<'a>(
            &'a self,
            query: &'a str,
            _options: &'a SearchOptions,
        ) -> Fut<'a, Result<Vec<SearchResult>, WebSearchError>> {
            Box::pin(async move {
                self.queries.lock().unwrap().push(query.to_string());
                Ok(vec![SearchResult {
                    title: Some("Aven HELOC card".into()),
                    url: "https://www.aven.com/heloc".into(),
                    text: Some("Aven offers a home equity line of credit card. ".repeat(5)),
                    published_date: Some("2024-05-01".into()),
                    highlights: vec![],
                }])
            })
        }
    }

    struct FakeChat {
        prompts: Mutex<Vec<Vec<ChatMessage>>>,
        tokens: Vec<Result<&'static str, &'static str>>,
    }

    impl FakeChat {
        fn streaming(tokens: Vec<Result<&'static str, &'static str>>) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                tokens,
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

    struct FakeHealth;

    impl HealthReporter for FakeHealth {
        fn report(&self) -> Fut<'_, HealthReport> {
            Box::pin(async { HealthReport::new(vec![], None, true) })
        }
    }

    fn hit(score: f32) -> RagHit {
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

    struct Rig {
        embedder: Arc<FakeEmbedder>,
        search: Arc<FakeSearch>,
        chat: Arc<FakeChat>,
        app: Router,
    }

    fn rig_with(
        embedder: FakeEmbedder,
        hits: Vec<RagHit>,
        tokens: Vec<Result<&'static str, &'static str>>,
        refresh_secret: Option<&str>,
    ) -> Rig {
        let embedder = Arc::new(embedder);
        let index = Arc::new(FakeIndex {
            hits,
            ..Default::default()
        });
        let search = Arc::new(FakeSearch::default());
        let chat = Arc::new(FakeChat::streaming(tokens));
        let contextor = Contextor::new(
            embedder.clone(),
            index,
            chat.clone(),
            ContextorConfig::default(),
        )
        .with_search(search.clone());
        let state = Arc::new(AppState {
            contextor: Arc::new(contextor),
            health: Arc::new(FakeHealth),
            refresh_secret: refresh_secret.map(str::to_string),
        });
        let cfg = ApiConfig {
            address: "127.0.0.1:0".into(),
            cors_allowed_origins: vec!["http://localhost:3000".into()],
        };
        Rig {
            embedder,
            search,
            chat,
            app: router(state, &cfg),
        }
    }

    fn rig(hits: Vec<RagHit>, tokens: &[&'static str]) -> Rig {
        rig_with(
            FakeEmbedder::default(),
            hits,
            tokens.iter().map(|t| Ok(*t)).collect(),
            None,
        )
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn text(res: axum::response::Response) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn json_body(res: axum::response::Response) -> Value {
        serde_json::from_str(&text(res).await).unwrap()
    }

    #[tokio::test]
    async fn grounded_answer_streams_tokens_in_order() {
        let r = rig(vec![hit(0.92)], &["The Aven card ", "is a ", "HELOC card."]);
        let res = r
            .app
            .clone()
            .oneshot(post_json(
                "/chat",
                r#"[{"role":"user","content":"What is the Aven card?"}]"#,
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
        assert_eq!(res.headers()["x-retrieval-matches"], "1");
        assert_eq!(res.headers()["x-retrieval-fallback"], "false");
        assert_eq!(text(res).await, "The Aven card is a HELOC card.");

        assert!(r.search.queries.lock().unwrap().is_empty());
        let prompt = r.chat.prompts.lock().unwrap()[0].clone();
        assert!(
            prompt
                .last()
                .unwrap()
                .content
                .contains("The Aven card is a credit card backed by home equity.")
        );
    }

    #[tokio::test]
    async fn weak_retrieval_uses_web_fallback() {
        let r = rig(vec![hit(0.3)], &["Here is what I found."]);
        let res = r
            .app
            .clone()
            .oneshot(post_json("/chat", r#"{"message":"How do I apply?"}"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["x-retrieval-matches"], "0");
        assert_eq!(res.headers()["x-retrieval-fallback"], "true");
        assert_eq!(text(res).await, "Here is what I found.");

        let queries = r.search.queries.lock().unwrap().clone();
        assert_eq!(queries.len(), 4);
        assert!(queries.iter().all(|q| q.contains("How do I apply?")));
        let prompt = r.chat.prompts.lock().unwrap()[0].clone();
        assert!(prompt.last().unwrap().content.contains("https://www.aven.com/heloc"));
    }

    #[tokio::test]
    async fn blank_message_is_rejected_before_embedding() {
        let r = rig(vec![hit(0.92)], &["unused"]);
        let res = r
            .app
            .clone()
            .oneshot(post_json("/chat", r#"[{"role":"user","content":"   "}]"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = json_body(res).await;
        assert_eq!(body["code"], "EMPTY_MESSAGE");
        assert!(body.get("message").is_none());
        assert_eq!(r.embedder.calls.load(Ordering::SeqCst), 0);
        assert!(r.chat.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let r = rig(vec![], &[]);
        let res = r
            .app
            .clone()
            .oneshot(post_json("/chat", "{not json"))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = json_body(res).await;
        assert_eq!(body["code"], "INVALID_JSON");
        assert_eq!(body["error"], "Bad Request");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn embedding_failure_returns_apology() {
        let r = rig_with(
            FakeEmbedder {
                fail: true,
                ..Default::default()
            },
            vec![hit(0.92)],
            vec![Ok("unused")],
            None,
        );
        let res = r
            .app
            .clone()
            .oneshot(post_json("/chat", r#"[{"role":"user","content":"Fees?"}]"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(res).await;
        assert_eq!(body["code"], "RETRIEVAL_FAILED");
        assert_eq!(body["message"], APOLOGY);
        assert!(r.chat.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_flushed_text() {
        let r = rig_with(
            FakeEmbedder::default(),
            vec![hit(0.92)],
            vec![Ok("Partial "), Ok("answer"), Err("connection reset")],
            None,
        );
        let res = r
            .app
            .clone()
            .oneshot(post_json("/chat", r#"[{"role":"user","content":"Fees?"}]"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let mut data = res.into_body().into_data_stream();
        let mut received = String::new();
        let mut failed = false;
        while let Some(chunk) = data.next().await {
            match chunk {
                Ok(bytes) => received.push_str(std::str::from_utf8(&bytes).unwrap()),
                Err(_) => {
                    failed = true;
                    break;
                }
            }
        }
        assert_eq!(received, "Partial answer");
        assert!(failed);
    }

    #[tokio::test]
    async fn sources_lists_grounded_matches() {
        let r = rig(vec![hit(0.92), hit(0.4)], &[]);
        let res = r
            .app
            .clone()
            .oneshot(post_json(
                "/sources",
                r#"{"message":"What is the Aven card?","conversation_id":"c-42"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["conversation_id"], "c-42");
        let sources = body["data"]["sources"].as_array().unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0]["url"], "https://www.aven.com/card");
        assert_eq!(sources[0]["is_aven_domain"], true);
        assert!(r.search.queries.lock().unwrap().is_empty());
        assert!(r.chat.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn health_reports_and_echoes_request_id() {
        let r = rig(vec![], &[]);
        let res = r
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "req-7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["x-request-id"], "req-7");
        let body = json_body(res).await;
        assert_eq!(body["data"]["ok"], true);
        assert_eq!(body["request_id"], "req-7");
    }

    #[tokio::test]
    async fn request_id_is_generated_when_absent() {
        let r = rig(vec![], &[]);
        let res = r
            .app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id = res.headers()["x-request-id"].to_str().unwrap();
        assert_eq!(id.len(), 36);
    }

    #[tokio::test]
    async fn wrong_method_gets_json_error() {
        let r = rig(vec![], &[]);
        let res = r
            .app
            .clone()
            .oneshot(Request::builder().uri("/chat").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = json_body(res).await;
        assert_eq!(body["code"], "METHOD_NOT_ALLOWED");
    }

    #[tokio::test]
    async fn refresh_is_hidden_without_secret() {
        let r = rig(vec![], &[]);
        let res = r
            .app
            .clone()
            .oneshot(post_json("/index/refresh", ""))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(r.search.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_requires_matching_secret() {
        let r = rig_with(FakeEmbedder::default(), vec![], vec![], Some("s3cret"));

        let mut req = post_json("/index/refresh", "");
        req.headers_mut()
            .insert("x-refresh-secret", HeaderValue::from_static("nope"));
        let res = r.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert!(r.search.queries.lock().unwrap().is_empty());

        let mut req = post_json("/index/refresh", "");
        req.headers_mut()
            .insert("x-refresh-secret", HeaderValue::from_static("s3cret"));
        let res = r.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["data"]["queries"], 8);
        assert_eq!(body["data"]["kept"], 8);
        assert_eq!(body["data"]["upserted"], 8);
        assert_eq!(r.search.queries.lock().unwrap().len(), 8);
    }
}
