use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::{
    core::app_state::AppState,
    error_handler::AppResult,
    middleware_layer::request_id::request_id_of,
    routes::chat::chat_request::ChatRequest,
};

pub const X_RETRIEVAL_MATCHES: &str = "x-retrieval-matches";
pub const X_RETRIEVAL_FALLBACK: &str = "x-retrieval-fallback";

/// `POST /chat`: streams the answer as `text/plain` fragments in the order
/// the model emits them. Failures before the first token are JSON errors.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Response> {
    let request_id = request_id_of(&headers).to_string();
    let Json(req) = body.inspect_err(|e| {
        warn!(request_id = %request_id, error = %e.body_text(), "rejected chat body");
    })?;
    let conversation_id = req.conversation_id().map(str::to_string);
    let conversation = req.into_conversation();

    let answer = state
        .contextor
        .answer(conversation)
        .await
        .inspect_err(|e| warn!(request_id = %request_id, error = %e, "chat request failed"))?;

    let retrieval = &answer.retrieval;
    info!(
        request_id = %request_id,
        conversation_id = conversation_id.as_deref().unwrap_or("-"),
        matches = retrieval.matches.len(),
        fallback = retrieval.fallback_used,
        "streaming answer"
    );

    let matches = HeaderValue::from(retrieval.matches.len());
    let fallback = HeaderValue::from_static(if retrieval.fallback_used {
        "true"
    } else {
        "false"
    });

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (header::HeaderName::from_static(X_RETRIEVAL_MATCHES), matches),
            (header::HeaderName::from_static(X_RETRIEVAL_FALLBACK), fallback),
        ],
        Body::from_stream(answer.tokens),
    )
        .into_response())
}
