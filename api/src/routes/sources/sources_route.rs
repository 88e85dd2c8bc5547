use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use contextor::SourceRef;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppResult,
    middleware_layer::request_id::request_id_of,
    routes::chat::chat_request::ChatRequest,
};

#[derive(Debug, Serialize)]
pub struct SourcesData {
    pub sources: Vec<SourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// `POST /sources`: the above-threshold documents for the latest user
/// message. Same body as `/chat`; no web fallback, no completion.
pub async fn sources(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Response> {
    let request_id = request_id_of(&headers);
    let Json(req) = body?;
    let conversation_id = req.conversation_id().map(str::to_string);
    let conversation = req.into_conversation();

    let sources = state
        .contextor
        .sources(&conversation)
        .await
        .inspect_err(|e| warn!(request_id = %request_id, error = %e, "sources request failed"))?;
    info!(request_id = %request_id, sources = sources.len(), "sources resolved");

    Ok(ApiResponse::success(SourcesData {
        sources,
        conversation_id,
    })
    .with_request_id(request_id)
    .into_response_with_status(StatusCode::OK))
}
