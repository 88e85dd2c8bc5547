use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use tracing::{info, warn};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::{AppError, AppResult},
    middleware_layer::request_id::request_id_of,
};

pub const X_REFRESH_SECRET: &str = "x-refresh-secret";

/// `POST /index/refresh`: repopulates the vector index from web search.
/// Hidden (404) unless a refresh secret is configured.
pub async fn refresh_index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let request_id = request_id_of(&headers);
    let Some(expected) = state.refresh_secret.as_deref() else {
        return Err(AppError::NotFound);
    };
    let given = headers
        .get(X_REFRESH_SECRET)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if given != expected {
        warn!(request_id = %request_id, "index refresh with missing or wrong secret");
        return Err(AppError::Forbidden);
    }

    info!(request_id = %request_id, "index refresh started");
    let report = state
        .contextor
        .refresh_index()
        .await
        .inspect_err(|e| warn!(request_id = %request_id, error = %e, "index refresh failed"))?;
    info!(
        request_id = %request_id,
        queries = report.queries,
        kept = report.kept,
        upserted = report.upserted,
        "index refresh finished"
    );

    Ok(ApiResponse::success(report)
        .with_request_id(request_id)
        .into_response_with_status(StatusCode::OK))
}
