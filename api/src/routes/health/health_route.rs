use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use tracing::info;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    middleware_layer::request_id::request_id_of,
};

/// `GET /health`: always 200; degraded dependencies are reported inside.
pub async fn health(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let request_id = request_id_of(&headers);
    let report = state.health.report().await;
    info!(request_id = %request_id, ok = report.ok, "health probed");
    ApiResponse::success(report)
        .with_request_id(request_id)
        .into_response_with_status(StatusCode::OK)
}
