use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};

use crate::error_handler::ErrorBody;

/// Bodies larger than this are not rewritten.
const MAX_REWRITE_BYTES: usize = 64 * 1024;

async fn take_body(res: Response) -> (axum::http::response::Parts, Bytes) {
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_REWRITE_BYTES)
        .await
        .unwrap_or_default();
    (parts, bytes)
}

fn is_json(parts: &axum::http::response::Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

fn code_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
        StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
        StatusCode::UNPROCESSABLE_ENTITY => "UNPROCESSABLE_ENTITY",
        _ => "BAD_REQUEST",
    }
}

/// Rewrites plain-text 4xx responses produced by axum itself (unknown
/// route, wrong method, extractor rejections) into the JSON error body.
/// JSON responses and non-4xx responses pass through untouched.
pub async fn json_error_mapper(req: Request<Body>, next: Next) -> Response {
    let res = next.run(req).await;
    let status = res.status();
    if !status.is_client_error() {
        return res;
    }

    let (mut parts, bytes) = take_body(res).await;
    if is_json(&parts) {
        return Response::from_parts(parts, Body::from(bytes));
    }

    let original = String::from_utf8_lossy(&bytes);
    let details = match original.trim() {
        "" => status.canonical_reason().unwrap_or("request rejected").to_string(),
        text => text.to_string(),
    };

    let body = ErrorBody::new(status, code_for(status), details);
    let bytes = match serde_json::to_vec(&body) {
        Ok(v) => v,
        Err(_) => bytes.to_vec(),
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Body::from(bytes))
}
