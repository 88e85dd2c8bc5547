use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

pub const X_REQUEST_ID: &str = "x-request-id";

const MAX_ID_LEN: usize = 128;

/// Keeps the caller's `X-Request-Id` or assigns a UUIDv4, makes it visible
/// to handlers through the request headers and echoes it on the response.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let incoming = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_ID_LEN)
        .and_then(|s| HeaderValue::from_str(s).ok());

    let id = match incoming {
        Some(v) => v,
        None => match HeaderValue::from_str(&uuid::Uuid::new_v4().to_string()) {
            Ok(v) => v,
            Err(_) => return next.run(req).await,
        },
    };

    req.headers_mut().insert(X_REQUEST_ID, id.clone());
    let mut res = next.run(req).await;
    res.headers_mut().insert(X_REQUEST_ID, id);
    res
}

/// Request id set by [`request_id`], or `-`.
pub fn request_id_of(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
}
