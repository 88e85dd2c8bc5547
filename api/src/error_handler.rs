use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::ContextorError;
use serde::Serialize;
use thiserror::Error;

/// Shown to end users whenever an upstream provider fails.
pub const APOLOGY: &str = "I apologize, I'm experiencing technical difficulties. Please try again or contact Aven support directly.";

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / server ---
    #[error("failed to bind listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("refresh secret is missing or wrong")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// Errors from the answering pipeline.
    #[error(transparent)]
    Pipeline(#[from] ContextorError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Pipeline(e) => match e {
                ContextorError::EmptyInput | ContextorError::InvalidConversation(_) => {
                    StatusCode::BAD_REQUEST
                }
                ContextorError::SearchUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Bind { .. } | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Bind { .. } => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest { code, .. } => code,
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound => "NOT_FOUND",
            AppError::Pipeline(e) => match e {
                ContextorError::EmptyInput => "EMPTY_MESSAGE",
                ContextorError::InvalidConversation(_) => "INVALID_CONVERSATION",
                ContextorError::Config { .. } => "CONFIG_ERROR",
                ContextorError::Rag(_) => "RETRIEVAL_FAILED",
                ContextorError::Completion(_) => "COMPLETION_FAILED",
                ContextorError::SearchUnavailable => "SEARCH_UNAVAILABLE",
            },
        }
    }
}

/// JSON error body: `{error, code, details, timestamp, message?}`.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub error: &'static str,
    pub code: &'static str,
    pub details: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl ErrorBody {
    pub(crate) fn new(status: StatusCode, code: &'static str, details: impl Into<String>) -> Self {
        Self {
            error: status.canonical_reason().unwrap_or("Error"),
            code,
            details: details.into(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            message: status.is_server_error().then_some(APOLOGY),
        }
    }

    pub(crate) fn into_response(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        ErrorBody::new(status, self.error_code(), self.to_string()).into_response(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest {
            code: "INVALID_JSON",
            message: err.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_status_and_code() {
        let e = AppError::from(ContextorError::EmptyInput);
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(e.error_code(), "EMPTY_MESSAGE");

        let e = AppError::from(ContextorError::Rag(rag_store::RagError::MissingEmbedding(
            "x".into(),
        )));
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.error_code(), "RETRIEVAL_FAILED");
    }

    #[test]
    fn server_errors_carry_apology() {
        let b = ErrorBody::new(StatusCode::INTERNAL_SERVER_ERROR, "X", "boom");
        assert_eq!(b.error, "Internal Server Error");
        assert_eq!(b.message, Some(APOLOGY));
        let b = ErrorBody::new(StatusCode::BAD_REQUEST, "X", "bad");
        assert_eq!(b.message, None);
    }
}
