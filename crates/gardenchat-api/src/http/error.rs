//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use gardenchat_types::error::{AttachmentError, ChatError};
use gardenchat_types::llm::LlmError;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors from a chat session (settings, attachments, model calls).
    Chat(ChatError),
    /// Malformed request (bad id, unreadable body).
    Validation(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl AppError {
    /// Status code, machine-readable code and message for this error.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        let message = match self {
            AppError::Chat(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
        };

        let (status, code) = match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Chat(ChatError::SessionNotFound) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            AppError::Chat(ChatError::EmptyMessage) => (StatusCode::BAD_REQUEST, "EMPTY_MESSAGE"),
            AppError::Chat(ChatError::Settings(_)) => (StatusCode::BAD_REQUEST, "INVALID_SETTINGS"),
            AppError::Chat(ChatError::Attachment(e)) => match e {
                AttachmentError::Empty(_) => (StatusCode::BAD_REQUEST, "EMPTY_ATTACHMENT"),
                AttachmentError::UnsupportedMediaType { .. } => {
                    (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE")
                }
                AttachmentError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "ATTACHMENT_TOO_LARGE"),
                AttachmentError::Upload { .. } => (StatusCode::BAD_GATEWAY, "UPLOAD_FAILED"),
            },
            AppError::Chat(ChatError::Llm(e)) => match e {
                LlmError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
                LlmError::Overloaded(_) => (StatusCode::SERVICE_UNAVAILABLE, "MODEL_OVERLOADED"),
                LlmError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_MODEL_REQUEST"),
                LlmError::AuthenticationFailed => (StatusCode::BAD_GATEWAY, "UPSTREAM_AUTH_FAILED"),
                _ => (StatusCode::BAD_GATEWAY, "LLM_ERROR"),
            },
        };

        (status, code, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::warn!(status = %status, code, error = %message, "Request failed");
        } else {
            tracing::debug!(status = %status, code, error = %message, "Request rejected");
        }

        let details = match &self {
            AppError::Chat(ChatError::Llm(LlmError::RateLimited {
                retry_after_ms: Some(ms),
            })) => Some(serde_json::json!({ "retry_after_ms": ms })),
            _ => None,
        };

        ApiResponse::error(code, &message, details).into_response_with(status)
    }
}
