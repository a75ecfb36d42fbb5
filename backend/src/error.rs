//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// Every failure that reaches the front end is one of these variants. Errors are
/// propagated unmodified from the Session Store and Conversation Graph up to the
/// HTTP layer, where `IntoResponse` turns them into JSON bodies.
#[derive(Error, Debug)]
pub enum AppError {
    /// Conversation with the given ID does not exist
    #[error("Conversation not found: {0}, start a new one")]
    ConversationNotFound(String),

    /// The external responder failed or timed out; the user may retry
    #[error("Responder unavailable: {0}. Please try again")]
    Upstream(String),

    /// Durable read or write failed; stored state is unchanged
    #[error("Storage error: {0}")]
    Storage(String),

    /// The request was malformed (empty message, bad title, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the user can reasonably retry the same action
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Upstream(_))
    }

    /// HTTP status code used when this error is returned to a client
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ConversationNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retryable = self.is_retryable();

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
            "retryable": retryable,
        }));

        (status, body).into_response()
    }
}
