//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.
//!
//! Note that action failures are *not* represented here: the gateway never
//! raises past its boundary, it reports structured failure results back to
//! the model. `AppError` covers the faults that do end a request, such as a
//! model endpoint outage or a broken conversation store.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// All errors that can end an HTTP request are represented by this enum.
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// The client sent a request the service cannot act on
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The model completion endpoint failed for the whole turn
    #[error("Model completion failed: {0}")]
    Model(#[from] crate::orchestrator::ModelError),

    /// Error occurred while reading or writing the conversation store
    #[error("Conversation store error: {0}")]
    Store(#[from] crate::chat::StoreError),

    /// The authorization provider rejected a token exchange
    #[error("Authorization error: {0}")]
    Auth(#[from] crate::auth::AuthError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Model(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Auth(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
