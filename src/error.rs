//! Error types and Axum response conversions.

use crate::storage::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Outcomes of the session lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Same variant for unknown name and wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing session token")]
    MissingBearer,

    #[error("Invalid or expired session")]
    Unauthorized,

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not acceptable: {0}")]
    NotAcceptable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Session(SessionError::Persistence(err)) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %err, "Session persistence failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Session(err) => (StatusCode::UNAUTHORIZED, err.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotAcceptable(msg) => (StatusCode::NOT_ACCEPTABLE, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Session(SessionError::Persistence(err))
    }
}
