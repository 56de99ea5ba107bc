//! Error types for API responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// Remote hub failure on an endpoint that does not soft-fail (search)
    #[error("{0}")]
    Hub(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ManagerResult<T> = Result<T, ManagerError>;

impl IntoResponse for ManagerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ManagerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ManagerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ManagerError::Hub(msg) => {
                tracing::warn!(error = %msg, "Hub request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            ManagerError::Io(err) => {
                tracing::error!(error = %err, "Filesystem error");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ManagerError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            detail: message,
            timestamp: chrono::Utc::now(),
        });

        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}
