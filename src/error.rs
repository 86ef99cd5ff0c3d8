//! Error taxonomy and its mapping onto the HTTP envelope.
//!
//! Handlers return `Result<_, AppError>`; `IntoResponse` logs the full error
//! and sends the client only a short per-category message.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::openai::ProviderError;
use crate::protocol::Envelope;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed {operation} response from model provider: {detail}")]
    UpstreamFormat {
        operation: &'static str,
        detail: String,
    },

    #[error("Model provider error: {0}")]
    Upstream(#[from] ProviderError),

    #[error("Corrupt data: {0}")]
    DataCorruption(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamFormat { .. }
            | AppError::Upstream(_)
            | AppError::DataCorruption(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients. Server-side details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::UpstreamFormat { operation, .. } => {
                format!("Invalid {operation} response from AI provider")
            }
            AppError::Upstream(_) => "AI provider request failed".to_string(),
            AppError::DataCorruption(_) | AppError::Database(_) | AppError::Internal(_) => {
                "Server error".to_string()
            }
        }
    }

    fn log(&self) {
        match self {
            AppError::Validation(msg) => debug!(message = %msg, "Validation error"),
            AppError::Conflict(msg) => warn!(message = %msg, "Conflict"),
            AppError::Unauthorized(msg) => warn!(message = %msg, "Authentication error"),
            AppError::NotFound(msg) => debug!(message = %msg, "Not found"),
            AppError::UpstreamFormat { operation, detail } => {
                error!(%operation, %detail, "Model provider returned malformed output")
            }
            AppError::Upstream(err) => error!(error = %err, "Model provider call failed"),
            AppError::DataCorruption(msg) => error!(message = %msg, "Stored data failed to decode"),
            AppError::Database(err) => error!(db_error = %err, "Database error"),
            AppError::Internal(msg) => error!(message = %msg, "Internal server error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        (status, Json(Envelope::<()>::error(self.user_message()))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                // SQLite reports "UNIQUE constraint failed: <table>.<column>"
                let msg = if db_err.message().contains("users.") {
                    "User already exists"
                } else {
                    "Resource already exists"
                };
                return AppError::Conflict(msg.to_string());
            }
        }
        AppError::Database(err)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("Cryptography error: {err}"))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}
