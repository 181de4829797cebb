//! Unified Error Handling
//!
//! Application-wide error type and the JSON response envelope every
//! handler returns.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Unified API response structure
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Payment Errors ==========
    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Provider call failed: {0}")]
    Upstream(String),

    // ========== Business Logic Errors ==========
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    // ========== System Errors ==========
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Untrusted payment confirmation (400) — caller must not retry blindly
            AppError::Verification(msg) => (StatusCode::BAD_REQUEST, "E4001", msg.as_str()),

            // Provider-side failure on the synchronous capture path (502)
            AppError::Upstream(msg) => {
                error!(target: "payments", error = %msg, "Upstream provider error");
                (StatusCode::BAD_GATEWAY, "E4002", msg.as_str())
            }

            // Not found (404)
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.as_str()),

            // Validation (400)
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.as_str()),

            // Business rule (422)
            AppError::BusinessRule(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "E0005", msg.as_str())
            }

            // Database errors (500) — the provider retries on 5xx
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "E9002", "Database error")
            }

            // Internal errors (500)
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "E9001", "Internal server error")
            }
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message: message.to_string(),
            data: None,
        });

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type AppResult<T> = Result<T, AppError>;

// ========== Conversions from layer error types ==========

impl From<crate::db::repository::RepoError> for AppError {
    fn from(e: crate::db::repository::RepoError) -> Self {
        use crate::db::repository::RepoError;
        match e {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Conflict(msg) => AppError::BusinessRule(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl From<crate::payments::verify::VerifyError> for AppError {
    fn from(e: crate::payments::verify::VerifyError) -> Self {
        AppError::Verification(e.to_string())
    }
}

impl From<crate::payments::finalize::FinalizeError> for AppError {
    fn from(e: crate::payments::finalize::FinalizeError) -> Self {
        use crate::payments::finalize::FinalizeError;
        match e {
            FinalizeError::NotFound(msg) => AppError::NotFound(msg),
            FinalizeError::Storage(msg) => AppError::Database(msg),
        }
    }
}

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}
