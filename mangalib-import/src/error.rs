//! Error types for mangalib-import

use crate::models::OperationStatus;
use crate::services::file_ops::FileMoveError;
use crate::services::import_scanner::ScanError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Import engine errors
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Series not found: {0}")]
    SeriesNotFound(i64),

    #[error("Library not found: {0}")]
    LibraryNotFound(i64),

    /// Not raised by the engine: reassignment overwrites
    #[error("Assignment conflict: {0}")]
    AssignmentConflict(String),

    #[error(transparent)]
    FileMove(#[from] FileMoveError),

    #[error("Import operation not found: {0}")]
    OperationNotFound(Uuid),

    #[error("Operation {operation_id} cannot be undone (status: {status})")]
    NotUndoable {
        operation_id: Uuid,
        status: OperationStatus,
    },

    #[error("Import session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("No file at index {0}")]
    RecordNotFound(usize),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Common error: {0}")]
    Common(#[from] mangalib_common::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type ImportResult<T> = Result<T, ImportError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Common error: {0}")]
    Common(#[from] mangalib_common::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
            ApiError::Import(err) => match err {
                ImportError::Scan(_) => (StatusCode::BAD_REQUEST, "SCAN_ERROR"),
                ImportError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                ImportError::SeriesNotFound(_) => (StatusCode::NOT_FOUND, "SERIES_NOT_FOUND"),
                ImportError::LibraryNotFound(_) => (StatusCode::NOT_FOUND, "LIBRARY_NOT_FOUND"),
                ImportError::OperationNotFound(_) => {
                    (StatusCode::NOT_FOUND, "OPERATION_NOT_FOUND")
                }
                ImportError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
                ImportError::RecordNotFound(_) => (StatusCode::NOT_FOUND, "RECORD_NOT_FOUND"),
                ImportError::NotUndoable { .. } => (StatusCode::CONFLICT, "NOT_UNDOABLE"),
                ImportError::AssignmentConflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
                ImportError::FileMove(_) => (StatusCode::INTERNAL_SERVER_ERROR, "FILE_MOVE_ERROR"),
                ImportError::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
                ImportError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let message = match &self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": message,
            "code": error_code,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
