//! Import history API handlers
//!
//! GET /import/history, GET /import/history/:operation_id,
//! POST /import/history/:operation_id/undo

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::extract::{ApiPath, ApiQuery},
    db::history,
    error::{ApiError, ApiResult, ImportError},
    models::{ImportOperation, OperationDetails},
    services::{import_undo::UndoFileError, undo_operation},
    AppState,
};

/// Default number of operations returned by the history list
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Upper bound on the requested limit
const MAX_HISTORY_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<ImportOperation>,
}

#[derive(Debug, Serialize)]
pub struct DetailsResponse {
    pub success: bool,
    pub details: OperationDetails,
}

#[derive(Debug, Serialize)]
pub struct UndoResponse {
    pub success: bool,
    pub message: String,
    pub undone_count: usize,
    pub errors: Vec<UndoFileError>,
}

fn parse_operation_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("Invalid operation id: {}", raw)))
}

/// GET /import/history?limit=N
pub async fn list_history(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let history = history::list_operations(&state.db, limit).await?;

    Ok(Json(HistoryResponse {
        success: true,
        history,
    }))
}

/// GET /import/history/:operation_id
pub async fn get_history_details(
    State(state): State<AppState>,
    ApiPath(operation_id): ApiPath<String>,
) -> ApiResult<Json<DetailsResponse>> {
    let operation_id = parse_operation_id(&operation_id)?;

    let operation = history::get_operation(&state.db, operation_id)
        .await?
        .ok_or(ImportError::OperationNotFound(operation_id))?;
    let files = history::get_operation_files(&state.db, operation_id).await?;

    Ok(Json(DetailsResponse {
        success: true,
        details: OperationDetails { operation, files },
    }))
}

/// POST /import/history/:operation_id/undo
pub async fn undo_import(
    State(state): State<AppState>,
    ApiPath(operation_id): ApiPath<String>,
) -> ApiResult<Json<UndoResponse>> {
    let operation_id = parse_operation_id(&operation_id)?;
    let report = undo_operation(&state.db, operation_id).await?;

    let message = if report.errors.is_empty() {
        format!(
            "{} file(s) moved to {}",
            report.undone_count,
            report.undo_dir.display()
        )
    } else {
        format!(
            "{} file(s) moved to {}, {} could not be moved",
            report.undone_count,
            report.undo_dir.display(),
            report.errors.len()
        )
    };

    Ok(Json(UndoResponse {
        success: true,
        message,
        undone_count: report.undone_count,
        errors: report.errors,
    }))
}

pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/import/history", get(list_history))
        .route("/import/history/:operation_id", get(get_history_details))
        .route("/import/history/:operation_id/undo", post(undo_import))
}
