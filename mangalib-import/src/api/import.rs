//! Import API handlers
//!
//! POST /import/scan, POST /import/execute, POST /import/auto,
//! POST /import/cleanup

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::{
    api::extract::ApiJson,
    db::libraries,
    error::{ApiError, ApiResult, ImportError},
    models::{ImportRecord, ImportSession, OperationType},
    services::{
        auto_assign_records, cleanup_empty_directories,
        import_executor::{ensure_non_empty, ImportExecutor},
        ImportFailure, ImportOutcome, ImportScanner,
    },
    AppState,
};

/// POST /import/scan request
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// Import root; falls back to the configured default
    #[serde(default)]
    pub path: Option<String>,
}

/// POST /import/scan response
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub import_path: String,
    pub count: usize,
    pub files: Vec<ImportRecord>,
}

/// POST /import/execute request
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub files: Vec<ImportRecord>,
    pub import_path: String,
    #[serde(default)]
    pub cleanup: Option<bool>,
}

/// Response of both execute endpoints
#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub success: bool,
    pub operation_id: Uuid,
    pub imported_count: u32,
    pub replaced_count: u32,
    pub skipped_count: u32,
    pub failed_count: u32,
    pub cleaned_directories: usize,
    pub failures: Vec<ImportFailure>,
}

impl From<ImportOutcome> for ExecuteResponse {
    fn from(outcome: ImportOutcome) -> Self {
        Self {
            success: true,
            operation_id: outcome.operation_id,
            imported_count: outcome.counts.imported,
            replaced_count: outcome.counts.replaced,
            skipped_count: outcome.counts.skipped,
            failed_count: outcome.counts.failed,
            cleaned_directories: outcome.cleaned_directories,
            failures: outcome.failures,
        }
    }
}

/// POST /import/auto request
#[derive(Debug, Default, Deserialize)]
pub struct AutoImportRequest {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub cleanup: Option<bool>,
}

/// POST /import/auto response
///
/// `result` is absent when no file matched and nothing was journaled.
#[derive(Debug, Serialize)]
pub struct AutoImportResponse {
    pub success: bool,
    pub scanned: usize,
    pub matched: usize,
    pub result: Option<ExecuteResponse>,
}

/// POST /import/cleanup request
#[derive(Debug, Deserialize)]
pub struct CleanupRequest {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub cleaned_directories: usize,
}

/// Request path, else the configured default import root
pub(crate) async fn import_root(state: &AppState, requested: Option<&str>) -> ApiResult<PathBuf> {
    match requested.map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) => Ok(PathBuf::from(path)),
        None => state
            .import_config
            .read()
            .await
            .default_path
            .clone()
            .ok_or_else(|| ApiError::BadRequest("path is required".to_string())),
    }
}

/// Walk the import root on the blocking pool
async fn scan_root(root: PathBuf) -> ApiResult<Vec<ImportRecord>> {
    let records = tokio::task::spawn_blocking(move || ImportScanner::new().scan(&root))
        .await
        .map_err(|e| ApiError::Internal(format!("Scan task failed: {}", e)))?
        .map_err(ImportError::from)?;
    Ok(records)
}

/// Cleanup flag of the request, else the configured default
pub(crate) async fn cleanup_flag(state: &AppState, requested: Option<bool>) -> bool {
    match requested {
        Some(cleanup) => cleanup,
        None => state.import_config.read().await.cleanup_after_import,
    }
}

/// POST /import/scan
///
/// Scans the import root and stores the records in a new session.
pub async fn scan_import(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ScanRequest>,
) -> ApiResult<Json<ScanResponse>> {
    let root = import_root(&state, request.path.as_deref()).await?;
    let records = scan_root(root.clone()).await?;

    let session = ImportSession::new(root.clone(), records);
    let session_id = session.session_id;
    let files = session.records().to_vec();

    state.sessions.write().await.insert(session_id, session);

    tracing::info!(
        session_id = %session_id,
        path = %root.display(),
        files = files.len(),
        "Import session created"
    );

    Ok(Json(ScanResponse {
        success: true,
        session_id,
        import_path: root.to_string_lossy().into_owned(),
        count: files.len(),
        files,
    }))
}

/// POST /import/execute
///
/// Imports the posted records. Records keep the destinations the client
/// assigned; unassigned ones are journaled as failed.
pub async fn execute_import(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ExecuteRequest>,
) -> ApiResult<Json<ExecuteResponse>> {
    ensure_non_empty(&request.files)?;
    let root = import_root(&state, Some(&request.import_path)).await?;
    let cleanup = cleanup_flag(&state, request.cleanup).await;

    let outcome = ImportExecutor::new(state.db.clone())
        .execute(&request.files, &root, OperationType::ManualImport, cleanup)
        .await?;

    Ok(Json(outcome.into()))
}

/// POST /import/auto
///
/// Scans the import root and imports, in one operation, every file whose
/// title names an existing series exactly. Other files stay where they are.
pub async fn auto_import(
    State(state): State<AppState>,
    body: Option<ApiJson<AutoImportRequest>>,
) -> ApiResult<Json<AutoImportResponse>> {
    let request = body.map(|ApiJson(r)| r).unwrap_or_default();

    if !state.import_config.read().await.auto_assign_enabled {
        return Err(ApiError::Conflict("auto-assign is disabled".to_string()));
    }

    let root = import_root(&state, request.path.as_deref()).await?;
    let cleanup = cleanup_flag(&state, request.cleanup).await;

    let records = scan_root(root.clone()).await?;
    let scanned = records.len();
    let library_index = libraries::load_library_index(&state.db).await?;
    let assigned = auto_assign_records(records, &library_index);
    let matched = assigned.len();

    tracing::info!(
        path = %root.display(),
        scanned,
        matched,
        "Auto-import selection"
    );

    let result = if assigned.is_empty() {
        None
    } else {
        let outcome = ImportExecutor::new(state.db.clone())
            .execute(&assigned, &root, OperationType::AutoImport, cleanup)
            .await?;
        Some(ExecuteResponse::from(outcome))
    };

    Ok(Json(AutoImportResponse {
        success: true,
        scanned,
        matched,
        result,
    }))
}

/// POST /import/cleanup
pub async fn cleanup_import(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CleanupRequest>,
) -> ApiResult<Json<CleanupResponse>> {
    let root = import_root(&state, request.path.as_deref()).await?;

    let cleaned_directories = tokio::task::spawn_blocking(move || cleanup_empty_directories(&root))
        .await
        .map_err(|e| ApiError::Internal(format!("Cleanup task failed: {}", e)))?
        .map_err(ImportError::from)?;

    Ok(Json(CleanupResponse {
        success: true,
        cleaned_directories,
    }))
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import/scan", post(scan_import))
        .route("/import/execute", post(execute_import))
        .route("/import/auto", post(auto_import))
        .route("/import/cleanup", post(cleanup_import))
}
