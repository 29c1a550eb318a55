//! Import session API handlers
//!
//! Server-side assignment state for a scanned import root. Records are
//! addressed by their index in the scan result.

use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{
        extract::{ApiJson, ApiPath},
        import::{cleanup_flag, ExecuteResponse},
    },
    db::libraries,
    error::{ApiError, ApiResult, ImportError},
    models::{Destination, ImportRecord, ImportSession, OperationType, SessionStats},
    services::{
        assign_file, assign_group, auto_match_all, import_executor::ensure_non_empty,
        remove_destination, remove_group_destination, ImportExecutor, SeriesChoice, TitleGroup,
    },
    AppState,
};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub import_path: String,
    pub files: Vec<ImportRecord>,
    pub groups: Vec<TitleGroup>,
    pub stats: SessionStats,
}

impl From<&ImportSession> for SessionResponse {
    fn from(session: &ImportSession) -> Self {
        Self {
            success: true,
            session_id: session.session_id,
            import_path: session.import_path.to_string_lossy().into_owned(),
            files: session.records().to_vec(),
            groups: session.groups(),
            stats: session.stats(),
        }
    }
}

/// Body of the file assign endpoint
#[derive(Debug, Deserialize)]
pub struct AssignFileRequest {
    pub library_id: i64,
    #[serde(default)]
    pub series_id: Option<i64>,
    #[serde(default)]
    pub series_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignFileResponse {
    pub success: bool,
    pub destination: Destination,
}

#[derive(Debug, Deserialize)]
pub struct AssignGroupRequest {
    pub title: String,
    pub library_id: i64,
    #[serde(default)]
    pub series_id: Option<i64>,
    #[serde(default)]
    pub series_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnassignGroupRequest {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct AssignedResponse {
    pub success: bool,
    pub assigned: usize,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub success: bool,
    pub removed: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionExecuteRequest {
    #[serde(default)]
    pub cleanup: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
}

/// GET /import/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&session_id)
        .ok_or(ImportError::SessionNotFound(session_id))?;
    Ok(Json(SessionResponse::from(session)))
}

/// POST /import/sessions/:id/files/:index/assign
pub async fn assign_session_file(
    State(state): State<AppState>,
    ApiPath((session_id, index)): ApiPath<(Uuid, usize)>,
    ApiJson(request): ApiJson<AssignFileRequest>,
) -> ApiResult<Json<AssignFileResponse>> {
    let choice = SeriesChoice::from_request(request.series_id, request.series_name.as_deref())?;
    let library_index = libraries::load_library_index(&state.db).await?;

    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or(ImportError::SessionNotFound(session_id))?;
    let destination = assign_file(session, &library_index, index, request.library_id, &choice)?;

    Ok(Json(AssignFileResponse {
        success: true,
        destination,
    }))
}

/// DELETE /import/sessions/:id/files/:index/destination
pub async fn remove_session_file_destination(
    State(state): State<AppState>,
    ApiPath((session_id, index)): ApiPath<(Uuid, usize)>,
) -> ApiResult<Json<RemovedResponse>> {
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or(ImportError::SessionNotFound(session_id))?;
    let removed = remove_destination(session, index)?;

    Ok(Json(RemovedResponse {
        success: true,
        removed: usize::from(removed),
    }))
}

/// POST /import/sessions/:id/groups/assign
pub async fn assign_session_group(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AssignGroupRequest>,
) -> ApiResult<Json<AssignedResponse>> {
    let choice = SeriesChoice::from_request(request.series_id, request.series_name.as_deref())?;
    let library_index = libraries::load_library_index(&state.db).await?;

    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or(ImportError::SessionNotFound(session_id))?;
    let assigned = assign_group(
        session,
        &library_index,
        &request.title,
        request.library_id,
        &choice,
    )?;

    Ok(Json(AssignedResponse {
        success: true,
        assigned,
    }))
}

/// POST /import/sessions/:id/groups/unassign
pub async fn unassign_session_group(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UnassignGroupRequest>,
) -> ApiResult<Json<RemovedResponse>> {
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or(ImportError::SessionNotFound(session_id))?;
    let removed = remove_group_destination(session, &request.title)?;

    Ok(Json(RemovedResponse {
        success: true,
        removed,
    }))
}

/// POST /import/sessions/:id/auto-match
pub async fn auto_match_session(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<Uuid>,
) -> ApiResult<Json<AssignedResponse>> {
    let library_index = libraries::load_library_index(&state.db).await?;

    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or(ImportError::SessionNotFound(session_id))?;
    let assigned = auto_match_all(session, &library_index)?;

    Ok(Json(AssignedResponse {
        success: true,
        assigned,
    }))
}

/// POST /import/sessions/:id/execute
///
/// Imports every record of the session. The session is dropped once the
/// import has run; if it could not start, the session is kept.
pub async fn execute_session(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<Uuid>,
    body: Option<ApiJson<SessionExecuteRequest>>,
) -> ApiResult<Json<ExecuteResponse>> {
    let request = body.map(|ApiJson(r)| r).unwrap_or_default();

    let (records, import_root) = {
        let sessions = state.sessions.read().await;
        let session = sessions
            .get(&session_id)
            .ok_or(ImportError::SessionNotFound(session_id))?;
        (session.records().to_vec(), session.import_path.clone())
    };
    ensure_non_empty(&records)?;

    let cleanup = cleanup_flag(&state, request.cleanup).await;

    let outcome = ImportExecutor::new(state.db.clone())
        .execute(&records, &import_root, OperationType::SessionImport, cleanup)
        .await?;

    state.sessions.write().await.remove(&session_id);
    tracing::info!(
        session_id = %session_id,
        operation_id = %outcome.operation_id,
        "Session executed and closed"
    );

    Ok(Json(outcome.into()))
}

/// DELETE /import/sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<Uuid>,
) -> ApiResult<Json<DeletedResponse>> {
    state
        .sessions
        .write()
        .await
        .remove(&session_id)
        .ok_or(ApiError::from(ImportError::SessionNotFound(session_id)))?;

    Ok(Json(DeletedResponse { success: true }))
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/import/sessions/:id", get(get_session).delete(delete_session))
        .route(
            "/import/sessions/:id/files/:index/assign",
            post(assign_session_file),
        )
        .route(
            "/import/sessions/:id/files/:index/destination",
            delete(remove_session_file_destination),
        )
        .route("/import/sessions/:id/groups/assign", post(assign_session_group))
        .route(
            "/import/sessions/:id/groups/unassign",
            post(unassign_session_group),
        )
        .route("/import/sessions/:id/auto-match", post(auto_match_session))
        .route("/import/sessions/:id/execute", post(execute_session))
}
