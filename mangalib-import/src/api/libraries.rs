//! Read-only library endpoints
//!
//! GET /libraries, GET /library/:id/series

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use mangalib_common::db::{Library, Series};
use serde::Serialize;

use crate::{
    api::extract::ApiPath,
    db::libraries,
    error::{ApiResult, ImportError},
    AppState,
};

#[derive(Debug, Serialize)]
pub struct LibrariesResponse {
    pub success: bool,
    pub libraries: Vec<Library>,
}

#[derive(Debug, Serialize)]
pub struct SeriesListResponse {
    pub success: bool,
    pub library: Library,
    pub series: Vec<Series>,
}

/// GET /libraries
pub async fn list_libraries(State(state): State<AppState>) -> ApiResult<Json<LibrariesResponse>> {
    let libraries = libraries::list_libraries(&state.db).await?;
    Ok(Json(LibrariesResponse {
        success: true,
        libraries,
    }))
}

/// GET /library/:id/series
pub async fn list_library_series(
    State(state): State<AppState>,
    ApiPath(library_id): ApiPath<i64>,
) -> ApiResult<Json<SeriesListResponse>> {
    let library = libraries::get_library(&state.db, library_id)
        .await?
        .ok_or(ImportError::LibraryNotFound(library_id))?;
    let series = libraries::list_series(&state.db, library_id).await?;

    Ok(Json(SeriesListResponse {
        success: true,
        library,
        series,
    }))
}

pub fn library_routes() -> Router<AppState> {
    Router::new()
        .route("/libraries", get(list_libraries))
        .route("/library/:id/series", get(list_library_series))
}
