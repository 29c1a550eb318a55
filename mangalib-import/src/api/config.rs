//! Import settings
//!
//! GET /import/config, POST /import/config
//!
//! Updates are written to the `[import]` section of the TOML file the
//! service was started with, then applied in memory. Other sections of the
//! file are preserved.

use axum::{extract::State, routing::get, Json, Router};
use mangalib_common::config::{load_toml_config, write_toml_config, ImportConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{
    api::extract::ApiJson,
    error::{ApiError, ApiResult},
    AppState,
};

/// Fields to change; absent fields keep their value
#[derive(Debug, Default, Deserialize)]
pub struct ImportConfigUpdate {
    /// Empty string clears the default import root
    #[serde(default)]
    pub default_path: Option<String>,
    #[serde(default)]
    pub cleanup_after_import: Option<bool>,
    #[serde(default)]
    pub auto_assign_enabled: Option<bool>,
}

impl ImportConfigUpdate {
    fn apply(self, config: &mut ImportConfig) {
        if let Some(path) = self.default_path {
            let path = path.trim();
            config.default_path = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(cleanup) = self.cleanup_after_import {
            config.cleanup_after_import = cleanup;
        }
        if let Some(enabled) = self.auto_assign_enabled {
            config.auto_assign_enabled = enabled;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImportConfigResponse {
    pub success: bool,
    pub config: ImportConfig,
}

/// GET /import/config
pub async fn get_import_config(State(state): State<AppState>) -> Json<ImportConfigResponse> {
    let config = state.import_config.read().await.clone();
    Json(ImportConfigResponse {
        success: true,
        config,
    })
}

/// POST /import/config
pub async fn update_import_config(
    State(state): State<AppState>,
    ApiJson(update): ApiJson<ImportConfigUpdate>,
) -> ApiResult<Json<ImportConfigResponse>> {
    let mut current = state.import_config.write().await;
    let mut updated = current.clone();
    update.apply(&mut updated);

    if let Some(path) = state.config_file.clone() {
        let import = updated.clone();
        tokio::task::spawn_blocking(move || {
            let mut file_config = load_toml_config(&path)?;
            file_config.import = import;
            write_toml_config(&file_config, &path)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("Config write task failed: {}", e)))??;
    }

    *current = updated.clone();
    tracing::info!(
        default_path = ?updated.default_path,
        cleanup_after_import = updated.cleanup_after_import,
        auto_assign_enabled = updated.auto_assign_enabled,
        "Import config updated"
    );

    Ok(Json(ImportConfigResponse {
        success: true,
        config: updated,
    }))
}

pub fn config_routes() -> Router<AppState> {
    Router::new().route(
        "/import/config",
        get(get_import_config).post(update_import_config),
    )
}
