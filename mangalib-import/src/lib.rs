//! mangalib-import library interface
//!
//! Scans an import directory for manga volumes, matches them to library
//! series, moves them into place and keeps an undoable journal.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult, ImportError, ImportResult};

use axum::Router;
use chrono::{DateTime, Utc};
use mangalib_common::config::ImportConfig;
use models::SessionStore;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Scanned import sessions, in memory only
    pub sessions: SessionStore,
    /// Import defaults from the TOML config, editable at runtime
    pub import_config: Arc<RwLock<ImportConfig>>,
    /// TOML file that import config changes are written back to
    pub config_file: Option<PathBuf>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, import_config: ImportConfig) -> Self {
        Self {
            db,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            import_config: Arc::new(RwLock::new(import_config)),
            config_file: None,
            startup_time: Utc::now(),
        }
    }

    /// Persist import config changes to `path`
    pub fn with_config_file(mut self, path: PathBuf) -> Self {
        self.config_file = Some(path);
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::import_routes())
        .merge(api::config_routes())
        .merge(api::session_routes())
        .merge(api::history_routes())
        .merge(api::library_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
