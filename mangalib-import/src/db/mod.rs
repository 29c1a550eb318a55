//! Database access for mangalib-import

pub mod history;
pub mod libraries;

use mangalib_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (or create) the shared database under the root folder
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::debug!(path = %db_path.display(), "Connecting to database");
    mangalib_common::db::init_database(db_path).await
}
