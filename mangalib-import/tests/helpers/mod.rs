//! Shared fixtures for integration tests
//!
//! Every test gets its own temp directory holding the database, the import
//! root and the library roots.

#![allow(dead_code)]

use mangalib_common::db::{init_database, Library};
use mangalib_import::db::libraries;
use sqlx::SqlitePool;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestEnv {
    /// Keeps the directory alive for the duration of the test
    pub dir: TempDir,
    pub import_root: PathBuf,
    pub pool: SqlitePool,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let import_root = dir.path().join("import");
        fs::create_dir_all(&import_root).unwrap();
        let pool = init_database(&dir.path().join("mangalib.db")).await.unwrap();

        Self {
            dir,
            import_root,
            pool,
        }
    }

    pub fn library_root(&self, name: &str) -> PathBuf {
        self.dir.path().join("libraries").join(name)
    }

    pub async fn add_library(&self, name: &str) -> Library {
        let path = self.library_root(name);
        fs::create_dir_all(&path).unwrap();
        libraries::create_library(&self.pool, name, &path.to_string_lossy(), None)
            .await
            .unwrap()
    }

    /// Series row plus its directory
    pub async fn add_series(&self, library: &Library, title: &str) -> i64 {
        let path = Path::new(&library.path).join(title);
        fs::create_dir_all(&path).unwrap();
        libraries::create_series(&self.pool, library.id, title, &path.to_string_lossy())
            .await
            .unwrap()
    }

    /// Volume file already in the library, with its row
    pub async fn add_volume(
        &self,
        library: &Library,
        series_id: i64,
        series_title: &str,
        filename: &str,
        volume: i64,
        size: usize,
    ) -> PathBuf {
        let path = Path::new(&library.path).join(series_title).join(filename);
        write_file(&path, size);
        libraries::insert_volume(
            &self.pool,
            &libraries::NewVolume {
                series_id,
                volume_number: Some(volume),
                filename: filename.to_string(),
                filepath: path.to_string_lossy().into_owned(),
                file_size: size as i64,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        path
    }

    pub fn write_import_file(&self, relative: &str, size: usize) -> PathBuf {
        let path = self.import_root.join(relative);
        write_file(&path, size);
        path
    }

    pub async fn volume_count(&self, series_id: i64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM volumes WHERE series_id = ?")
            .bind(series_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

pub fn write_file(path: &Path, size: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![7u8; size]).unwrap();
}

pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).unwrap().len()
}
