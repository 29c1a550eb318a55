//! Library, series and volume access

use crate::models::{LibraryIndex, LibrarySeries, SeriesIndexEntry};
use mangalib_common::db::{Library, Series, Volume};
use mangalib_common::Result;
use sqlx::SqlitePool;
use std::collections::BTreeSet;

pub async fn list_libraries(pool: &SqlitePool) -> Result<Vec<Library>> {
    let libraries = sqlx::query_as::<_, Library>(
        "SELECT id, name, path, description FROM libraries ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(libraries)
}

pub async fn get_library(pool: &SqlitePool, library_id: i64) -> Result<Option<Library>> {
    let library = sqlx::query_as::<_, Library>(
        "SELECT id, name, path, description FROM libraries WHERE id = ?",
    )
    .bind(library_id)
    .fetch_optional(pool)
    .await?;

    Ok(library)
}

pub async fn create_library(
    pool: &SqlitePool,
    name: &str,
    path: &str,
    description: Option<&str>,
) -> Result<Library> {
    let id = sqlx::query("INSERT INTO libraries (name, path, description) VALUES (?, ?, ?)")
        .bind(name)
        .bind(path)
        .bind(description)
        .execute(pool)
        .await?
        .last_insert_rowid();

    Ok(Library {
        id,
        name: name.to_string(),
        path: path.to_string(),
        description: description.map(str::to_string),
    })
}

pub async fn list_series(pool: &SqlitePool, library_id: i64) -> Result<Vec<Series>> {
    let series = sqlx::query_as::<_, Series>(
        r#"
        SELECT id, library_id, title, path, total_volumes, missing_volumes, has_parts
        FROM series
        WHERE library_id = ?
        ORDER BY title COLLATE NOCASE, id
        "#,
    )
    .bind(library_id)
    .fetch_all(pool)
    .await?;

    Ok(series)
}

/// Snapshot of every library with its series, for matching
pub async fn load_library_index(pool: &SqlitePool) -> Result<LibraryIndex> {
    let libraries = list_libraries(pool).await?;
    let mut entries = Vec::with_capacity(libraries.len());

    for library in libraries {
        let series = sqlx::query_as::<_, SeriesIndexEntry>(
            "SELECT id, title FROM series WHERE library_id = ? ORDER BY id",
        )
        .bind(library.id)
        .fetch_all(pool)
        .await?;

        entries.push(LibrarySeries { library, series });
    }

    Ok(LibraryIndex::new(entries))
}

pub async fn find_series_by_title(
    pool: &SqlitePool,
    library_id: i64,
    title: &str,
) -> Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM series WHERE library_id = ? AND title = ? ORDER BY id LIMIT 1",
    )
    .bind(library_id)
    .bind(title)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Library owning a series, `None` when the series does not exist
pub async fn series_library_id(pool: &SqlitePool, series_id: i64) -> Result<Option<i64>> {
    let library_id = sqlx::query_scalar::<_, i64>("SELECT library_id FROM series WHERE id = ?")
        .bind(series_id)
        .fetch_optional(pool)
        .await?;

    Ok(library_id)
}

pub async fn create_series(
    pool: &SqlitePool,
    library_id: i64,
    title: &str,
    path: &str,
) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO series (library_id, title, path, total_volumes, missing_volumes, has_parts)
        VALUES (?, ?, ?, 0, '[]', 0)
        "#,
    )
    .bind(library_id)
    .bind(title)
    .bind(path)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn update_series_path(pool: &SqlitePool, series_id: i64, path: &str) -> Result<()> {
    sqlx::query("UPDATE series SET path = ? WHERE id = ?")
        .bind(path)
        .bind(series_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Volume row to insert
#[derive(Debug, Clone, Default)]
pub struct NewVolume {
    pub series_id: i64,
    pub part_number: Option<i64>,
    pub part_name: Option<String>,
    pub volume_number: Option<i64>,
    pub filename: String,
    pub filepath: String,
    pub author: Option<String>,
    pub year: Option<i64>,
    pub resolution: Option<String>,
    pub file_size: i64,
    pub format: Option<String>,
}

pub async fn insert_volume(pool: &SqlitePool, volume: &NewVolume) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO volumes (
            series_id, part_number, part_name, volume_number, filename, filepath,
            author, year, resolution, file_size, format
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(volume.series_id)
    .bind(volume.part_number)
    .bind(&volume.part_name)
    .bind(volume.volume_number)
    .bind(&volume.filename)
    .bind(&volume.filepath)
    .bind(&volume.author)
    .bind(volume.year)
    .bind(&volume.resolution)
    .bind(volume.file_size)
    .bind(&volume.format)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Volume rows of a series with the given number, newest first
pub async fn volumes_by_number(
    pool: &SqlitePool,
    series_id: i64,
    volume_number: i64,
) -> Result<Vec<Volume>> {
    let volumes = sqlx::query_as::<_, Volume>(
        r#"
        SELECT id, series_id, part_number, part_name, volume_number, filename, filepath,
               author, year, resolution, file_size, page_count, format
        FROM volumes
        WHERE series_id = ? AND volume_number = ?
        ORDER BY id DESC
        "#,
    )
    .bind(series_id)
    .bind(volume_number)
    .fetch_all(pool)
    .await?;

    Ok(volumes)
}

pub async fn delete_volume(pool: &SqlitePool, volume_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM volumes WHERE id = ?")
        .bind(volume_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete volume rows pointing at `filepath`, returning how many went
pub async fn delete_volumes_by_filepath(pool: &SqlitePool, filepath: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM volumes WHERE filepath = ?")
        .bind(filepath)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Gaps in `1..=max` for the given volume numbers
pub fn missing_volume_numbers(numbers: &BTreeSet<i64>) -> Vec<i64> {
    match numbers.iter().next_back() {
        Some(&max) if max > 0 => (1..=max).filter(|n| !numbers.contains(n)).collect(),
        _ => Vec::new(),
    }
}

/// Recompute `total_volumes`, `missing_volumes` and `has_parts` from volume rows
pub async fn refresh_series_stats(pool: &SqlitePool, series_id: i64) -> Result<()> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM volumes WHERE series_id = ?")
        .bind(series_id)
        .fetch_one(pool)
        .await?;

    let numbers: BTreeSet<i64> = sqlx::query_scalar::<_, i64>(
        "SELECT DISTINCT volume_number FROM volumes WHERE series_id = ? AND volume_number IS NOT NULL",
    )
    .bind(series_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect();

    let has_parts: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM volumes WHERE series_id = ? AND part_number IS NOT NULL)",
    )
    .bind(series_id)
    .fetch_one(pool)
    .await?;

    let missing = serde_json::to_string(&missing_volume_numbers(&numbers))
        .map_err(|e| mangalib_common::Error::Internal(format!("Failed to serialize missing volumes: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE series
        SET total_volumes = ?, missing_volumes = ?, has_parts = ?, last_scanned = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(total)
    .bind(&missing)
    .bind(has_parts)
    .bind(series_id)
    .execute(pool)
    .await?;

    Ok(())
}
