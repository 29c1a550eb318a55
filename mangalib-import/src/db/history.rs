//! Import journal persistence
//!
//! Writes go through [`retry_on_lock`] so a busy database delays the journal
//! instead of dropping entries.

use crate::models::{
    FileOutcome, FileStatus, ImportCounts, ImportFileRecord, ImportOperation, OperationStatus,
    OperationType,
};
use crate::utils::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
use chrono::{DateTime, Utc};
use mangalib_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

fn parse_column<T>(row: &SqliteRow, column: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>()
        .map_err(|e| Error::Internal(format!("Invalid {} '{}': {}", column, raw, e)))
}

fn count_column(row: &SqliteRow, column: &str) -> Result<u32> {
    let value: i64 = row.try_get(column)?;
    Ok(value.max(0) as u32)
}

fn operation_from_row(row: &SqliteRow) -> Result<ImportOperation> {
    let created_at: String = row.try_get("created_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;

    Ok(ImportOperation {
        operation_id: parse_column(row, "operation_id")?,
        operation_type: parse_column(row, "operation_type")?,
        status: parse_column(row, "status")?,
        import_path: row.try_get("import_path")?,
        files_processed: count_column(row, "files_processed")?,
        files_imported: count_column(row, "files_imported")?,
        files_replaced: count_column(row, "files_replaced")?,
        files_skipped: count_column(row, "files_skipped")?,
        files_failed: count_column(row, "files_failed")?,
        created_at: parse_timestamp(&created_at, "created_at")?,
        completed_at: completed_at
            .map(|s| parse_timestamp(&s, "completed_at"))
            .transpose()?,
    })
}

fn file_from_row(row: &SqliteRow) -> Result<ImportFileRecord> {
    let created_at: String = row.try_get("created_at")?;

    Ok(ImportFileRecord {
        id: row.try_get("id")?,
        operation_id: parse_column(row, "operation_id")?,
        filename: row.try_get("filename")?,
        source_path: row.try_get("source_path")?,
        destination_path: row.try_get("destination_path")?,
        series_id: row.try_get("series_id")?,
        series_title: row.try_get("series_title")?,
        action: parse_column(row, "action")?,
        status: parse_column(row, "status")?,
        message: row.try_get("message")?,
        created_at: parse_timestamp(&created_at, "created_at")?,
    })
}

/// Journal a new operation with status `started`
pub async fn create_operation(
    pool: &SqlitePool,
    operation_type: OperationType,
    import_path: &str,
) -> Result<ImportOperation> {
    let operation = ImportOperation {
        operation_id: Uuid::new_v4(),
        operation_type,
        status: OperationStatus::Started,
        import_path: import_path.to_string(),
        files_processed: 0,
        files_imported: 0,
        files_replaced: 0,
        files_skipped: 0,
        files_failed: 0,
        created_at: Utc::now(),
        completed_at: None,
    };

    let operation_id = operation.operation_id.to_string();
    let created_at = operation.created_at.to_rfc3339();

    retry_on_lock("create_operation", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        sqlx::query(
            r#"
            INSERT INTO import_history (operation_id, operation_type, status, import_path, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&operation_id)
        .bind(operation_type.as_str())
        .bind(OperationStatus::Started.as_str())
        .bind(import_path)
        .bind(&created_at)
        .execute(pool)
        .await?;
        Ok::<_, Error>(())
    })
    .await?;

    Ok(operation)
}

/// Journal one file outcome, returning the row id
pub async fn record_file(pool: &SqlitePool, operation_id: Uuid, outcome: &FileOutcome) -> Result<i64> {
    let operation_id = operation_id.to_string();
    let created_at = Utc::now().to_rfc3339();

    retry_on_lock("record_file", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        let id = sqlx::query(
            r#"
            INSERT INTO import_history_files (
                operation_id, filename, source_path, destination_path, series_id,
                series_title, action, status, message, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&operation_id)
        .bind(&outcome.filename)
        .bind(&outcome.source_path)
        .bind(&outcome.destination_path)
        .bind(outcome.series_id)
        .bind(&outcome.series_title)
        .bind(outcome.action.as_str())
        .bind(outcome.status.as_str())
        .bind(&outcome.message)
        .bind(&created_at)
        .execute(pool)
        .await?
        .last_insert_rowid();
        Ok::<_, Error>(id)
    })
    .await
}

/// Store final status and counters
pub async fn finalize_operation(
    pool: &SqlitePool,
    operation_id: Uuid,
    status: OperationStatus,
    counts: &ImportCounts,
) -> Result<()> {
    let operation_id = operation_id.to_string();
    let completed_at = Utc::now().to_rfc3339();

    retry_on_lock("finalize_operation", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        sqlx::query(
            r#"
            UPDATE import_history
            SET status = ?, files_processed = ?, files_imported = ?, files_replaced = ?,
                files_skipped = ?, files_failed = ?, completed_at = ?
            WHERE operation_id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(counts.processed() as i64)
        .bind(counts.imported as i64)
        .bind(counts.replaced as i64)
        .bind(counts.skipped as i64)
        .bind(counts.failed as i64)
        .bind(&completed_at)
        .bind(&operation_id)
        .execute(pool)
        .await?;
        Ok::<_, Error>(())
    })
    .await
}

pub async fn set_operation_status(
    pool: &SqlitePool,
    operation_id: Uuid,
    status: OperationStatus,
) -> Result<()> {
    let operation_id = operation_id.to_string();

    retry_on_lock("set_operation_status", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        sqlx::query("UPDATE import_history SET status = ? WHERE operation_id = ?")
            .bind(status.as_str())
            .bind(&operation_id)
            .execute(pool)
            .await?;
        Ok::<_, Error>(())
    })
    .await
}

/// Update a file row after an undo attempt
pub async fn update_file_status(
    pool: &SqlitePool,
    file_id: i64,
    status: FileStatus,
    message: &str,
) -> Result<()> {
    retry_on_lock("update_file_status", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        sqlx::query("UPDATE import_history_files SET status = ?, message = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(message)
            .bind(file_id)
            .execute(pool)
            .await?;
        Ok::<_, Error>(())
    })
    .await
}

/// Most recent operations first
pub async fn list_operations(pool: &SqlitePool, limit: u32) -> Result<Vec<ImportOperation>> {
    let rows = sqlx::query(
        r#"
        SELECT operation_id, operation_type, status, import_path, files_processed,
               files_imported, files_replaced, files_skipped, files_failed,
               created_at, completed_at
        FROM import_history
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    rows.iter().map(operation_from_row).collect()
}

pub async fn get_operation(pool: &SqlitePool, operation_id: Uuid) -> Result<Option<ImportOperation>> {
    let row = sqlx::query(
        r#"
        SELECT operation_id, operation_type, status, import_path, files_processed,
               files_imported, files_replaced, files_skipped, files_failed,
               created_at, completed_at
        FROM import_history
        WHERE operation_id = ?
        "#,
    )
    .bind(operation_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(operation_from_row).transpose()
}

/// File rows of an operation in processing order
pub async fn get_operation_files(
    pool: &SqlitePool,
    operation_id: Uuid,
) -> Result<Vec<ImportFileRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, operation_id, filename, source_path, destination_path, series_id,
               series_title, action, status, message, created_at
        FROM import_history_files
        WHERE operation_id = ?
        ORDER BY id
        "#,
    )
    .bind(operation_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(file_from_row).collect()
}
