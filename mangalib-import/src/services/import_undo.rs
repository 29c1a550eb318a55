//! Undo of a completed import
//!
//! Files brought in by the operation are moved to
//! `<import_path>/_undo/<operation_id>/`, never deleted. Their volume rows are
//! removed. A file that cannot be moved is reported and left in place. A
//! moved file whose rows could not be updated still counts as undone and is
//! also reported. The operation is marked `undone` either way.

use crate::db::{history, libraries};
use crate::error::{ImportError, ImportResult};
use crate::models::{FileStatus, OperationStatus};
use crate::services::file_ops::{move_to_holding, UNDO_DIR};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndoFileError {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndoReport {
    pub operation_id: Uuid,
    pub undo_dir: PathBuf,
    pub undone_count: usize,
    pub errors: Vec<UndoFileError>,
}

/// Directory receiving the files of an undone operation
pub fn undo_dir_for(import_path: &Path, operation_id: Uuid) -> PathBuf {
    import_path.join(UNDO_DIR).join(operation_id.to_string())
}

pub async fn undo_operation(pool: &SqlitePool, operation_id: Uuid) -> ImportResult<UndoReport> {
    let operation = history::get_operation(pool, operation_id)
        .await?
        .ok_or(ImportError::OperationNotFound(operation_id))?;

    if !operation.status.is_undoable() {
        return Err(ImportError::NotUndoable {
            operation_id,
            status: operation.status,
        });
    }

    let undo_dir = undo_dir_for(Path::new(&operation.import_path), operation_id);
    let files = history::get_operation_files(pool, operation_id).await?;

    tracing::info!(
        operation_id = %operation_id,
        files = files.len(),
        undo_dir = %undo_dir.display(),
        "Undoing import"
    );

    let mut undone_count = 0;
    let mut errors = Vec::new();
    let mut touched_series = BTreeSet::new();

    for file in files
        .iter()
        .filter(|f| f.action.is_reversible() && f.status == FileStatus::Success)
    {
        let path = Path::new(&file.destination_path);

        let moved = if path.is_file() {
            move_to_holding(path, &undo_dir).map_err(|e| e.to_string())
        } else {
            Err(format!("File not found: {}", path.display()))
        };

        match moved {
            Ok(undo_path) => {
                // File already moved: database errors are reported, not raised
                let mut db_errors = Vec::new();
                if let Err(e) =
                    libraries::delete_volumes_by_filepath(pool, &file.destination_path).await
                {
                    db_errors.push(format!("volume rows not removed: {}", e));
                }

                let mut message = format!("Moved to {}", undo_path.display());
                if !db_errors.is_empty() {
                    message = format!("{}; {}", message, db_errors.join("; "));
                }
                if let Err(e) =
                    history::update_file_status(pool, file.id, FileStatus::Undone, &message).await
                {
                    db_errors.push(format!("journal not updated: {}", e));
                }

                if let Some(series_id) = file.series_id {
                    touched_series.insert(series_id);
                }
                undone_count += 1;

                if !db_errors.is_empty() {
                    let error = format!(
                        "Moved to {} but {}",
                        undo_path.display(),
                        db_errors.join("; ")
                    );
                    tracing::warn!(
                        operation_id = %operation_id,
                        file = %file.filename,
                        error = %error,
                        "Undo left database out of date"
                    );
                    errors.push(UndoFileError {
                        file: file.filename.clone(),
                        error,
                    });
                }
            }
            Err(error) => {
                tracing::warn!(
                    operation_id = %operation_id,
                    file = %file.filename,
                    error = %error,
                    "Could not undo file"
                );
                if let Err(e) =
                    history::update_file_status(pool, file.id, FileStatus::Success, &error).await
                {
                    tracing::warn!(file_id = file.id, error = %e, "Could not journal undo error");
                }
                errors.push(UndoFileError {
                    file: file.filename.clone(),
                    error,
                });
            }
        }
    }

    for series_id in touched_series {
        if let Err(e) = libraries::refresh_series_stats(pool, series_id).await {
            tracing::warn!(series_id, error = %e, "Failed to refresh series stats after undo");
        }
    }

    history::set_operation_status(pool, operation_id, OperationStatus::Undone).await?;

    tracing::info!(
        operation_id = %operation_id,
        undone = undone_count,
        errors = errors.len(),
        "Undo complete"
    );

    Ok(UndoReport {
        operation_id,
        undo_dir,
        undone_count,
        errors,
    })
}
