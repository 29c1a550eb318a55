//! Import execution and conflict resolution
//!
//! Moves each assigned file into `<library>/<series>/`, resolving clashes
//! with files already in the library by size:
//!
//! - no existing copy: move in, `imported`
//! - incoming larger: existing copy goes to `_old_files`, incoming moves in, `replaced`
//! - otherwise: incoming goes to `_doublons`, existing untouched, `skipped`
//!
//! Size is the only criterion. Two different files of equal size are treated
//! as duplicates and the incoming one is set aside.
//!
//! Every file is journaled as soon as it is handled. A failing file never
//! stops the batch; a failing journal write does.

use crate::db::{history, libraries};
use crate::error::{ImportError, ImportResult};
use crate::models::{
    FileAction, FileOutcome, FileStatus, ImportCounts, ImportRecord, OperationStatus,
    OperationType, SeriesTarget,
};
use crate::services::directory_cleanup::cleanup_empty_directories;
use crate::services::file_ops::{
    join_relative, move_file, move_to_holding, sanitize_dir_name, DUPLICATES_DIR, OLD_FILES_DIR,
};
use crate::services::import_scanner::ensure_directory;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A file that could not be imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    pub file: String,
    pub error: String,
}

/// Result of one execution
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub operation_id: Uuid,
    pub counts: ImportCounts,
    pub cleaned_directories: usize,
    pub failures: Vec<ImportFailure>,
    pub files: Vec<FileOutcome>,
}

/// A file already present for the same series and volume
#[derive(Debug)]
struct ExistingFile {
    path: PathBuf,
    size: u64,
    volume_id: Option<i64>,
}

/// Per-execution state shared across records
#[derive(Default)]
struct BatchState {
    /// (library_id, title) → series id created or found during this batch
    new_series: HashMap<(i64, String), i64>,
    /// (library_id, series_id) pairs checked against the database
    verified_series: HashSet<(i64, i64)>,
    touched_series: BTreeSet<i64>,
}

pub struct ImportExecutor {
    pool: SqlitePool,
}

impl ImportExecutor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Import `records` from `import_root`
    ///
    /// Records without a destination are journaled as failed. When `cleanup`
    /// is set, empty directories left in the import root are removed.
    pub async fn execute(
        &self,
        records: &[ImportRecord],
        import_root: &Path,
        operation_type: OperationType,
        cleanup: bool,
    ) -> ImportResult<ImportOutcome> {
        ensure_directory(import_root)?;

        let operation = history::create_operation(
            &self.pool,
            operation_type,
            &import_root.to_string_lossy(),
        )
        .await?;
        let operation_id = operation.operation_id;

        tracing::info!(
            operation_id = %operation_id,
            operation_type = %operation_type,
            files = records.len(),
            import_root = %import_root.display(),
            "Starting import"
        );

        let mut counts = ImportCounts::default();
        let mut batch = BatchState::default();
        let mut files = Vec::with_capacity(records.len());
        let mut failures = Vec::new();

        for record in records {
            let outcome = match self.process_record(record, import_root, &mut batch).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let source = import_root.join(&record.relative_path);
                    FileOutcome::failed(&record.filename, &source.to_string_lossy(), e.to_string())
                }
            };

            if outcome.action == FileAction::Failed {
                tracing::warn!(
                    operation_id = %operation_id,
                    file = %outcome.filename,
                    error = %outcome.message,
                    "File import failed"
                );
                failures.push(ImportFailure {
                    file: outcome.filename.clone(),
                    error: outcome.message.clone(),
                });
            } else {
                tracing::debug!(
                    operation_id = %operation_id,
                    file = %outcome.filename,
                    action = %outcome.action,
                    "File handled"
                );
            }

            if let Err(e) = history::record_file(&self.pool, operation_id, &outcome).await {
                self.abort(operation_id, &counts).await;
                return Err(e.into());
            }

            counts.record(outcome.action);
            files.push(outcome);
        }

        for series_id in &batch.touched_series {
            if let Err(e) = libraries::refresh_series_stats(&self.pool, *series_id).await {
                tracing::warn!(series_id, error = %e, "Failed to refresh series stats");
            }
        }

        let cleaned_directories = if cleanup {
            match cleanup_empty_directories(import_root) {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(error = %e, "Cleanup after import failed");
                    0
                }
            }
        } else {
            0
        };

        if let Err(e) = history::finalize_operation(
            &self.pool,
            operation_id,
            OperationStatus::Completed,
            &counts,
        )
        .await
        {
            self.abort(operation_id, &counts).await;
            return Err(e.into());
        }

        tracing::info!(
            operation_id = %operation_id,
            imported = counts.imported,
            replaced = counts.replaced,
            skipped = counts.skipped,
            failed = counts.failed,
            cleaned_directories,
            "Import complete"
        );

        Ok(ImportOutcome {
            operation_id,
            counts,
            cleaned_directories,
            failures,
            files,
        })
    }

    /// Best-effort `failed` status after a journal error
    async fn abort(&self, operation_id: Uuid, counts: &ImportCounts) {
        tracing::error!(operation_id = %operation_id, "Journal write failed, marking import failed");
        if let Err(e) =
            history::finalize_operation(&self.pool, operation_id, OperationStatus::Failed, counts)
                .await
        {
            tracing::error!(operation_id = %operation_id, error = %e, "Could not mark import failed");
        }
    }

    async fn process_record(
        &self,
        record: &ImportRecord,
        import_root: &Path,
        batch: &mut BatchState,
    ) -> ImportResult<FileOutcome> {
        let Some(destination) = record.destination.as_ref() else {
            let source = import_root.join(&record.relative_path);
            return Ok(FileOutcome::failed(
                &record.filename,
                &source.to_string_lossy(),
                "No destination assigned",
            ));
        };

        let Some(source) = join_relative(import_root, &record.relative_path) else {
            return Ok(FileOutcome::failed(
                &record.filename,
                &record.relative_path,
                "Invalid relative path",
            ));
        };
        let source_display = source.to_string_lossy().into_owned();

        if !source.is_file() {
            return Ok(FileOutcome::failed(
                &record.filename,
                &source_display,
                "Source file not found",
            ));
        }

        let series_title = destination.series_title().to_string();
        let series_dir = Path::new(&destination.library_path).join(sanitize_dir_name(&series_title));
        let series_dir_display = series_dir.to_string_lossy().into_owned();

        // No file has moved before this point
        let series_id = match &destination.series {
            SeriesTarget::New { series_title } => {
                self.new_series_id(destination.library_id, series_title, &series_dir_display, batch)
                    .await?
            }
            SeriesTarget::Existing { series_id, .. } => {
                let key = (destination.library_id, *series_id);
                if !batch.verified_series.contains(&key) {
                    let owner = libraries::series_library_id(&self.pool, *series_id).await?;
                    if owner != Some(destination.library_id) {
                        return Ok(FileOutcome::failed(
                            &record.filename,
                            &source_display,
                            ImportError::SeriesNotFound(*series_id).to_string(),
                        ));
                    }
                    libraries::update_series_path(&self.pool, *series_id, &series_dir_display)
                        .await?;
                    batch.verified_series.insert(key);
                }
                *series_id
            }
        };

        let incoming_size = fs::metadata(&source)
            .map_err(mangalib_common::Error::from)?
            .len();
        let target = series_dir.join(&record.filename);
        let existing = self
            .find_existing(series_id, record.parsed.volume, &target)
            .await?;
        fs::create_dir_all(&series_dir).map_err(mangalib_common::Error::from)?;

        let mut outcome = FileOutcome {
            filename: record.filename.clone(),
            source_path: source_display,
            destination_path: target.to_string_lossy().into_owned(),
            series_id: Some(series_id),
            series_title,
            action: FileAction::Imported,
            status: FileStatus::Success,
            message: String::new(),
        };

        // Once a file has moved, database errors go into the message only
        let mut index_errors = Vec::new();

        match existing {
            None => {
                move_file(&source, &target)?;
                batch.touched_series.insert(series_id);
                outcome.message = "Imported".to_string();

                if let Err(e) = self
                    .insert_volume(record, series_id, &target, incoming_size)
                    .await
                {
                    index_errors.push(e.to_string());
                }
            }
            Some(existing) if incoming_size > existing.size => {
                let old_files = import_root.join(OLD_FILES_DIR);
                let displaced = move_to_holding(&existing.path, &old_files)?;

                if let Err(e) = move_file(&source, &target) {
                    let message = match move_file(&displaced, &existing.path) {
                        Ok(()) => e.to_string(),
                        Err(restore) => {
                            tracing::error!(
                                file = %record.filename,
                                displaced = %displaced.display(),
                                error = %restore,
                                "Could not restore displaced file"
                            );
                            format!(
                                "{}; previous copy left at {}: {}",
                                e,
                                displaced.display(),
                                restore
                            )
                        }
                    };
                    return Ok(FileOutcome::failed(
                        &record.filename,
                        &outcome.source_path,
                        message,
                    ));
                }
                batch.touched_series.insert(series_id);

                outcome.action = FileAction::Replaced;
                outcome.message = format!(
                    "Replaced smaller file ({} < {} bytes), previous copy moved to {}",
                    existing.size,
                    incoming_size,
                    displaced.display()
                );

                if let Some(volume_id) = existing.volume_id {
                    if let Err(e) = libraries::delete_volume(&self.pool, volume_id).await {
                        index_errors.push(e.to_string());
                    }
                }
                if let Err(e) = libraries::delete_volumes_by_filepath(
                    &self.pool,
                    &existing.path.to_string_lossy(),
                )
                .await
                {
                    index_errors.push(e.to_string());
                }
                if let Err(e) = self
                    .insert_volume(record, series_id, &target, incoming_size)
                    .await
                {
                    index_errors.push(e.to_string());
                }
            }
            Some(existing) => {
                let duplicates = import_root.join(DUPLICATES_DIR);
                let parked = move_to_holding(&source, &duplicates)?;

                outcome.action = FileAction::Skipped;
                outcome.destination_path = parked.to_string_lossy().into_owned();
                outcome.message = format!(
                    "Existing file is equal or larger ({} >= {} bytes): {}",
                    existing.size,
                    incoming_size,
                    existing.path.display()
                );
            }
        }

        if !index_errors.is_empty() {
            tracing::warn!(
                file = %outcome.filename,
                errors = ?index_errors,
                "File moved but volume rows not updated"
            );
            outcome.message = format!(
                "{}; volume rows not updated: {}",
                outcome.message,
                index_errors.join("; ")
            );
        }

        Ok(outcome)
    }

    /// Series created or found for a `New` destination, once per batch
    async fn new_series_id(
        &self,
        library_id: i64,
        series_title: &str,
        series_dir: &str,
        batch: &mut BatchState,
    ) -> ImportResult<i64> {
        let key = (library_id, series_title.to_string());
        if let Some(&id) = batch.new_series.get(&key) {
            return Ok(id);
        }

        let id = match libraries::find_series_by_title(&self.pool, library_id, series_title).await? {
            Some(id) => id,
            None => {
                let id =
                    libraries::create_series(&self.pool, library_id, series_title, series_dir)
                        .await?;
                tracing::info!(
                    series_id = id,
                    library_id,
                    title = %series_title,
                    "Created series"
                );
                id
            }
        };

        batch.new_series.insert(key, id);
        Ok(id)
    }

    /// Same filename at the target, else the newest volume row whose file exists
    async fn find_existing(
        &self,
        series_id: i64,
        volume: Option<u32>,
        target: &Path,
    ) -> ImportResult<Option<ExistingFile>> {
        if let Ok(meta) = fs::metadata(target) {
            if meta.is_file() {
                return Ok(Some(ExistingFile {
                    path: target.to_path_buf(),
                    size: meta.len(),
                    volume_id: None,
                }));
            }
        }

        let Some(volume) = volume else {
            return Ok(None);
        };

        let rows = libraries::volumes_by_number(&self.pool, series_id, i64::from(volume)).await?;
        for row in rows {
            let path = PathBuf::from(&row.filepath);
            match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => {
                    return Ok(Some(ExistingFile {
                        path,
                        size: meta.len(),
                        volume_id: Some(row.id),
                    }));
                }
                _ => {
                    tracing::debug!(
                        volume_id = row.id,
                        path = %row.filepath,
                        "Volume row points to a missing file"
                    );
                }
            }
        }

        Ok(None)
    }

    async fn insert_volume(
        &self,
        record: &ImportRecord,
        series_id: i64,
        target: &Path,
        file_size: u64,
    ) -> ImportResult<i64> {
        let parsed = &record.parsed;
        let volume = libraries::NewVolume {
            series_id,
            part_number: parsed.part_number.map(i64::from),
            part_name: parsed.part_name.clone(),
            volume_number: parsed.volume.map(i64::from),
            filename: record.filename.clone(),
            filepath: target.to_string_lossy().into_owned(),
            author: parsed.author.clone(),
            year: parsed.year.map(i64::from),
            resolution: parsed.resolution.clone(),
            file_size: i64::try_from(file_size).unwrap_or(i64::MAX),
            format: (!parsed.format.is_empty()).then(|| parsed.format.clone()),
        };

        Ok(libraries::insert_volume(&self.pool, &volume).await?)
    }
}

/// Reject an empty batch before anything is journaled
pub fn ensure_non_empty(records: &[ImportRecord]) -> ImportResult<()> {
    if records.is_empty() {
        return Err(ImportError::InvalidInput("no files to import".to_string()));
    }
    Ok(())
}
