//! File moves and holding areas
//!
//! Files are never overwritten or deleted. Displaced files go to a holding
//! area inside the import root; name collisions get a timestamp suffix.

use chrono::Local;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Smaller files displaced by a larger incoming copy
pub const OLD_FILES_DIR: &str = "_old_files";

/// Incoming files that lost against an equal or larger existing copy
pub const DUPLICATES_DIR: &str = "_doublons";

/// Files moved back by an undo, one subdirectory per operation
pub const UNDO_DIR: &str = "_undo";

pub const HOLDING_DIRS: [&str; 3] = [OLD_FILES_DIR, DUPLICATES_DIR, UNDO_DIR];

/// Bound on the collision counter; past it the move fails instead of looping
const MAX_COLLISION_ATTEMPTS: u32 = 10_000;

#[derive(Debug, Error)]
#[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
pub struct FileMoveError {
    pub from: PathBuf,
    pub to: PathBuf,
    #[source]
    pub source: io::Error,
}

pub fn is_holding_dir(name: &str) -> bool {
    HOLDING_DIRS.contains(&name)
}

/// Move a file, creating the target's parent directory
///
/// Tries `rename` first and falls back to copy + remove when the target is on
/// another filesystem. Refuses to replace an existing target.
pub fn move_file(from: &Path, to: &Path) -> Result<(), FileMoveError> {
    let wrap = |source: io::Error| FileMoveError {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if to.exists() {
        return Err(wrap(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "target already exists",
        )));
    }

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(wrap)?;
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !from.exists() {
                return Err(wrap(rename_err));
            }
            tracing::debug!(
                from = %from.display(),
                to = %to.display(),
                error = %rename_err,
                "Rename failed, copying instead"
            );
            fs::copy(from, to).map_err(wrap)?;
            if let Err(e) = fs::remove_file(from) {
                // Keep a single copy: drop the new one if the source stays
                return Err(wrap(discard_copy(to, e)));
            }
            Ok(())
        }
    }
}

/// Remove the copy left at `to` after the source could not be removed
///
/// Returns `cause`, extended with the cleanup failure when the copy stays.
fn discard_copy(to: &Path, cause: io::Error) -> io::Error {
    match fs::remove_file(to) {
        Ok(()) => cause,
        Err(cleanup) => {
            tracing::error!(
                copy = %to.display(),
                error = %cleanup,
                "Could not remove copy after failed move, file now exists twice"
            );
            io::Error::new(
                cause.kind(),
                format!(
                    "{}; copy left at {} could not be removed: {}",
                    cause,
                    to.display(),
                    cleanup
                ),
            )
        }
    }
}

/// Path for `filename` inside `dir` that does not exist yet
///
/// Collisions get `_YYYYmmdd_HHMMSS` before the extension, then a counter.
pub fn unique_path_in(dir: &Path, filename: &str) -> io::Result<PathBuf> {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let name = Path::new(filename);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let extension = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stamp = Local::now().format("%Y%m%d_%H%M%S");

    let stamped = dir.join(format!("{stem}_{stamp}{extension}"));
    if !stamped.exists() {
        return Ok(stamped);
    }

    for counter in 1..=MAX_COLLISION_ATTEMPTS {
        let numbered = dir.join(format!("{stem}_{stamp}_{counter}{extension}"));
        if !numbered.exists() {
            return Ok(numbered);
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {filename} in {}", dir.display()),
    ))
}

/// Move a file into a holding area under a collision-free name
pub fn move_to_holding(from: &Path, holding_dir: &Path) -> Result<PathBuf, FileMoveError> {
    let filename = from
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let target = unique_path_in(holding_dir, &filename).map_err(|source| FileMoveError {
        from: from.to_path_buf(),
        to: holding_dir.to_path_buf(),
        source,
    })?;

    move_file(from, &target)?;
    Ok(target)
}

/// Join a client-supplied relative path onto `root`
///
/// Rejects absolute paths and any `..` component.
pub fn join_relative(root: &Path, relative: &str) -> Option<PathBuf> {
    let rel = Path::new(relative);
    if relative.is_empty() || rel.is_absolute() {
        return None;
    }

    let safe = rel
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    safe.then(|| root.join(rel))
}

/// Directory name for a series title
///
/// Path separators and characters invalid on common filesystems become `_`.
pub fn sanitize_dir_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim().trim_matches('.').trim();
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}
