//! Empty directory cleanup for the import root

use crate::services::file_ops::is_holding_dir;
use crate::services::import_scanner::{ensure_directory, ScanError};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Remove empty directories below `root`, deepest first
///
/// The root itself and the holding areas are never removed or entered.
/// Returns the number of directories removed; a second run returns 0.
pub fn cleanup_empty_directories(root: &Path) -> Result<usize, ScanError> {
    ensure_directory(root)?;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .contents_first(true)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir() && is_holding_dir(&e.file_name().to_string_lossy()))
        });

    let mut removed = 0;
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Error accessing entry during cleanup");
                continue;
            }
        };

        if entry.depth() == 0 || !entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let is_empty = match fs::read_dir(path) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read directory");
                continue;
            }
        };

        if !is_empty {
            continue;
        }

        match fs::remove_dir(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed empty directory");
                removed += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove directory");
            }
        }
    }

    tracing::info!(root = %root.display(), removed, "Directory cleanup complete");
    Ok(removed)
}
