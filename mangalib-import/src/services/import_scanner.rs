//! Import directory scanner
//!
//! Walks an import root, keeps supported manga files and parses each filename
//! into an [`ImportRecord`]. Holding areas left by earlier imports are skipped.

use crate::models::{Destination, ImportRecord};
use crate::services::file_ops::is_holding_dir;
use crate::services::filename_parser::parse_filename;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Import scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Permission denied when accessing path
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// General I/O error
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ScanError::PathNotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(path.to_path_buf()),
            _ => ScanError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// Check that `root` is an existing, readable directory
pub fn ensure_directory(root: &Path) -> Result<(), ScanError> {
    if !root.exists() {
        return Err(ScanError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    std::fs::read_dir(root).map_err(|e| ScanError::from_io(root, e))?;
    Ok(())
}

/// Files sharing one group title
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleGroup {
    pub title: String,
    /// Record indices, ascending
    pub indices: Vec<usize>,
    pub total_size: u64,
    pub assigned: usize,
    /// Set when every record of the group has this same destination
    pub destination: Option<Destination>,
}

/// Group records by title, ordered by title
pub fn group_by_title(records: &[ImportRecord]) -> Vec<TitleGroup> {
    let mut by_title: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        by_title.entry(record.group_title()).or_default().push(index);
    }

    by_title
        .into_iter()
        .map(|(title, indices)| {
            let members = || indices.iter().map(|&i| &records[i]);
            let assigned = members().filter(|r| r.is_assigned()).count();
            let first = members().next().and_then(|r| r.destination.clone());
            let destination =
                first.filter(|d| members().all(|r| r.destination.as_ref() == Some(d)));

            TitleGroup {
                title: title.to_string(),
                total_size: members().map(|r| r.file_size).sum(),
                assigned,
                destination,
                indices,
            }
        })
        .collect()
}

/// Manga file scanner
pub struct ImportScanner {
    ignore_patterns: Vec<String>,
}

impl Default for ImportScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportScanner {
    /// Create new scanner with default ignore patterns
    ///
    /// Ignores system entries like .DS_Store, Thumbs.db, .git
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
                "@eaDir".to_string(),
            ],
        }
    }

    /// Scan `root` for supported files, sorted by path
    pub fn scan(&self, root: &Path) -> Result<Vec<ImportRecord>, ScanError> {
        ensure_directory(root)?;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || self.should_process_entry(e));

        let mut records = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Error accessing entry, skipping");
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_supported_extension(entry.path()) {
                continue;
            }

            let file_size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "Cannot stat file, skipping");
                    continue;
                }
            };

            let filename = entry.file_name().to_string_lossy().into_owned();
            let relative_path = relative_to(root, entry.path());
            let parsed = parse_filename(&filename);
            records.push(ImportRecord::new(filename, relative_path, file_size, parsed));
        }

        tracing::info!(
            root = %root.display(),
            files = records.len(),
            "Import scan complete"
        );

        Ok(records)
    }

    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        let file_name = entry.file_name().to_string_lossy();

        if entry.file_type().is_dir() && is_holding_dir(&file_name) {
            return false;
        }

        !self
            .ignore_patterns
            .iter()
            .any(|pattern| file_name.contains(pattern.as_str()))
    }
}

/// Case-insensitive check against the supported archive and document formats
pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| matches!(ext.as_str(), "cbz" | "cbr" | "zip" | "rar" | "pdf" | "epub"))
}

/// Forward-slash path of `path` relative to `root`
fn relative_to(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParsedFilename, SeriesTarget};
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path, bytes: usize) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn test_scan_finds_supported_files() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("Bleach Tome 01.cbz"), 10);
        touch(&dir.path().join("sub/Bleach Tome 02.CBR"), 20);
        touch(&dir.path().join("notes.txt"), 5);
        touch(&dir.path().join("Thumbs.db"), 5);

        let records = ImportScanner::new().scan(dir.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].relative_path, "Bleach Tome 01.cbz");
        assert_eq!(records[0].file_size, 10);
        assert_eq!(records[0].parsed.volume, Some(1));
        assert_eq!(records[1].relative_path, "sub/Bleach Tome 02.CBR");
        assert_eq!(records[1].parsed.format, "cbr");
    }

    #[test]
    fn test_scan_skips_holding_areas() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("_old_files/A T01.cbz"), 1);
        touch(&dir.path().join("_doublons/A T02.cbz"), 1);
        touch(&dir.path().join("_undo/op/A T03.cbz"), 1);
        touch(&dir.path().join("A T04.cbz"), 1);

        let records = ImportScanner::new().scan(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, "A T04.cbz");
    }

    #[test]
    fn test_scan_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(ImportScanner::new().scan(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_scan_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            ImportScanner::new().scan(&missing),
            Err(ScanError::PathNotFound(_))
        ));

        let file = dir.path().join("file.cbz");
        touch(&file, 1);
        assert!(matches!(
            ImportScanner::new().scan(&file),
            Err(ScanError::NotADirectory(_))
        ));
    }

    fn record(title: Option<&str>, size: u64) -> ImportRecord {
        ImportRecord::new(
            "f.cbz".to_string(),
            "f.cbz".to_string(),
            size,
            ParsedFilename {
                title: title.map(str::to_string),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_group_by_title() {
        let dest = Destination {
            library_id: 1,
            library_name: "L".to_string(),
            library_path: "/l".to_string(),
            series: SeriesTarget::Existing {
                series_id: 3,
                series_title: "Bleach".to_string(),
            },
        };

        let mut records = vec![
            record(Some("Bleach"), 10),
            record(None, 1),
            record(Some("Bleach"), 20),
            record(Some("Akira"), 5),
        ];
        records[0].destination = Some(dest.clone());
        records[2].destination = Some(dest.clone());

        let groups = group_by_title(&records);
        let titles: Vec<&str> = groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Akira", "Bleach", "Untitled"]);

        let bleach = &groups[1];
        assert_eq!(bleach.indices, vec![0, 2]);
        assert_eq!(bleach.total_size, 30);
        assert_eq!(bleach.assigned, 2);
        assert_eq!(bleach.destination.as_ref(), Some(&dest));

        assert_eq!(groups[0].destination, None);
        assert_eq!(groups[2].indices, vec![1]);
    }

    #[test]
    fn test_group_mixed_destinations_has_none() {
        let mut records = vec![record(Some("A"), 1), record(Some("A"), 1)];
        records[0].destination = Some(Destination {
            library_id: 1,
            library_name: "L".to_string(),
            library_path: "/l".to_string(),
            series: SeriesTarget::New {
                series_title: "A".to_string(),
            },
        });

        let groups = group_by_title(&records);
        assert_eq!(groups[0].assigned, 1);
        assert_eq!(groups[0].destination, None);
    }
}
