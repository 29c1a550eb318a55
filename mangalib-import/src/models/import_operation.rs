//! Import journal entries
//!
//! Every execution writes one [`ImportOperation`] and one
//! [`ImportFileRecord`] per processed file. The journal is what undo replays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle of an import operation
///
/// `started` → `completed` | `failed`, and `completed` → `undone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Started,
    Completed,
    Failed,
    Undone,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Started => "started",
            OperationStatus::Completed => "completed",
            OperationStatus::Failed => "failed",
            OperationStatus::Undone => "undone",
        }
    }

    /// Only completed operations can be undone
    pub fn is_undoable(&self) -> bool {
        matches!(self, OperationStatus::Completed)
    }
}

/// How the operation was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Files posted directly to the execute endpoint
    ManualImport,
    /// Assigned records of a stored session
    SessionImport,
    /// Files whose title matched a series exactly, without a session
    AutoImport,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::ManualImport => "manual_import",
            OperationType::SessionImport => "session_import",
            OperationType::AutoImport => "auto_import",
        }
    }
}

/// What happened to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    /// Moved into the series directory
    Imported,
    /// Moved in after the smaller existing file went to `_old_files`
    Replaced,
    /// Moved to `_doublons` because an equal or larger file exists
    Skipped,
    Failed,
}

impl FileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::Imported => "imported",
            FileAction::Replaced => "replaced",
            FileAction::Skipped => "skipped",
            FileAction::Failed => "failed",
        }
    }

    /// Imported and replaced files are the ones undo moves back
    pub fn is_reversible(&self) -> bool {
        matches!(self, FileAction::Imported | FileAction::Replaced)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Error,
    Undone,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Success => "success",
            FileStatus::Error => "error",
            FileStatus::Undone => "undone",
        }
    }
}

/// Unknown enum text read back from the journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError(pub String);

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown journal value: {}", self.0)
    }
}

impl std::error::Error for ParseEnumError {}

macro_rules! impl_journal_enum {
    ($ty:ty, [$($variant:expr),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| ParseEnumError(s.to_string()))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_journal_enum!(
    OperationStatus,
    [
        OperationStatus::Started,
        OperationStatus::Completed,
        OperationStatus::Failed,
        OperationStatus::Undone,
    ]
);
impl_journal_enum!(
    OperationType,
    [
        OperationType::ManualImport,
        OperationType::SessionImport,
        OperationType::AutoImport,
    ]
);
impl_journal_enum!(
    FileAction,
    [
        FileAction::Imported,
        FileAction::Replaced,
        FileAction::Skipped,
        FileAction::Failed,
    ]
);
impl_journal_enum!(
    FileStatus,
    [FileStatus::Success, FileStatus::Error, FileStatus::Undone]
);

/// Per-action counters of an execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    pub imported: u32,
    pub replaced: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl ImportCounts {
    pub fn record(&mut self, action: FileAction) {
        match action {
            FileAction::Imported => self.imported += 1,
            FileAction::Replaced => self.replaced += 1,
            FileAction::Skipped => self.skipped += 1,
            FileAction::Failed => self.failed += 1,
        }
    }

    pub fn processed(&self) -> u32 {
        self.imported + self.replaced + self.skipped + self.failed
    }
}

/// Journal row for one execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOperation {
    pub operation_id: Uuid,
    pub operation_type: OperationType,
    pub status: OperationStatus,
    pub import_path: String,
    pub files_processed: u32,
    pub files_imported: u32,
    pub files_replaced: u32,
    pub files_skipped: u32,
    pub files_failed: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportOperation {
    pub fn counts(&self) -> ImportCounts {
        ImportCounts {
            imported: self.files_imported,
            replaced: self.files_replaced,
            skipped: self.files_skipped,
            failed: self.files_failed,
        }
    }
}

/// Journal row for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFileRecord {
    pub id: i64,
    pub operation_id: Uuid,
    pub filename: String,
    pub source_path: String,
    pub destination_path: String,
    pub series_id: Option<i64>,
    pub series_title: String,
    pub action: FileAction,
    pub status: FileStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// File outcome produced by the executor, before it is journaled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub filename: String,
    pub source_path: String,
    pub destination_path: String,
    pub series_id: Option<i64>,
    pub series_title: String,
    pub action: FileAction,
    pub status: FileStatus,
    pub message: String,
}

impl FileOutcome {
    /// Outcome for a file that could not be handled
    pub fn failed(filename: &str, source_path: &str, message: impl Into<String>) -> Self {
        Self {
            filename: filename.to_string(),
            source_path: source_path.to_string(),
            destination_path: String::new(),
            series_id: None,
            series_title: String::new(),
            action: FileAction::Failed,
            status: FileStatus::Error,
            message: message.into(),
        }
    }
}

/// Operation plus its file rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDetails {
    pub operation: ImportOperation,
    pub files: Vec<ImportFileRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_round_trip() {
        for status in [
            OperationStatus::Started,
            OperationStatus::Completed,
            OperationStatus::Failed,
            OperationStatus::Undone,
        ] {
            assert_eq!(status.as_str().parse::<OperationStatus>().unwrap(), status);
        }
        assert!("finished".parse::<OperationStatus>().is_err());
    }

    #[test]
    fn test_only_completed_is_undoable() {
        assert!(OperationStatus::Completed.is_undoable());
        assert!(!OperationStatus::Started.is_undoable());
        assert!(!OperationStatus::Failed.is_undoable());
        assert!(!OperationStatus::Undone.is_undoable());
    }

    #[test]
    fn test_counts() {
        let mut counts = ImportCounts::default();
        counts.record(FileAction::Imported);
        counts.record(FileAction::Imported);
        counts.record(FileAction::Skipped);
        counts.record(FileAction::Failed);

        assert_eq!(counts.imported, 2);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.processed(), 4);
    }

    #[test]
    fn test_action_serializes_lowercase() {
        let json = serde_json::to_string(&FileAction::Replaced).unwrap();
        assert_eq!(json, "\"replaced\"");
        let json = serde_json::to_string(&OperationType::SessionImport).unwrap();
        assert_eq!(json, "\"session_import\"");
        assert_eq!(
            "auto_import".parse::<OperationType>().unwrap(),
            OperationType::AutoImport
        );
    }
}
