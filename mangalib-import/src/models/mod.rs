//! Data models for the import service

pub mod import_operation;
pub mod import_record;
pub mod import_session;
pub mod library_index;

pub use import_operation::{
    FileAction, FileOutcome, FileStatus, ImportCounts, ImportFileRecord, ImportOperation,
    OperationDetails, OperationStatus, OperationType,
};
pub use import_record::{Destination, ImportRecord, ParsedFilename, SeriesTarget, UNTITLED};
pub use import_session::{ImportSession, SessionStats, SessionStore};
pub use library_index::{LibraryIndex, LibrarySeries, SeriesIndexEntry};
