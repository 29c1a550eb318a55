//! Import services

pub mod assignment;
pub mod auto_import;
pub mod directory_cleanup;
pub mod file_ops;
pub mod filename_parser;
pub mod import_executor;
pub mod import_scanner;
pub mod import_undo;
pub mod series_resolver;
pub mod title_matcher;

pub use assignment::{
    assign_file, assign_group, auto_match_all, remove_destination, remove_group_destination,
    resolve_destination, SeriesChoice,
};
pub use auto_import::{auto_assign_records, can_auto_assign, find_auto_assign_destination};
pub use directory_cleanup::cleanup_empty_directories;
pub use filename_parser::parse_filename;
pub use import_executor::{ImportExecutor, ImportFailure, ImportOutcome};
pub use import_scanner::{group_by_title, ImportScanner, ScanError, TitleGroup};
pub use import_undo::{undo_operation, UndoReport};
pub use series_resolver::{best_library_match, resolve, SeriesMatch};
pub use title_matcher::{normalize, similarity, AUTO_MATCH_THRESHOLD, MANUAL_MATCH_THRESHOLD};
