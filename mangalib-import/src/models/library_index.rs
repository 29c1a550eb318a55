//! Point-in-time snapshot of libraries and their series
//!
//! Loaded once per request and only read by matching code. Library mutations
//! made while a request runs are not reflected, so matches can be stale.

use mangalib_common::db::Library;
use serde::{Deserialize, Serialize};

/// A known series, used as a match candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SeriesIndexEntry {
    pub id: i64,
    pub title: String,
}

/// One library with its series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySeries {
    pub library: Library,
    pub series: Vec<SeriesIndexEntry>,
}

/// All libraries with their series, in library id order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryIndex {
    libraries: Vec<LibrarySeries>,
}

impl LibraryIndex {
    pub fn new(libraries: Vec<LibrarySeries>) -> Self {
        Self { libraries }
    }

    pub fn libraries(&self) -> &[LibrarySeries] {
        &self.libraries
    }

    pub fn library(&self, library_id: i64) -> Option<&LibrarySeries> {
        self.libraries.iter().find(|l| l.library.id == library_id)
    }
}
