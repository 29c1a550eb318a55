//! In-memory import sessions
//!
//! A session owns the records found by one scan. Records live in a flat list
//! whose indices never change, so clients can address a record by index for
//! the lifetime of the session. Groups and stats are recomputed on demand.

use crate::error::ImportError;
use crate::models::import_record::{Destination, ImportRecord};
use crate::services::import_scanner::{group_by_title, TitleGroup};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Sessions keyed by id, shared through `AppState`
pub type SessionStore = Arc<RwLock<HashMap<Uuid, ImportSession>>>;

/// Records of one scan plus their assignment state
#[derive(Debug, Clone)]
pub struct ImportSession {
    pub session_id: Uuid,
    pub import_path: PathBuf,
    pub created_at: DateTime<Utc>,
    records: Vec<ImportRecord>,
}

/// Aggregate view of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total_files: usize,
    pub assigned_files: usize,
    pub unassigned_files: usize,
    pub group_count: usize,
    /// Assigned files whose series does not exist yet
    pub new_series_files: usize,
    pub total_size: u64,
}

impl ImportSession {
    pub fn new(import_path: PathBuf, records: Vec<ImportRecord>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            import_path,
            created_at: Utc::now(),
            records,
        }
    }

    pub fn records(&self) -> &[ImportRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, index: usize) -> Result<&ImportRecord, ImportError> {
        self.records
            .get(index)
            .ok_or(ImportError::RecordNotFound(index))
    }

    /// Set the destination of one record, replacing any previous one
    ///
    /// Every assignment path goes through here.
    pub fn assign_one(&mut self, index: usize, destination: Destination) -> Result<(), ImportError> {
        let record = self
            .records
            .get_mut(index)
            .ok_or(ImportError::RecordNotFound(index))?;
        record.destination = Some(destination);
        Ok(())
    }

    /// Clear the destination of one record, returning the old one
    pub fn clear_destination(&mut self, index: usize) -> Result<Option<Destination>, ImportError> {
        let record = self
            .records
            .get_mut(index)
            .ok_or(ImportError::RecordNotFound(index))?;
        Ok(record.destination.take())
    }

    /// Indices of records whose group title is `title`
    pub fn indices_for_title(&self, title: &str) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.group_title() == title)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn groups(&self) -> Vec<TitleGroup> {
        group_by_title(&self.records)
    }

    pub fn stats(&self) -> SessionStats {
        let assigned_files = self.records.iter().filter(|r| r.is_assigned()).count();
        let new_series_files = self
            .records
            .iter()
            .filter_map(|r| r.destination.as_ref())
            .filter(|d| d.series.is_new())
            .count();

        SessionStats {
            total_files: self.records.len(),
            assigned_files,
            unassigned_files: self.records.len() - assigned_files,
            group_count: self.groups().len(),
            new_series_files,
            total_size: self.records.iter().map(|r| r.file_size).sum(),
        }
    }

    /// Consume the session, yielding its records for execution
    pub fn into_records(self) -> Vec<ImportRecord> {
        self.records
    }
}
