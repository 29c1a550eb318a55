//! Destination assignment
//!
//! Manual, group and automatic assignment all resolve a [`Destination`] and
//! apply it through [`ImportSession::assign_one`]. Manual assignment of one
//! file always wins; group and automatic assignment only fill records that
//! have no destination yet.

use crate::error::{ImportError, ImportResult};
use crate::models::{Destination, ImportSession, LibraryIndex, LibrarySeries, SeriesTarget};
use crate::services::series_resolver::{best_library_match, resolve};
use std::collections::HashMap;

/// Series picked by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesChoice {
    /// A series id of the target library
    Existing(i64),
    /// A name resolved against the library, or a new series
    Named(String),
}

impl SeriesChoice {
    /// Build from the optional `series_id` / `series_name` request fields
    ///
    /// An id takes precedence over a name.
    pub fn from_request(series_id: Option<i64>, series_name: Option<&str>) -> ImportResult<Self> {
        match (series_id, series_name.map(str::trim)) {
            (Some(id), _) => Ok(SeriesChoice::Existing(id)),
            (None, Some(name)) if !name.is_empty() => Ok(SeriesChoice::Named(name.to_string())),
            _ => Err(ImportError::InvalidInput(
                "series_id or a non-empty series_name is required".to_string(),
            )),
        }
    }
}

pub(crate) fn destination_for(library: &LibrarySeries, series: SeriesTarget) -> Destination {
    Destination {
        library_id: library.library.id,
        library_name: library.library.name.clone(),
        library_path: library.library.path.clone(),
        series,
    }
}

/// Resolve a user choice within one library
pub fn resolve_destination(
    index: &LibraryIndex,
    library_id: i64,
    choice: &SeriesChoice,
) -> ImportResult<Destination> {
    let library = index
        .library(library_id)
        .ok_or(ImportError::LibraryNotFound(library_id))?;

    let series = match choice {
        SeriesChoice::Existing(series_id) => {
            let entry = library
                .series
                .iter()
                .find(|s| s.id == *series_id)
                .ok_or(ImportError::SeriesNotFound(*series_id))?;
            SeriesTarget::Existing {
                series_id: entry.id,
                series_title: entry.title.clone(),
            }
        }
        SeriesChoice::Named(name) => {
            let name = name.trim();
            if name.is_empty() {
                return Err(ImportError::InvalidInput(
                    "series name must not be empty".to_string(),
                ));
            }
            match resolve(&library.series, name) {
                Some(found) => SeriesTarget::Existing {
                    series_id: found.entry.id,
                    series_title: found.entry.title.clone(),
                },
                None => SeriesTarget::New {
                    series_title: name.to_string(),
                },
            }
        }
    };

    Ok(destination_for(library, series))
}

/// Assign one file, replacing whatever it had
pub fn assign_file(
    session: &mut ImportSession,
    index: &LibraryIndex,
    record_index: usize,
    library_id: i64,
    choice: &SeriesChoice,
) -> ImportResult<Destination> {
    session.record(record_index)?;
    let destination = resolve_destination(index, library_id, choice)?;
    session.assign_one(record_index, destination.clone())?;

    tracing::debug!(
        session_id = %session.session_id,
        record_index,
        series = destination.series_title(),
        "Assigned file"
    );
    Ok(destination)
}

/// Assign every unassigned file of a title group; returns how many changed
pub fn assign_group(
    session: &mut ImportSession,
    index: &LibraryIndex,
    title: &str,
    library_id: i64,
    choice: &SeriesChoice,
) -> ImportResult<usize> {
    let destination = resolve_destination(index, library_id, choice)?;

    let targets: Vec<usize> = session
        .indices_for_title(title)
        .into_iter()
        .filter(|&i| session.records()[i].destination.is_none())
        .collect();

    for &i in &targets {
        session.assign_one(i, destination.clone())?;
    }

    tracing::info!(
        session_id = %session.session_id,
        group = title,
        assigned = targets.len(),
        series = destination.series_title(),
        new_series = destination.series.is_new(),
        "Assigned group"
    );
    Ok(targets.len())
}

/// Match every unassigned file against all libraries
///
/// Only existing series are assigned; titles without a good enough match
/// stay unassigned. Returns the number of files assigned.
pub fn auto_match_all(session: &mut ImportSession, index: &LibraryIndex) -> ImportResult<usize> {
    let mut by_title: HashMap<String, Option<Destination>> = HashMap::new();
    let mut assigned = 0;

    for i in 0..session.len() {
        let record = session.record(i)?;
        if record.is_assigned() {
            continue;
        }

        let title = record.group_title().to_string();
        let destination = by_title
            .entry(title)
            .or_insert_with_key(|title| {
                best_library_match(index, title).map(|(library, found)| {
                    destination_for(
                        library,
                        SeriesTarget::Existing {
                            series_id: found.entry.id,
                            series_title: found.entry.title.clone(),
                        },
                    )
                })
            })
            .clone();

        if let Some(destination) = destination {
            session.assign_one(i, destination)?;
            assigned += 1;
        }
    }

    tracing::info!(
        session_id = %session.session_id,
        assigned,
        unmatched_titles = by_title.values().filter(|d| d.is_none()).count(),
        "Auto-match complete"
    );
    Ok(assigned)
}

/// Clear one file's destination; returns whether it had one
pub fn remove_destination(session: &mut ImportSession, record_index: usize) -> ImportResult<bool> {
    Ok(session.clear_destination(record_index)?.is_some())
}

/// Clear the destinations of a whole title group; returns how many were set
pub fn remove_group_destination(session: &mut ImportSession, title: &str) -> ImportResult<usize> {
    let mut removed = 0;
    for i in session.indices_for_title(title) {
        if session.clear_destination(i)?.is_some() {
            removed += 1;
        }
    }
    Ok(removed)
}
