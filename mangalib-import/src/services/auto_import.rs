//! Unattended assignment for auto-import
//!
//! Stricter than auto-match: a file qualifies only with both a title and a
//! volume number, and its title must equal an existing series title ignoring
//! case. No fuzzy scoring, no new series. Libraries are searched in id order
//! and the first equal title wins.

use crate::models::{Destination, ImportRecord, LibraryIndex, ParsedFilename, SeriesTarget, UNTITLED};
use crate::services::assignment::destination_for;
use std::collections::HashMap;

/// Whether a parsed filename carries enough to be placed without review
pub fn can_auto_assign(parsed: &ParsedFilename) -> bool {
    let has_title = parsed
        .title
        .as_deref()
        .map(str::trim)
        .is_some_and(|t| !t.is_empty() && t != UNTITLED);
    has_title && parsed.volume.is_some()
}

/// Existing series whose title equals `title`, ignoring case
pub fn find_auto_assign_destination(index: &LibraryIndex, title: &str) -> Option<Destination> {
    let wanted = title.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    index.libraries().iter().find_map(|library| {
        library
            .series
            .iter()
            .find(|s| s.title.trim().to_lowercase() == wanted)
            .map(|entry| {
                destination_for(
                    library,
                    SeriesTarget::Existing {
                        series_id: entry.id,
                        series_title: entry.title.clone(),
                    },
                )
            })
    })
}

/// Assign every qualifying record, returning only the assigned ones
pub fn auto_assign_records(records: Vec<ImportRecord>, index: &LibraryIndex) -> Vec<ImportRecord> {
    let mut by_title: HashMap<String, Option<Destination>> = HashMap::new();

    records
        .into_iter()
        .filter(|record| can_auto_assign(&record.parsed))
        .filter_map(|mut record| {
            let destination = by_title
                .entry(record.group_title().to_string())
                .or_insert_with_key(|title| find_auto_assign_destination(index, title))
                .clone()?;
            record.destination = Some(destination);
            Some(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LibrarySeries, SeriesIndexEntry};
    use mangalib_common::db::Library;

    fn library(id: i64, name: &str, series: &[(i64, &str)]) -> LibrarySeries {
        LibrarySeries {
            library: Library {
                id,
                name: name.to_string(),
                path: format!("/lib/{}", name.to_lowercase()),
                description: None,
            },
            series: series
                .iter()
                .map(|&(id, title)| SeriesIndexEntry {
                    id,
                    title: title.to_string(),
                })
                .collect(),
        }
    }

    fn record(title: Option<&str>, volume: Option<u32>) -> ImportRecord {
        let name = format!("{} {:?}.cbz", title.unwrap_or("x"), volume);
        ImportRecord::new(
            name.clone(),
            name,
            10,
            ParsedFilename {
                title: title.map(str::to_string),
                volume,
                format: "cbz".to_string(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_title_and_volume_required() {
        assert!(can_auto_assign(&record(Some("Naruto"), Some(1)).parsed));
        assert!(!can_auto_assign(&record(Some("Naruto"), None).parsed));
        assert!(!can_auto_assign(&record(None, Some(1)).parsed));
        assert!(!can_auto_assign(&record(Some("  "), Some(1)).parsed));
        assert!(!can_auto_assign(&record(Some(UNTITLED), Some(1)).parsed));
    }

    #[test]
    fn test_exact_title_ignoring_case() {
        let index = LibraryIndex::new(vec![
            library(1, "Shonen", &[(10, "One Piece")]),
            library(2, "Seinen", &[(20, "Berserk")]),
        ]);

        let found = find_auto_assign_destination(&index, "berserk").unwrap();
        assert_eq!(found.library_id, 2);
        assert_eq!(found.series.series_id(), Some(20));
        assert_eq!(found.series_title(), "Berserk");

        // Close is not enough
        assert!(find_auto_assign_destination(&index, "OnePiece").is_none());
        assert!(find_auto_assign_destination(&index, "One Piece Party").is_none());
    }

    #[test]
    fn test_first_library_wins_on_shared_title() {
        let index = LibraryIndex::new(vec![
            library(1, "Shonen", &[(10, "Monster")]),
            library(2, "Seinen", &[(20, "Monster")]),
        ]);

        let found = find_auto_assign_destination(&index, "MONSTER").unwrap();
        assert_eq!(found.library_id, 1);
        assert_eq!(found.series.series_id(), Some(10));
    }

    #[test]
    fn test_only_matched_records_are_kept() {
        let index = LibraryIndex::new(vec![library(1, "Shonen", &[(10, "Naruto")])]);
        let records = vec![
            record(Some("naruto"), Some(1)),
            record(Some("Naruto"), None),
            record(Some("Bleach"), Some(2)),
            record(Some("NARUTO"), Some(3)),
        ];

        let assigned = auto_assign_records(records, &index);
        assert_eq!(assigned.len(), 2);
        assert!(assigned.iter().all(|r| {
            r.destination.as_ref().and_then(|d| d.series.series_id()) == Some(10)
        }));
        assert_eq!(assigned[1].parsed.volume, Some(3));
    }
}
