//! Series resolution against the library index
//!
//! Two entry points with different thresholds: [`resolve`] for a name the
//! user typed (strict, may yield "new series") and [`best_library_match`] for
//! automatic matching across every library (looser, never creates series).

use crate::models::{LibraryIndex, LibrarySeries, SeriesIndexEntry};
use crate::services::title_matcher::{
    normalize, similarity, AUTO_MATCH_THRESHOLD, MANUAL_MATCH_THRESHOLD, PERFECT_SCORE,
};

/// A resolved series with the score that selected it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesMatch<'a> {
    pub entry: &'a SeriesIndexEntry,
    pub score: f64,
    /// True when the normalized titles are equal
    pub exact: bool,
}

/// Resolve a candidate title within one library's series
///
/// The first exact normalized match in index order wins. Otherwise the best
/// scoring entry at or above [`MANUAL_MATCH_THRESHOLD`] is returned; ties keep
/// the earlier entry. `None` means the caller should create a new series.
pub fn resolve<'a>(series: &'a [SeriesIndexEntry], candidate: &str) -> Option<SeriesMatch<'a>> {
    let normalized = normalize(candidate);

    if let Some(entry) = series.iter().find(|e| normalize(&e.title) == normalized) {
        return Some(SeriesMatch {
            entry,
            score: PERFECT_SCORE,
            exact: true,
        });
    }

    let mut best: Option<SeriesMatch<'a>> = None;
    for entry in series {
        let score = similarity(&normalized, &entry.title);
        if score >= MANUAL_MATCH_THRESHOLD && best.map_or(true, |b| score > b.score) {
            best = Some(SeriesMatch {
                entry,
                score,
                exact: false,
            });
        }
    }

    best
}

/// Best (library, series) pair across all libraries for a title
///
/// Scans libraries and series in index order, stopping at the first perfect
/// score. Returns the pair only if it reaches [`AUTO_MATCH_THRESHOLD`].
pub fn best_library_match<'a>(
    index: &'a LibraryIndex,
    title: &str,
) -> Option<(&'a LibrarySeries, SeriesMatch<'a>)> {
    let normalized = normalize(title);
    let mut best: Option<(&'a LibrarySeries, SeriesMatch<'a>)> = None;

    'libraries: for library in index.libraries() {
        for entry in &library.series {
            let score = similarity(&normalized, &entry.title);
            if best.map_or(true, |(_, b)| score > b.score) {
                best = Some((
                    library,
                    SeriesMatch {
                        entry,
                        score,
                        exact: score >= PERFECT_SCORE,
                    },
                ));
            }
            if score >= PERFECT_SCORE {
                break 'libraries;
            }
        }
    }

    best.filter(|(_, m)| m.score >= AUTO_MATCH_THRESHOLD)
}
