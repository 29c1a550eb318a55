//! Import records and their destinations
//!
//! An [`ImportRecord`] is one file discovered in the import root. Its
//! destination is a tagged variant: either an existing series of a library or
//! a series to be created at execution time.

use serde::{Deserialize, Serialize};

/// Group title used when a filename yields no title
pub const UNTITLED: &str = "Untitled";

/// Structured data extracted from a filename
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedFilename {
    #[serde(default)]
    pub title: Option<String>,
    /// `None` means no volume number was found (distinct from volume 0)
    #[serde(default)]
    pub volume: Option<u32>,
    #[serde(default)]
    pub part_number: Option<u32>,
    #[serde(default)]
    pub part_name: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub resolution: Option<String>,
    /// Lowercase extension
    #[serde(default)]
    pub format: String,
}

impl ParsedFilename {
    /// Title used for grouping: the parsed title, or [`UNTITLED`]
    pub fn group_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(UNTITLED)
    }
}

/// Series side of a destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesTarget {
    /// Series already known to the library
    Existing { series_id: i64, series_title: String },
    /// Series created by the executor
    New { series_title: String },
}

impl SeriesTarget {
    pub fn title(&self) -> &str {
        match self {
            SeriesTarget::Existing { series_title, .. } | SeriesTarget::New { series_title } => {
                series_title
            }
        }
    }

    pub fn series_id(&self) -> Option<i64> {
        match self {
            SeriesTarget::Existing { series_id, .. } => Some(*series_id),
            SeriesTarget::New { .. } => None,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, SeriesTarget::New { .. })
    }
}

/// Resolved target for one or more import records
///
/// Serialized in the flat `{library_id, library_name, library_path,
/// series_id, series_title, is_new_series}` shape clients already use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DestinationWire", into = "DestinationWire")]
pub struct Destination {
    pub library_id: i64,
    pub library_name: String,
    pub library_path: String,
    pub series: SeriesTarget,
}

impl Destination {
    pub fn series_title(&self) -> &str {
        self.series.title()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DestinationWire {
    library_id: i64,
    #[serde(default)]
    library_name: String,
    library_path: String,
    #[serde(default)]
    series_id: Option<i64>,
    series_title: String,
    #[serde(default)]
    is_new_series: bool,
}

impl TryFrom<DestinationWire> for Destination {
    type Error = String;

    fn try_from(wire: DestinationWire) -> Result<Self, Self::Error> {
        if wire.series_title.trim().is_empty() {
            return Err("destination series_title must not be empty".to_string());
        }

        let series = match (wire.is_new_series, wire.series_id) {
            (true, _) => SeriesTarget::New {
                series_title: wire.series_title,
            },
            (false, Some(series_id)) => SeriesTarget::Existing {
                series_id,
                series_title: wire.series_title,
            },
            (false, None) => {
                return Err(
                    "destination without series_id must set is_new_series".to_string(),
                )
            }
        };

        Ok(Destination {
            library_id: wire.library_id,
            library_name: wire.library_name,
            library_path: wire.library_path,
            series,
        })
    }
}

impl From<Destination> for DestinationWire {
    fn from(dest: Destination) -> Self {
        let is_new_series = dest.series.is_new();
        let series_id = dest.series.series_id();
        let series_title = match dest.series {
            SeriesTarget::Existing { series_title, .. } | SeriesTarget::New { series_title } => {
                series_title
            }
        };

        DestinationWire {
            library_id: dest.library_id,
            library_name: dest.library_name,
            library_path: dest.library_path,
            series_id,
            series_title,
            is_new_series,
        }
    }
}

/// One discovered file pending import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub filename: String,
    /// Path relative to the import root, forward slashes
    pub relative_path: String,
    pub file_size: u64,
    #[serde(default)]
    pub parsed: ParsedFilename,
    #[serde(default)]
    pub destination: Option<Destination>,
}

impl ImportRecord {
    pub fn new(filename: String, relative_path: String, file_size: u64, parsed: ParsedFilename) -> Self {
        Self {
            filename,
            relative_path,
            file_size,
            parsed,
            destination: None,
        }
    }

    pub fn group_title(&self) -> &str {
        self.parsed.group_title()
    }

    pub fn is_assigned(&self) -> bool {
        self.destination.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_existing_destination_wire_shape() {
        let dest = Destination {
            library_id: 1,
            library_name: "Shonen".to_string(),
            library_path: "/lib/shonen".to_string(),
            series: SeriesTarget::Existing {
                series_id: 7,
                series_title: "One Piece".to_string(),
            },
        };

        let value = serde_json::to_value(&dest).unwrap();
        assert_eq!(value["series_id"], json!(7));
        assert_eq!(value["is_new_series"], json!(false));
        assert_eq!(value["series_title"], json!("One Piece"));
    }

    #[test]
    fn test_new_series_destination_from_wire() {
        let dest: Destination = serde_json::from_value(json!({
            "library_id": 2,
            "library_name": "Seinen",
            "library_path": "/lib/seinen",
            "series_id": null,
            "series_title": "Vinland Saga",
            "is_new_series": true
        }))
        .unwrap();

        assert_eq!(
            dest.series,
            SeriesTarget::New {
                series_title: "Vinland Saga".to_string()
            }
        );
    }

    #[test]
    fn test_missing_series_id_rejected() {
        let result: Result<Destination, _> = serde_json::from_value(json!({
            "library_id": 2,
            "library_path": "/lib/seinen",
            "series_title": "Vinland Saga",
            "is_new_series": false
        }));

        assert!(result.is_err());
    }

    #[test]
    fn test_group_title_fallback() {
        let parsed = ParsedFilename {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(parsed.group_title(), UNTITLED);
        assert_eq!(ParsedFilename::default().group_title(), UNTITLED);
    }
}
