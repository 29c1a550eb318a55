//! Database row models

use serde::{Deserialize, Serialize};

/// A library: a root directory whose direct subdirectories are series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Library {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub description: Option<String>,
}

/// A series row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Series {
    pub id: i64,
    pub library_id: i64,
    pub title: String,
    pub path: Option<String>,
    pub total_volumes: i64,
    /// JSON array of missing volume numbers
    pub missing_volumes: String,
    pub has_parts: bool,
}

/// A volume row (one file of a series)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Volume {
    pub id: i64,
    pub series_id: i64,
    pub part_number: Option<i64>,
    pub part_name: Option<String>,
    pub volume_number: Option<i64>,
    pub filename: String,
    pub filepath: String,
    pub author: Option<String>,
    pub year: Option<i64>,
    pub resolution: Option<String>,
    pub file_size: i64,
    pub page_count: Option<i64>,
    pub format: Option<String>,
}
