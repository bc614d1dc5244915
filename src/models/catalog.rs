use serde::{Deserialize, Serialize};

use super::{CatalogSource, ItemId, MediaKind};

/// Stored in place of absent or unparsable numeric fields
pub const MISSING_NUMBER: i64 = -1;

/// A primary catalog record, normalized and ready to be merged into the graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogRecord {
    pub id: ItemId,
    pub slug: String,
    pub title: String,
    pub year: i64,
    pub kind: MediaKind,
    pub origin: CatalogSource,
    /// `MISSING_NUMBER` when the catalog has no rating
    pub imdb_rating: f64,
    /// Runtime in minutes, `MISSING_NUMBER` when unknown
    pub length: i64,
    pub description: Option<String>,
    pub link: String,
    pub poster: Option<String>,
    pub popularity: Option<i64>,
    pub still_average_colour: Option<String>,
    pub genres: Vec<String>,
    pub countries: Vec<String>,
}

/// Canonical form of a shared entity name (genre, person, country, category)
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Parses a release year such as "2010" or "2011-2014"
///
/// Falls back to `MISSING_NUMBER`.
pub fn parse_year(raw: Option<&str>) -> i64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return MISSING_NUMBER;
    };

    raw.parse::<i64>()
        .or_else(|_| {
            raw.split('-')
                .next()
                .unwrap_or_default()
                .trim()
                .parse::<i64>()
        })
        .unwrap_or(MISSING_NUMBER)
}

/// Parses an optional numeric field, falling back to `MISSING_NUMBER`
pub fn parse_number(raw: Option<&str>) -> f64 {
    raw.map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(MISSING_NUMBER as f64)
}

/// Deduplicates names after normalization, preserving first-seen order
pub fn unique_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for name in names.into_iter().map(normalize_name) {
        if !name.is_empty() && !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}
