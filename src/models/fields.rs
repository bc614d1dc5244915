use serde::{Deserialize, Serialize};

use super::{Emotions, ItemId, MediaItem, Ratings};

/// Key a source uses to look an item up, built from fields already on the item
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuery {
    pub id: ItemId,
    pub slug: String,
    pub title: String,
    pub year: i64,
    /// Concatenated item text, `None` when the item has none
    pub text: Option<String>,
}

impl SourceQuery {
    pub fn for_item(item: &MediaItem) -> Self {
        Self {
            id: item.id.clone(),
            slug: item.slug.clone(),
            title: item.title.clone(),
            year: item.year,
            text: item.text.analysis_text(),
        }
    }
}

/// Scalar fields a source writes onto the item. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemUpdate {
    pub plot: Option<String>,
    pub synopsis: Option<String>,
    pub consensus: Option<String>,
    pub reviews: Option<String>,
    pub ratings: Ratings,
    pub emotions: Emotions,
}

/// Category label path with the source's confidence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredLabel {
    /// Slash-delimited path, e.g. "/art and entertainment/movies and tv/movies"
    pub label: String,
    pub score: f64,
}

impl ScoredLabel {
    /// Path segments, trimmed and lower-cased, empty segments dropped
    pub fn segments(&self) -> Vec<String> {
        self.label
            .split('/')
            .map(super::normalize_name)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Everything one successful fetch yields
///
/// Sources fill what their response carries; missing parts stay empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFields {
    pub update: ItemUpdate,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub directors: Vec<String>,
    pub categories: Vec<ScoredLabel>,
}
