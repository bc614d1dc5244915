use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

pub mod catalog;
pub mod fields;
pub mod title;

pub use catalog::{normalize_name, parse_year, CatalogRecord, MISSING_NUMBER};
pub use fields::{ItemUpdate, ScoredLabel, SourceFields, SourceQuery};
pub use title::{Emotions, ItemSnapshot, MediaItem, MediaKind, Ratings, SourceFlags, TextFields};

/// External catalog identifier of a media item (IMDB style, e.g. "tt1375666")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wraps an id, adding the "tt" prefix when the source only reports the number
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref().trim();
        if raw.starts_with("tt") {
            Self(raw.to_string())
        } else {
            Self(format!("tt{}", raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Enrichment source, each owning one completeness flag on every item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Plot, genres and credits
    Imdb,
    /// Critic consensus, scores, synopsis and reviews
    RottenTomatoes,
    /// Document emotions and category labels computed from item text
    TextAnalysis,
}

impl Source {
    /// Every source, in the order a job applies them
    pub const ALL: [Source; 3] = [Source::Imdb, Source::RottenTomatoes, Source::TextAnalysis];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Imdb => "imdb",
            Source::RottenTomatoes => "rotten_tomatoes",
            Source::TextAnalysis => "text_analysis",
        }
    }

    /// Property name of the completeness flag in the graph
    pub fn flag_property(&self) -> &'static str {
        match self {
            Source::Imdb => "imdb_data",
            Source::RottenTomatoes => "rotten_tomatoes_data",
            Source::TextAnalysis => "ibm_data",
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|source| source.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| AppError::Config(format!("Unknown enrichment source '{}'", s)))
    }
}

/// Primary catalog a media item was ingested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    Ororo,
    Mubi,
}

impl CatalogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogSource::Ororo => "ororo",
            CatalogSource::Mubi => "mubi",
        }
    }
}

impl Display for CatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ororo" => Ok(CatalogSource::Ororo),
            "mubi" => Ok(CatalogSource::Mubi),
            other => Err(AppError::Config(format!("Unknown catalog source '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_adds_prefix() {
        assert_eq!(ItemId::new("1375666").as_str(), "tt1375666");
        assert_eq!(ItemId::new("tt1375666").as_str(), "tt1375666");
        assert_eq!(ItemId::new(" 0133093 ").as_str(), "tt0133093");
    }

    #[test]
    fn test_item_id_serde_is_transparent() {
        let id = ItemId::new("tt1375666");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""tt1375666""#);
    }

    #[test]
    fn test_source_round_trips_through_name() {
        for source in Source::ALL {
            assert_eq!(source.as_str().parse::<Source>().unwrap(), source);
        }
        assert!("letterboxd".parse::<Source>().is_err());
    }

    #[test]
    fn test_flag_properties() {
        assert_eq!(Source::Imdb.flag_property(), "imdb_data");
        assert_eq!(Source::RottenTomatoes.flag_property(), "rotten_tomatoes_data");
        assert_eq!(Source::TextAnalysis.flag_property(), "ibm_data");
    }

    #[test]
    fn test_catalog_source_parse() {
        assert_eq!("Mubi".parse::<CatalogSource>().unwrap(), CatalogSource::Mubi);
        assert!("netflix".parse::<CatalogSource>().is_err());
    }
}
