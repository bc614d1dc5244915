use serde::{Deserialize, Serialize};

use super::{ItemId, Source};

/// Movie or show
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movies",
            MediaKind::Show => "shows",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "shows" | "show" | "series" => MediaKind::Show,
            _ => MediaKind::Movie,
        }
    }
}

/// Named ratings; each one may be absent
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Ratings {
    pub imdb_rating: Option<f64>,
    pub critics_rating: Option<f64>,
    pub critics_score: Option<f64>,
    pub audience_score: Option<f64>,
}

/// Document emotion intensities in [0, 1]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Emotions {
    pub joy: Option<f64>,
    pub sadness: Option<f64>,
    pub anger: Option<f64>,
    pub fear: Option<f64>,
    pub disgust: Option<f64>,
}

impl Emotions {
    /// Stores a score by emotion name; unknown names are ignored
    pub fn set(&mut self, name: &str, score: f64) {
        let slot = match name.trim().to_lowercase().as_str() {
            "joy" => &mut self.joy,
            "sadness" => &mut self.sadness,
            "anger" => &mut self.anger,
            "fear" => &mut self.fear,
            "disgust" => &mut self.disgust,
            _ => return,
        };
        *slot = Some(score);
    }
}

/// Free-text fields gathered from all sources
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextFields {
    pub plot: Option<String>,
    pub description: Option<String>,
    pub synopsis: Option<String>,
    pub consensus: Option<String>,
    pub reviews: Option<String>,
}

impl TextFields {
    /// Fields that make up an item's document for the text model, in order
    pub fn document_fields(&self) -> [Option<&str>; 4] {
        [
            self.plot.as_deref(),
            self.description.as_deref(),
            self.synopsis.as_deref(),
            self.consensus.as_deref(),
        ]
    }

    /// Every non-empty field joined with ". ", as sent to text analysis
    pub fn analysis_text(&self) -> Option<String> {
        let parts: Vec<&str> = [
            self.plot.as_deref(),
            self.description.as_deref(),
            self.synopsis.as_deref(),
            self.reviews.as_deref(),
            self.consensus.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(". "))
        }
    }
}

/// One completeness flag per enrichment source. Flags only ever go false → true.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceFlags {
    pub imdb: bool,
    pub rotten_tomatoes: bool,
    pub text_analysis: bool,
}

impl SourceFlags {
    pub fn get(&self, source: Source) -> bool {
        match source {
            Source::Imdb => self.imdb,
            Source::RottenTomatoes => self.rotten_tomatoes,
            Source::TextAnalysis => self.text_analysis,
        }
    }

    pub fn mark_complete(&mut self, source: Source) {
        match source {
            Source::Imdb => self.imdb = true,
            Source::RottenTomatoes => self.rotten_tomatoes = true,
            Source::TextAnalysis => self.text_analysis = true,
        }
    }

    /// Sources among `enabled` still waiting for data
    pub fn missing(&self, enabled: &[Source]) -> Vec<Source> {
        enabled.iter().copied().filter(|s| !self.get(*s)).collect()
    }
}

/// A movie or show node as stored in the graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    pub id: ItemId,
    pub slug: String,
    pub title: String,
    pub year: i64,
    pub kind: MediaKind,
    pub ratings: Ratings,
    pub emotions: Emotions,
    pub text: TextFields,
    pub flags: SourceFlags,
}

/// Item plus the shared entities the correlation model needs
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSnapshot {
    pub item: MediaItem,
    pub genres: Vec<String>,
    pub categories: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_parse() {
        assert_eq!(MediaKind::parse("shows"), MediaKind::Show);
        assert_eq!(MediaKind::parse("movies"), MediaKind::Movie);
        assert_eq!(MediaKind::parse("anything"), MediaKind::Movie);
    }

    #[test]
    fn test_emotions_set_by_name() {
        let mut emotions = Emotions::default();
        emotions.set("Joy", 0.6);
        emotions.set(" fear ", 0.1);
        emotions.set("boredom", 0.9);

        assert_eq!(emotions.joy, Some(0.6));
        assert_eq!(emotions.fear, Some(0.1));
        assert_eq!(emotions.sadness, None);
    }

    #[test]
    fn test_analysis_text_skips_empty_fields() {
        let text = TextFields {
            plot: Some("A heist inside dreams".to_string()),
            description: Some("  ".to_string()),
            consensus: Some("Smart and thrilling".to_string()),
            ..Default::default()
        };

        assert_eq!(
            text.analysis_text().as_deref(),
            Some("A heist inside dreams. Smart and thrilling")
        );
        assert_eq!(TextFields::default().analysis_text(), None);
    }

    #[test]
    fn test_flags_missing() {
        let mut flags = SourceFlags::default();
        flags.mark_complete(Source::Imdb);

        assert_eq!(
            flags.missing(&Source::ALL),
            vec![Source::RottenTomatoes, Source::TextAnalysis]
        );
        assert!(flags.get(Source::Imdb));
    }
}
