use std::collections::HashSet;

use rust_stemmers::{Algorithm, Stemmer};

use crate::models::TextFields;

use super::stopwords;

/// Builds an item's document: present, non-empty text fields, lower-cased,
/// joined with ". "
pub fn document(text: &TextFields) -> String {
    text.document_fields()
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(". ")
}

/// Splits text into stemmed alphanumeric terms
pub struct Tokenizer {
    stemmer: Stemmer,
    stop_words: HashSet<String>,
}

impl Tokenizer {
    pub fn english() -> Self {
        let stemmer = Stemmer::create(Algorithm::English);
        // Terms are compared after stemming, so stems of the list count too.
        let stop_words = stopwords::ENGLISH
            .iter()
            .flat_map(|w| [w.to_string(), stemmer.stem(w).into_owned()])
            .collect();

        Self { stemmer, stop_words }
    }

    pub fn tokens(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| self.stemmer.stem(&t.to_lowercase()).into_owned())
            .collect()
    }

    pub fn is_stop_word(&self, term: &str) -> bool {
        self.stop_words.contains(term)
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::english()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_joins_present_fields_in_order() {
        let text = TextFields {
            plot: Some("A Thief".to_string()),
            description: None,
            synopsis: Some(" ".to_string()),
            consensus: Some("Mind-Bending".to_string()),
            reviews: Some("ignored".to_string()),
        };

        assert_eq!(document(&text), "a thief. mind-bending");
        assert_eq!(document(&TextFields::default()), "");
    }

    #[test]
    fn test_tokens_are_stemmed_alphanumeric_runs() {
        let tokenizer = Tokenizer::english();

        assert_eq!(
            tokenizer.tokens("Running dreams, 2 heists!"),
            vec!["run", "dream", "2", "heist"]
        );
    }

    #[test]
    fn test_stop_words() {
        let tokenizer = Tokenizer::english();

        assert!(tokenizer.is_stop_word("the"));
        assert!(tokenizer.is_stop_word("and"));
        assert!(!tokenizer.is_stop_word("dream"));
    }
}
