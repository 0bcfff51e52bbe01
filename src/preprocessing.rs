// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Full text preprocessing: cleaning followed by optional stopword removal

use crate::cleaning::clean_text;
use crate::config::ResourceConfig;
use crate::error::MissingResource;
use crate::stopwords::{StopwordFilter, StopwordOutcome};
use serde::{Deserialize, Serialize};

/// What happened to stopwords during preprocessing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopwordStatus {
    Removed,
    Skipped,
    Fallback(MissingResource),
}

/// Preprocessed text plus the stopword status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub text: String,
    pub stopwords: StopwordStatus,
}

impl Preprocessed {
    pub fn is_degraded(&self) -> bool {
        matches!(self.stopwords, StopwordStatus::Fallback(_))
    }
}

#[derive(Debug, Clone)]
pub struct Preprocessor {
    filter: StopwordFilter,
}

impl Preprocessor {
    pub fn new(filter: StopwordFilter) -> Self {
        Self { filter }
    }

    pub fn from_config(config: &ResourceConfig) -> Self {
        Self::new(StopwordFilter::from_config(config))
    }

    pub fn stopword_filter(&self) -> &StopwordFilter {
        &self.filter
    }

    /// Clean `text`, then remove stopwords when `remove_stops` is set.
    ///
    /// Stopword membership relies on the lowercased, punctuation-free output
    /// of the cleaner, so the order is fixed.
    pub fn preprocess(&self, text: &str, remove_stops: bool) -> Preprocessed {
        let cleaned = clean_text(text);

        if !remove_stops {
            return Preprocessed {
                text: cleaned,
                stopwords: StopwordStatus::Skipped,
            };
        }

        match self.filter.remove_stopwords(&cleaned) {
            StopwordOutcome::Filtered(text) => Preprocessed {
                text,
                stopwords: StopwordStatus::Removed,
            },
            StopwordOutcome::Fallback { text, missing } => Preprocessed {
                text,
                stopwords: StopwordStatus::Fallback(missing),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::tests::write_fixture_resources;
    use crate::resources::LanguageResources;
    use tempfile::TempDir;

    fn preprocessor() -> Preprocessor {
        Preprocessor::new(StopwordFilter::new(Ok(LanguageResources::from_parts(
            ["the", "is", "a", "this", "it", "i", "very", "and"],
            Vec::<String>::new(),
        ))))
    }

    #[test]
    fn test_preprocess_removes_case_punctuation_and_stopwords() {
        let result = preprocessor().preprocess("The Quick, Brown FOX!", true);
        assert_eq!(result.text, "quick brown fox");
        assert_eq!(result.stopwords, StopwordStatus::Removed);
        assert!(!result.is_degraded());
    }

    #[test]
    fn test_preprocess_without_stopword_removal() {
        let result = preprocessor().preprocess("The Quick, Brown FOX!", false);
        assert_eq!(result.text, "the quick brown fox");
        assert_eq!(result.stopwords, StopwordStatus::Skipped);
    }

    #[test]
    fn test_preprocess_review_with_markup() {
        let result = preprocessor().preprocess(
            "<p>This is THE best blender!!!</p> Buy at https://deals.example.com/x now",
            true,
        );
        assert_eq!(result.text, "best blender buy at now");
    }

    #[test]
    fn test_preprocess_falls_back_without_resources() {
        let dir = TempDir::new().unwrap();
        let preprocessor = Preprocessor::from_config(&ResourceConfig::with_data_dir(dir.path()));

        assert!(!preprocessor.stopword_filter().is_available());

        let result = preprocessor.preprocess("The Quick, Brown FOX!", true);
        assert_eq!(result.text, "the quick brown fox");
        assert!(result.is_degraded());
    }

    #[test]
    fn test_preprocess_with_installed_resources() {
        let dir = TempDir::new().unwrap();
        write_fixture_resources(dir.path());
        let preprocessor = Preprocessor::from_config(&ResourceConfig::with_data_dir(dir.path()));
        assert!(preprocessor.stopword_filter().is_stopword("this"));

        let result = preprocessor.preprocess("I can NOT recommend this. It was awful!", true);
        assert_eq!(result.text, "recommend awful");
        assert_eq!(result.stopwords, StopwordStatus::Removed);
    }
}
