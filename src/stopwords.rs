// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Stopword filtering
//!
//! The filter needs the stopword list and the sentence tokenizer tables. When
//! they could not be loaded it passes text through unchanged and reports a
//! [`StopwordOutcome::Fallback`] instead of failing.

use crate::config::ResourceConfig;
use crate::error::{MissingResource, ResourceError};
use crate::resources::LanguageResources;
use crate::tokenize::{word_tokenize, SentenceSplitter};
use std::collections::HashSet;

/// Result of a stopword removal call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopwordOutcome {
    /// Stopwords removed
    Filtered(String),
    /// Resources unavailable; `text` is the input unchanged
    Fallback { text: String, missing: MissingResource },
}

impl StopwordOutcome {
    pub fn text(&self) -> &str {
        match self {
            StopwordOutcome::Filtered(text) => text,
            StopwordOutcome::Fallback { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            StopwordOutcome::Filtered(text) => text,
            StopwordOutcome::Fallback { text, .. } => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StopwordOutcome::Fallback { .. })
    }
}

#[derive(Debug, Clone)]
enum FilterState {
    Ready {
        stopwords: HashSet<String>,
        splitter: SentenceSplitter,
    },
    Unavailable(MissingResource),
}

/// Removes English stopwords from text
#[derive(Debug, Clone)]
pub struct StopwordFilter {
    state: FilterState,
}

impl StopwordFilter {
    /// Build from the outcome of loading language resources
    pub fn new(resources: Result<LanguageResources, ResourceError>) -> Self {
        let state = match resources {
            Ok(resources) => FilterState::Ready {
                splitter: SentenceSplitter::from_resources(&resources),
                stopwords: resources.stopwords().clone(),
            },
            Err(err) => {
                tracing::warn!("Stopword filtering unavailable: {}", err);
                FilterState::Unavailable(err.as_missing())
            }
        };
        Self { state }
    }

    /// Load resources from the configured data directory
    pub fn from_config(config: &ResourceConfig) -> Self {
        Self::new(LanguageResources::load(config))
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, FilterState::Ready { .. })
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        match &self.state {
            FilterState::Ready { stopwords, .. } => stopwords.contains(token),
            FilterState::Unavailable(_) => false,
        }
    }

    /// Tokenize `text` and drop tokens found in the stopword set.
    ///
    /// Membership is exact and case-sensitive against the (lowercased) set,
    /// so input is expected to be cleaned first.
    pub fn remove_stopwords(&self, text: &str) -> StopwordOutcome {
        match &self.state {
            FilterState::Ready { stopwords, splitter } => {
                let filtered: Vec<String> = word_tokenize(text, splitter)
                    .into_iter()
                    .filter(|token| !stopwords.contains(token))
                    .collect();
                StopwordOutcome::Filtered(filtered.join(" "))
            }
            FilterState::Unavailable(missing) => {
                tracing::warn!("Skipping stopword removal, {}", missing);
                StopwordOutcome::Fallback {
                    text: text.to_string(),
                    missing: missing.clone(),
                }
            }
        }
    }
}
