// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Review dataset loading for evaluation

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// Binary review label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewLabel {
    Genuine,
    Fake,
}

impl ReviewLabel {
    /// Class index used by the classifier (0 = genuine, 1 = fake)
    pub fn class_index(&self) -> usize {
        match self {
            ReviewLabel::Genuine => 0,
            ReviewLabel::Fake => 1,
        }
    }

    pub fn from_class_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(ReviewLabel::Genuine),
            1 => Some(ReviewLabel::Fake),
            _ => None,
        }
    }
}

/// A single labelled review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSample {
    pub id: String,
    pub text: String,
    pub label: ReviewLabel,
    /// Label as written in the source file
    pub original_label: String,
}

/// Raw label values accepted for each class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelMapping {
    pub genuine: Vec<String>,
    pub fake: Vec<String>,
}

impl Default for LabelMapping {
    fn default() -> Self {
        Self {
            genuine: ["0", "or", "genuine", "real", "truthful"].iter().map(|s| s.to_string()).collect(),
            fake: ["1", "cg", "fake", "deceptive"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LabelMapping {
    /// Case-insensitive lookup; `None` for unknown values
    pub fn map_label(&self, original: &str) -> Option<ReviewLabel> {
        let original = original.trim().to_lowercase();
        if self.genuine.iter().any(|l| l.to_lowercase() == original) {
            Some(ReviewLabel::Genuine)
        } else if self.fake.iter().any(|l| l.to_lowercase() == original) {
            Some(ReviewLabel::Fake)
        } else {
            None
        }
    }
}

/// Column names in a CSV review file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvColumns {
    pub text: String,
    pub label: String,
    /// Optional id column; row numbers are used otherwise
    pub id: Option<String>,
    pub mapping: LabelMapping,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            text: "text_".to_string(),
            label: "label".to_string(),
            id: None,
            mapping: LabelMapping::default(),
        }
    }
}

/// A loaded dataset split into train/validation/test
#[derive(Debug, Clone)]
pub struct ReviewDataset {
    pub name: String,
    pub train: Vec<ReviewSample>,
    pub validation: Vec<ReviewSample>,
    pub test: Vec<ReviewSample>,
}

impl ReviewDataset {
    /// Load a CSV file with a header row.
    ///
    /// Rows are sorted by id and shuffled with `seed` before the 80/10/10 split,
    /// so the same file and seed always give the same splits.
    pub fn load_csv(path: &Path, columns: &CsvColumns, seed: u64) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open dataset file: {}", path.display()))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read header row of {}", path.display()))?
            .clone();
        let column_index = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .with_context(|| format!("Column '{}' not found in {}", name, path.display()))
        };
        let text_idx = column_index(&columns.text)?;
        let label_idx = column_index(&columns.label)?;
        let id_idx = columns.id.as_deref().map(column_index).transpose()?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "review".to_string());

        let mut samples = Vec::new();
        let mut skipped = 0usize;

        for (idx, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("Failed to read record {} in {}", idx, path.display()))?;

            let original_label = record.get(label_idx).unwrap_or("").trim().to_string();
            let Some(label) = columns.mapping.map_label(&original_label) else {
                tracing::warn!("Skipping record {} in {}: unknown label '{}'", idx, path.display(), original_label);
                skipped += 1;
                continue;
            };

            let id = match id_idx.and_then(|i| record.get(i)) {
                Some(id) if !id.trim().is_empty() => id.trim().to_string(),
                _ => format!("{}_{:08}", stem, idx),
            };

            samples.push(ReviewSample {
                id,
                text: record.get(text_idx).unwrap_or("").to_string(),
                label,
                original_label,
            });
        }

        tracing::info!(
            "Loaded {} reviews from {} ({} skipped)",
            samples.len(),
            path.display(),
            skipped
        );

        samples.sort_by(|a, b| a.id.cmp(&b.id));
        samples.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

        Ok(Self::split(stem, samples))
    }

    /// Generate a seeded synthetic dataset for development and testing
    pub fn synthetic(size: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let fake_phrases = [
            "Best product ever!!! Five stars, buy it now",
            "Amazing amazing amazing, everyone needs this",
            "Perfect in every way, I would buy ten more",
            "Life changing purchase, absolutely flawless",
            "Incredible quality, totally worth every penny!!!",
        ];

        let genuine_phrases = [
            "Works as described, although the lid is a bit loose",
            "Arrived on time. Setup took about twenty minutes",
            "Decent value for the price but the cord is short",
            "Stopped working after three months of daily use",
            "Quieter than my old one, cleaning is still tedious",
        ];

        let samples: Vec<ReviewSample> = (0..size)
            .map(|i| {
                let is_fake = rng.gen_bool(0.5);
                let phrases = if is_fake { &fake_phrases } else { &genuine_phrases };
                let phrase_idx = rng.gen_range(0..phrases.len());

                ReviewSample {
                    id: format!("synthetic_{}", i),
                    text: format!("{} (review {})", phrases[phrase_idx], i),
                    label: if is_fake { ReviewLabel::Fake } else { ReviewLabel::Genuine },
                    original_label: if is_fake { "CG".to_string() } else { "OR".to_string() },
                }
            })
            .collect();

        Self::split("synthetic".to_string(), samples)
    }

    /// Split 80/10/10 in the given order
    fn split(name: String, mut samples: Vec<ReviewSample>) -> Self {
        let n = samples.len();
        let train_end = (n as f64 * 0.8) as usize;
        let val_end = (n as f64 * 0.9) as usize;

        let test = samples.split_off(val_end);
        let validation = samples.split_off(train_end);
        let train = samples;

        Self {
            name,
            train,
            validation,
            test,
        }
    }

    pub fn total_samples(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }

    /// Samples of a named split (`train`, `validation`/`val`, `test`)
    pub fn split_by_name(&self, split: &str) -> Result<&[ReviewSample]> {
        match split {
            "train" => Ok(&self.train),
            "validation" | "val" => Ok(&self.validation),
            "test" => Ok(&self.test),
            other => anyhow::bail!("Unknown split '{}' (expected train, validation or test)", other),
        }
    }

    pub fn label_distribution(samples: &[ReviewSample]) -> BTreeMap<ReviewLabel, usize> {
        let mut dist = BTreeMap::new();
        for sample in samples {
            *dist.entry(sample.label).or_insert(0) += 1;
        }
        dist
    }
}
