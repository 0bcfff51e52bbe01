// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Fake review detection toolkit
//!
//! This crate provides:
//! - Language resource bootstrap (stopword lists, sentence tokenizer tables)
//! - Text cleaning, word tokenization and stopword removal
//! - Pretrained transformer classification (DistilBERT via candle)
//! - Evaluation metrics and confusion matrix rendering
//! - Review dataset loading and a reproducible evaluation pipeline

pub mod cleaning;
pub mod config;
pub mod datasets;
pub mod error;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod plot;
pub mod preprocessing;
pub mod resources;
pub mod stopwords;
pub mod tokenize;

pub use cleaning::clean_text;
pub use config::{CertificateVerification, ResourceConfig};
pub use datasets::{CsvColumns, LabelMapping, ReviewDataset, ReviewLabel, ReviewSample};
pub use error::{MissingResource, ResourceError};
pub use metrics::{evaluate_model, ClassificationReport, ConfusionMatrix, MetricsRecord};
pub use model::{
    load_pretrained_model, predict, ClassificationModel, Prediction, ReviewClassifier, SequenceClassifier,
    TransformerClassifier,
};
pub use pipeline::{EvaluationConfig, EvaluationPipeline, EvaluationResults};
pub use plot::{plot_confusion_matrix, ConfusionMatrixPlot};
pub use preprocessing::{Preprocessed, Preprocessor, StopwordStatus};
pub use resources::{LanguageResources, ResourceBootstrap, ResourcePackage};
pub use stopwords::{StopwordFilter, StopwordOutcome};
pub use tokenize::{word_tokenize, SentenceSplitter};
