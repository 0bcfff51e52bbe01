// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Reproducible evaluation pipeline for fake review detection
//!
//! Orchestrates:
//! - Dataset loading
//! - Preprocessing (cleaning and stopword removal)
//! - Classification with a pretrained model
//! - Metrics computation
//! - Results serialization and reporting

use crate::datasets::{CsvColumns, ReviewDataset, ReviewLabel, ReviewSample};
use crate::metrics::{ClassificationReport, MetricsRecord};
use crate::model::{ReviewClassifier, DEFAULT_MODEL_NAME, DEFAULT_NUM_LABELS};
use crate::plot::ConfusionMatrixPlot;
use crate::preprocessing::{Preprocessor, StopwordStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Predictions kept per outcome (correct/incorrect) for inspection
const SAMPLES_PER_OUTCOME: usize = 10;

/// Configuration for the evaluation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Random seed for dataset generation and shuffling
    pub seed: u64,
    /// Dataset to evaluate on ("synthetic" or "csv")
    pub dataset: String,
    /// Path to the dataset file (required for "csv")
    pub dataset_path: Option<String>,
    /// Number of generated reviews for the synthetic dataset
    pub synthetic_size: usize,
    /// Which split to evaluate on ("test", "validation", "train")
    pub eval_split: String,
    pub remove_stopwords: bool,
    pub model_name: String,
    pub num_labels: usize,
    /// Output directory for results
    pub output_dir: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            dataset: "synthetic".to_string(),
            dataset_path: None,
            synthetic_size: 1000,
            eval_split: "test".to_string(),
            remove_stopwords: true,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            num_labels: DEFAULT_NUM_LABELS,
            output_dir: "eval/results".to_string(),
        }
    }
}

/// A sample prediction for inspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionSample {
    pub id: String,
    pub text_preview: String,
    pub processed_preview: String,
    pub predicted: String,
    pub actual: String,
    pub confidence: f64,
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub name: String,
    pub total_samples: usize,
    pub train_samples: usize,
    pub validation_samples: usize,
    pub test_samples: usize,
    /// Label counts in the evaluated split
    pub label_distribution: BTreeMap<String, usize>,
}

/// How preprocessing went over the evaluated split
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessingSummary {
    pub remove_stopwords: bool,
    pub stopwords_removed: usize,
    /// Samples whose stopwords were kept because resources were missing
    pub stopword_fallbacks: usize,
    /// Samples with no text left after preprocessing
    pub empty_texts: usize,
}

/// Complete evaluation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResults {
    pub config: EvaluationConfig,
    pub dataset_info: DatasetInfo,
    pub model_name: String,
    pub eval_samples: usize,
    pub metrics: MetricsRecord,
    pub report: ClassificationReport,
    pub preprocessing: PreprocessingSummary,
    pub predictions_sample: Vec<PredictionSample>,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Display name of a class index
pub fn class_name(class: usize) -> String {
    match ReviewLabel::from_class_index(class) {
        Some(ReviewLabel::Genuine) => "Genuine".to_string(),
        Some(ReviewLabel::Fake) => "Fake".to_string(),
        None => format!("class {}", class),
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// Main evaluation pipeline
pub struct EvaluationPipeline {
    config: EvaluationConfig,
    preprocessor: Preprocessor,
    dataset: Option<ReviewDataset>,
}

impl EvaluationPipeline {
    pub fn new(config: EvaluationConfig, preprocessor: Preprocessor) -> Self {
        Self {
            config,
            preprocessor,
            dataset: None,
        }
    }

    /// Evaluate on an already loaded dataset
    pub fn with_dataset(mut self, dataset: ReviewDataset) -> Self {
        self.dataset = Some(dataset);
        self
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Load dataset based on configuration
    pub fn load_dataset(&mut self) -> Result<()> {
        let dataset = match self.config.dataset.as_str() {
            "synthetic" => {
                tracing::info!("Loading synthetic dataset with seed {}", self.config.seed);
                ReviewDataset::synthetic(self.config.synthetic_size, self.config.seed)
            }
            "csv" => {
                let path = self
                    .config
                    .dataset_path
                    .as_deref()
                    .context("The csv dataset requires a dataset path")?;
                tracing::info!("Loading CSV dataset from {}", path);
                ReviewDataset::load_csv(Path::new(path), &CsvColumns::default(), self.config.seed)?
            }
            other => anyhow::bail!("Unknown dataset '{}' (expected synthetic or csv)", other),
        };

        tracing::info!(
            "Dataset loaded: {} samples (train={}, val={}, test={})",
            dataset.total_samples(),
            dataset.train.len(),
            dataset.validation.len(),
            dataset.test.len()
        );

        self.dataset = Some(dataset);
        Ok(())
    }

    /// Run the full evaluation with `classifier`
    pub fn run(&mut self, classifier: &dyn ReviewClassifier) -> Result<EvaluationResults> {
        if self.dataset.is_none() {
            self.load_dataset()?;
        }
        let dataset = self.dataset.as_ref().context("Dataset not loaded")?;
        let eval_samples = dataset.split_by_name(&self.config.eval_split)?;
        anyhow::ensure!(
            !eval_samples.is_empty(),
            "The '{}' split of {} is empty",
            self.config.eval_split,
            dataset.name
        );

        let dataset_info = DatasetInfo {
            name: dataset.name.clone(),
            total_samples: dataset.total_samples(),
            train_samples: dataset.train.len(),
            validation_samples: dataset.validation.len(),
            test_samples: dataset.test.len(),
            label_distribution: ReviewDataset::label_distribution(eval_samples)
                .iter()
                .map(|(k, v)| (format!("{:?}", k), *v))
                .collect(),
        };

        tracing::info!(
            "Evaluating {} on {} {} samples",
            classifier.name(),
            eval_samples.len(),
            self.config.eval_split
        );

        let mut summary = PreprocessingSummary {
            remove_stopwords: self.config.remove_stopwords,
            ..Default::default()
        };
        let mut y_true = Vec::with_capacity(eval_samples.len());
        let mut y_pred = Vec::with_capacity(eval_samples.len());
        let mut predictions_sample = Vec::new();
        let (mut errors, mut corrects) = (0, 0);

        for sample in eval_samples {
            let processed = self.preprocessor.preprocess(&sample.text, self.config.remove_stopwords);
            match processed.stopwords {
                StopwordStatus::Removed => summary.stopwords_removed += 1,
                StopwordStatus::Fallback(_) => summary.stopword_fallbacks += 1,
                StopwordStatus::Skipped => {}
            }
            if processed.text.is_empty() {
                summary.empty_texts += 1;
            }

            let prediction = classifier
                .classify(&processed.text)
                .with_context(|| format!("Failed to classify sample {}", sample.id))?;

            let actual = sample.label.class_index();
            let correct = prediction.class == actual;
            if (correct && corrects < SAMPLES_PER_OUTCOME) || (!correct && errors < SAMPLES_PER_OUTCOME) {
                predictions_sample.push(Self::prediction_sample(sample, &processed.text, prediction.class, prediction.confidence, correct));
                if correct {
                    corrects += 1;
                } else {
                    errors += 1;
                }
            }

            y_true.push(actual);
            y_pred.push(prediction.class);
        }

        if summary.stopword_fallbacks > 0 {
            tracing::warn!(
                "Stopwords were kept for {} of {} samples (language resources missing)",
                summary.stopword_fallbacks,
                eval_samples.len()
            );
        }

        let report = ClassificationReport::from_predictions(&y_true, &y_pred)?;
        let metrics = report.metrics();

        tracing::info!(
            "  {} - Accuracy: {:.4}, Precision: {:.4}, Recall: {:.4}, F1: {:.4}",
            classifier.name(),
            metrics.accuracy,
            metrics.precision,
            metrics.recall,
            metrics.f1_score
        );

        Ok(EvaluationResults {
            config: self.config.clone(),
            dataset_info,
            model_name: classifier.name().to_string(),
            eval_samples: eval_samples.len(),
            metrics,
            report,
            preprocessing: summary,
            predictions_sample,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    fn prediction_sample(
        sample: &ReviewSample,
        processed: &str,
        predicted: usize,
        confidence: f32,
        correct: bool,
    ) -> PredictionSample {
        PredictionSample {
            id: sample.id.clone(),
            text_preview: preview(&sample.text, 100),
            processed_preview: preview(processed, 100),
            predicted: class_name(predicted),
            actual: class_name(sample.label.class_index()),
            confidence: f64::from(confidence),
            correct,
        }
    }

    /// Save results to JSON file
    pub fn save_results(results: &EvaluationResults, output_path: &Path) -> Result<()> {
        std::fs::create_dir_all(output_path.parent().unwrap_or(Path::new(".")))?;
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        tracing::info!("Results saved to {}", output_path.display());
        Ok(())
    }

    /// Confusion matrix figure with class names as tick labels
    pub fn confusion_matrix_plot(results: &EvaluationResults) -> Result<ConfusionMatrixPlot> {
        let matrix = results.report.confusion_matrix.clone();
        let labels: Vec<String> = matrix.classes.iter().map(|c| class_name(*c)).collect();
        Ok(ConfusionMatrixPlot::new(matrix, Some(&labels))?
            .with_title(&format!("Confusion Matrix ({})", results.model_name)))
    }

    pub fn save_confusion_matrix(results: &EvaluationResults, output_path: &Path) -> Result<()> {
        Self::confusion_matrix_plot(results)?.save_svg(output_path)
    }

    /// Generate a markdown report
    pub fn generate_report(results: &EvaluationResults) -> String {
        let mut report = String::new();

        report.push_str("# Fake Review Detection Evaluation Report\n\n");
        report.push_str(&format!("**Generated:** {}\n\n", results.timestamp.format("%Y-%m-%d %H:%M:%S UTC")));
        report.push_str(&format!("**Version:** {}\n\n", results.version));
        report.push_str(&format!("**Model:** {}\n\n", results.model_name));

        report.push_str("## Dataset\n\n");
        report.push_str(&format!("- **Name:** {}\n", results.dataset_info.name));
        report.push_str(&format!("- **Total Samples:** {}\n", results.dataset_info.total_samples));
        report.push_str(&format!(
            "- **Split Sizes:** Train={}, Val={}, Test={}\n",
            results.dataset_info.train_samples,
            results.dataset_info.validation_samples,
            results.dataset_info.test_samples
        ));
        report.push_str(&format!(
            "- **Eval Split:** {} ({} samples)\n",
            results.config.eval_split, results.eval_samples
        ));
        for (label, count) in &results.dataset_info.label_distribution {
            report.push_str(&format!("  - {}: {}\n", label, count));
        }
        report.push('\n');

        report.push_str("## Preprocessing\n\n");
        let p = &results.preprocessing;
        report.push_str(&format!("- Stopword removal: {}\n", if p.remove_stopwords { "enabled" } else { "disabled" }));
        report.push_str(&format!("- Stopwords removed: {} samples\n", p.stopwords_removed));
        report.push_str(&format!("- Stopword fallbacks: {} samples\n", p.stopword_fallbacks));
        report.push_str(&format!("- Empty after preprocessing: {} samples\n\n", p.empty_texts));

        report.push_str("## Metrics\n\n");
        report.push_str("| Metric | Value |\n");
        report.push_str("|--------|-------|\n");
        for (name, value) in results.metrics.to_map() {
            report.push_str(&format!("| {} | {:.4} |\n", name, value));
        }
        report.push('\n');

        report.push_str("### Classification Report\n\n");
        report.push_str(&format!(
            "```\n{}```\n\n",
            results.report.format_with(|class| class_name(*class))
        ));

        if let Ok(plot) = Self::confusion_matrix_plot(results) {
            report.push_str("### Confusion Matrix\n\n");
            report.push_str(&format!("```\n{}```\n\n", plot.to_text()));
        }

        if !results.predictions_sample.is_empty() {
            report.push_str("## Sample Predictions\n\n");
            report.push_str("| ID | Actual | Predicted | Confidence | Text |\n");
            report.push_str("|----|--------|-----------|------------|------|\n");
            for sample in &results.predictions_sample {
                report.push_str(&format!(
                    "| {} | {} | {} | {:.2}% | {} |\n",
                    sample.id,
                    sample.actual,
                    sample.predicted,
                    sample.confidence * 100.0,
                    sample.text_preview.replace('|', "\\|").replace('\n', " ")
                ));
            }
            report.push('\n');
        }

        report.push_str("## Configuration\n\n");
        report.push_str(&format!("```json\n{}\n```\n", serde_json::to_string_pretty(&results.config).unwrap_or_default()));

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Prediction;
    use crate::resources::LanguageResources;
    use crate::stopwords::StopwordFilter;
    use crate::config::ResourceConfig;
    use tempfile::TempDir;

    /// Flags hype words as fake
    struct KeywordClassifier;

    impl ReviewClassifier for KeywordClassifier {
        fn name(&self) -> &str {
            "keyword"
        }

        fn classify(&self, text: &str) -> Result<Prediction> {
            let hype = ["best", "amazing", "perfect", "flawless", "incredible"];
            let fake = text.split_whitespace().any(|w| hype.contains(&w));
            let class = usize::from(fake);
            let mut probabilities = vec![0.1, 0.1];
            probabilities[class] = 0.9;
            Ok(Prediction {
                class,
                confidence: 0.9,
                probabilities,
            })
        }
    }

    struct FailingClassifier;

    impl ReviewClassifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        fn classify(&self, _text: &str) -> Result<Prediction> {
            anyhow::bail!("model unavailable")
        }
    }

    fn preprocessor() -> Preprocessor {
        Preprocessor::new(StopwordFilter::new(Ok(LanguageResources::from_parts(
            ["the", "is", "a", "an", "in", "of", "it", "my", "on", "than", "but"],
            Vec::<String>::new(),
        ))))
    }

    #[test]
    fn test_pipeline_synthetic() {
        let mut pipeline = EvaluationPipeline::new(EvaluationConfig::default(), preprocessor());
        let results = pipeline.run(&KeywordClassifier).expect("Pipeline should succeed");

        assert_eq!(results.eval_samples, 100);
        assert_eq!(results.model_name, "keyword");
        assert!((results.metrics.accuracy - 1.0).abs() < 1e-9);
        assert!((results.metrics.f1_score - 1.0).abs() < 1e-9);
        assert_eq!(results.preprocessing.stopwords_removed, 100);
        assert_eq!(results.preprocessing.stopword_fallbacks, 0);
        assert!(results.predictions_sample.len() <= 2 * SAMPLES_PER_OUTCOME);
        assert!(results.predictions_sample.iter().all(|s| s.correct));
    }

    #[test]
    fn test_pipeline_counts_stopword_fallbacks() {
        let dir = TempDir::new().unwrap();
        let preprocessor = Preprocessor::from_config(&ResourceConfig::with_data_dir(dir.path()));
        let config = EvaluationConfig {
            synthetic_size: 50,
            eval_split: "validation".to_string(),
            ..EvaluationConfig::default()
        };

        let results = EvaluationPipeline::new(config, preprocessor)
            .run(&KeywordClassifier)
            .unwrap();

        assert_eq!(results.eval_samples, 5);
        assert_eq!(results.preprocessing.stopword_fallbacks, 5);
        assert_eq!(results.preprocessing.stopwords_removed, 0);
    }

    #[test]
    fn test_pipeline_propagates_classifier_errors() {
        let mut pipeline = EvaluationPipeline::new(EvaluationConfig::default(), preprocessor());
        let err = pipeline.run(&FailingClassifier).unwrap_err();
        assert!(err.to_string().contains("Failed to classify sample"));
    }

    #[test]
    fn test_preloaded_dataset_skips_loading() {
        let dataset = ReviewDataset::synthetic(30, 5);
        let test_len = dataset.test.len();
        // No dataset path: loading from config would fail
        let config = EvaluationConfig {
            dataset: "csv".to_string(),
            ..EvaluationConfig::default()
        };

        let results = EvaluationPipeline::new(config, preprocessor())
            .with_dataset(dataset)
            .run(&KeywordClassifier)
            .unwrap();

        assert_eq!(results.eval_samples, test_len);
        assert_eq!(results.dataset_info.total_samples, 30);
    }

    #[test]
    fn test_csv_dataset_requires_path() {
        let config = EvaluationConfig {
            dataset: "csv".to_string(),
            ..EvaluationConfig::default()
        };
        let mut pipeline = EvaluationPipeline::new(config, preprocessor());
        assert!(pipeline.load_dataset().is_err());
    }

    #[test]
    fn test_unknown_split() {
        let config = EvaluationConfig {
            eval_split: "holdout".to_string(),
            ..EvaluationConfig::default()
        };
        let mut pipeline = EvaluationPipeline::new(config, preprocessor());
        assert!(pipeline.run(&KeywordClassifier).is_err());
    }

    #[test]
    fn test_generate_report_and_outputs() {
        let mut pipeline = EvaluationPipeline::new(EvaluationConfig::default(), preprocessor());
        let results = pipeline.run(&KeywordClassifier).unwrap();

        let report = EvaluationPipeline::generate_report(&results);
        assert!(report.contains("Fake Review Detection Evaluation Report"));
        assert!(report.contains("| accuracy | 1.0000 |"));
        assert!(report.contains("Classification Report"));
        assert!(report.contains("Confusion Matrix"));
        assert!(report.contains("Genuine"));
        assert!(report.contains("Confusion Matrix (keyword)"));

        let dir = TempDir::new().unwrap();
        let json_path = dir.path().join("out/results.json");
        EvaluationPipeline::save_results(&results, &json_path).unwrap();
        let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(saved["model_name"], "keyword");
        assert_eq!(saved["eval_samples"], 100);

        let svg_path = dir.path().join("out/confusion_matrix.svg");
        EvaluationPipeline::save_confusion_matrix(&results, &svg_path).unwrap();
        assert!(std::fs::read_to_string(&svg_path).unwrap().contains("Fake"));
    }
}
