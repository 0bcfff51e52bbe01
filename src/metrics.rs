// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Evaluation metrics for multi-class classification
//!
//! Implements standard ML metrics:
//! - Confusion Matrix (rows = true class, columns = predicted class)
//! - Accuracy
//! - Per-class Precision, Recall, F1-Score
//! - Support-weighted and macro averages
//!
//! Ratios with a zero denominator are reported as 0.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Confusion matrix over the classes seen in either label array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix<L = usize> {
    /// Sorted class labels; index `i` names row `i` and column `i`
    pub classes: Vec<L>,
    /// `counts[true][predicted]`
    pub counts: Vec<Vec<usize>>,
}

impl<L: Ord + Clone> ConfusionMatrix<L> {
    /// Create from ground truth and predictions
    pub fn from_predictions(y_true: &[L], y_pred: &[L]) -> Result<Self> {
        validate_inputs(y_true, y_pred)?;

        let mut classes: Vec<L> = y_true.iter().chain(y_pred.iter()).cloned().collect();
        classes.sort();
        classes.dedup();

        let index: BTreeMap<&L, usize> = classes.iter().enumerate().map(|(i, c)| (c, i)).collect();
        let mut counts = vec![vec![0usize; classes.len()]; classes.len()];

        for (truth, pred) in y_true.iter().zip(y_pred.iter()) {
            counts[index[truth]][index[pred]] += 1;
        }

        Ok(Self { classes, counts })
    }

    pub fn class_metrics(&self, idx: usize) -> ClassMetrics<L> {
        ClassMetrics {
            class: self.classes[idx].clone(),
            precision: self.precision(idx),
            recall: self.recall(idx),
            f1_score: self.f1_score(idx),
            support: self.support(idx),
        }
    }
}

impl<L> ConfusionMatrix<L> {
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Total number of samples
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Largest single cell, used for color scaling
    pub fn max_count(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }

    /// Correct predictions for the class at `idx`
    pub fn true_positives(&self, idx: usize) -> usize {
        self.counts[idx][idx]
    }

    /// Number of samples whose true class is at `idx`
    pub fn support(&self, idx: usize) -> usize {
        self.counts[idx].iter().sum()
    }

    /// Number of samples predicted as the class at `idx`
    pub fn predicted(&self, idx: usize) -> usize {
        self.counts.iter().map(|row| row[idx]).sum()
    }

    /// Accuracy: trace / total
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.num_classes()).map(|i| self.true_positives(i)).sum();
        correct as f64 / total as f64
    }

    /// Precision: TP / (TP + FP)
    pub fn precision(&self, idx: usize) -> f64 {
        ratio(self.true_positives(idx), self.predicted(idx))
    }

    /// Recall: TP / (TP + FN)
    pub fn recall(&self, idx: usize) -> f64 {
        ratio(self.true_positives(idx), self.support(idx))
    }

    /// F1 Score: 2 * (Precision * Recall) / (Precision + Recall)
    pub fn f1_score(&self, idx: usize) -> f64 {
        let precision = self.precision(idx);
        let recall = self.recall(idx);
        let denom = precision + recall;
        if denom == 0.0 {
            return 0.0;
        }
        2.0 * precision * recall / denom
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

fn validate_inputs<L>(y_true: &[L], y_pred: &[L]) -> Result<()> {
    anyhow::ensure!(
        y_true.len() == y_pred.len(),
        "Prediction and ground truth lengths must match ({} vs {})",
        y_true.len(),
        y_pred.len()
    );
    anyhow::ensure!(!y_true.is_empty(), "Cannot evaluate an empty label set");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics<L = usize> {
    pub class: L,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// The four headline metrics of an evaluation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub accuracy: f64,
    /// Support-weighted precision
    pub precision: f64,
    /// Support-weighted recall
    pub recall: f64,
    /// Support-weighted F1
    pub f1_score: f64,
}

impl MetricsRecord {
    /// Metric name -> value
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1_score", self.f1_score),
        ])
    }
}

/// Averaged precision/recall/F1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Full classification report with all metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport<L = usize> {
    pub confusion_matrix: ConfusionMatrix<L>,
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics<L>>,
    pub weighted: AveragedMetrics,
    pub macro_avg: AveragedMetrics,
    pub support: usize,
}

impl<L: Ord + Clone> ClassificationReport<L> {
    /// Generate full report from confusion matrix
    pub fn from_confusion_matrix(cm: ConfusionMatrix<L>) -> Self {
        let per_class: Vec<ClassMetrics<L>> = (0..cm.num_classes()).map(|i| cm.class_metrics(i)).collect();
        let support = cm.total();

        let weighted = {
            let weight = |m: &ClassMetrics<L>| m.support as f64 / support.max(1) as f64;
            AveragedMetrics {
                precision: per_class.iter().map(|m| m.precision * weight(m)).sum(),
                recall: per_class.iter().map(|m| m.recall * weight(m)).sum(),
                f1_score: per_class.iter().map(|m| m.f1_score * weight(m)).sum(),
            }
        };

        let n = per_class.len().max(1) as f64;
        let macro_avg = AveragedMetrics {
            precision: per_class.iter().map(|m| m.precision).sum::<f64>() / n,
            recall: per_class.iter().map(|m| m.recall).sum::<f64>() / n,
            f1_score: per_class.iter().map(|m| m.f1_score).sum::<f64>() / n,
        };

        Self {
            accuracy: cm.accuracy(),
            per_class,
            weighted,
            macro_avg,
            support,
            confusion_matrix: cm,
        }
    }

    /// Generate report from ground truth and predictions
    pub fn from_predictions(y_true: &[L], y_pred: &[L]) -> Result<Self> {
        let cm = ConfusionMatrix::from_predictions(y_true, y_pred)?;
        Ok(Self::from_confusion_matrix(cm))
    }
}

impl<L> ClassificationReport<L> {
    pub fn metrics(&self) -> MetricsRecord {
        MetricsRecord {
            accuracy: self.accuracy,
            precision: self.weighted.precision,
            recall: self.weighted.recall,
            f1_score: self.weighted.f1_score,
        }
    }

    /// Format as a human-readable string, naming classes by their `Display`
    pub fn format(&self) -> String
    where
        L: Display,
    {
        self.format_with(|class| class.to_string())
    }

    /// Format as a human-readable string with custom class names
    pub fn format_with(&self, name_of: impl Fn(&L) -> String) -> String {
        let mut output = String::from("Classification Report\n=====================\n");
        output.push_str(&format!(
            "{:<14} {:>10} {:>10} {:>10} {:>10}\n",
            "", "precision", "recall", "f1-score", "support"
        ));
        for m in &self.per_class {
            output.push_str(&format!(
                "{:<14} {:>10.4} {:>10.4} {:>10.4} {:>10}\n",
                name_of(&m.class),
                m.precision,
                m.recall,
                m.f1_score,
                m.support
            ));
        }
        output.push('\n');
        output.push_str(&format!(
            "{:<14} {:>10} {:>10} {:>10.4} {:>10}\n",
            "accuracy", "", "", self.accuracy, self.support
        ));
        for (label, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted)] {
            output.push_str(&format!(
                "{:<14} {:>10.4} {:>10.4} {:>10.4} {:>10}\n",
                label, avg.precision, avg.recall, avg.f1_score, self.support
            ));
        }

        output
    }
}

/// Accuracy plus support-weighted precision, recall and F1
pub fn evaluate_model<L: Ord + Clone>(y_true: &[L], y_pred: &[L]) -> Result<MetricsRecord> {
    Ok(ClassificationReport::from_predictions(y_true, y_pred)?.metrics())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_evaluate_reference_case() {
        let metrics = evaluate_model(&[1, 0, 1, 1], &[1, 0, 0, 1]).unwrap();

        assert!(close(metrics.accuracy, 0.75));
        assert!(close(metrics.precision, 0.875));
        assert!(close(metrics.recall, 0.75));
        // (2/3 * 1 + 4/5 * 3) / 4
        assert!(close(metrics.f1_score, 0.7666666667));

        let map = metrics.to_map();
        assert_eq!(map.len(), 4);
        assert!(close(map["accuracy"], 0.75));
        assert!(map.contains_key("f1_score"));
    }

    #[test]
    fn test_confusion_matrix_layout() {
        let cm = ConfusionMatrix::from_predictions(&[1, 0, 1, 1], &[1, 0, 0, 1]).unwrap();

        assert_eq!(cm.classes, vec![0, 1]);
        assert_eq!(cm.counts, vec![vec![1, 0], vec![1, 2]]);
        assert_eq!(cm.total(), 4);
        assert_eq!(cm.max_count(), 2);
        assert_eq!(cm.support(1), 3);
        assert_eq!(cm.predicted(0), 2);
    }

    #[test]
    fn test_perfect_predictions() {
        let report = ClassificationReport::from_predictions(&[0, 1, 2, 2], &[0, 1, 2, 2]).unwrap();

        assert!(close(report.accuracy, 1.0));
        assert!(close(report.weighted.f1_score, 1.0));
        assert!(close(report.macro_avg.precision, 1.0));
        assert_eq!(report.per_class.len(), 3);
    }

    #[test]
    fn test_class_only_in_predictions() {
        // Class 2 is never true: its support is 0 and its precision 0
        let report = ClassificationReport::from_predictions(&[0, 0, 1, 1], &[0, 2, 1, 1]).unwrap();

        assert_eq!(report.confusion_matrix.classes, vec![0, 1, 2]);
        let class2 = &report.per_class[2];
        assert_eq!(class2.support, 0);
        assert!(close(class2.precision, 0.0));
        assert!(close(class2.f1_score, 0.0));

        // Weighted averages ignore zero-support classes
        assert!(close(report.weighted.recall, 0.75));
        assert!(close(report.weighted.precision, 1.0));
    }

    #[test]
    fn test_never_predicted_class_scores_zero() {
        let metrics = evaluate_model(&[0, 1, 1, 1], &[1, 1, 1, 1]).unwrap();

        assert!(close(metrics.accuracy, 0.75));
        // Class 0: P=0, R=0; class 1: P=0.75, R=1
        assert!(close(metrics.precision, 0.5625));
        assert!(close(metrics.recall, 0.75));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(evaluate_model::<usize>(&[], &[]).is_err());
        assert!(evaluate_model(&[0, 1], &[0]).is_err());
    }

    #[test]
    fn test_classification_report_format() {
        let report = ClassificationReport::from_predictions(&[1usize, 0, 1, 1], &[1, 0, 0, 1]).unwrap();
        let names = ["Genuine", "Fake"];
        let formatted = report.format_with(|class| names[*class].to_string());

        assert!(formatted.contains("Classification Report"));
        assert!(formatted.contains("Genuine"));
        assert!(formatted.contains("weighted avg"));
        assert!(formatted.contains("0.7500"));

        let plain = report.format();
        assert!(plain.lines().any(|l| l.trim_start().starts_with("1 ")));
    }

    #[test]
    fn test_string_labels() {
        let y_true = ["fake", "real", "fake", "fake"];
        let y_pred = ["fake", "real", "real", "fake"];

        let metrics = evaluate_model(&y_true, &y_pred).unwrap();
        assert!(close(metrics.accuracy, 0.75));
        assert!(close(metrics.precision, 0.875));

        let cm = ConfusionMatrix::from_predictions(&y_true, &y_pred).unwrap();
        assert_eq!(cm.classes, vec!["fake", "real"]);
        assert_eq!(cm.counts, vec![vec![2, 1], vec![0, 1]]);
    }
}
