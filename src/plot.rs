// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Confusion matrix rendering
//!
//! A heatmap figure that renders to SVG (annotated cells, "Blues" color ramp)
//! or to a plain-text table for terminals and markdown reports.

use crate::metrics::ConfusionMatrix;
use anyhow::{Context, Result};
use std::fmt::Display;
use std::path::Path;

/// Tick labels used for binary matrices when none are given
pub const DEFAULT_LABELS: [&str; 2] = ["Genuine", "Fake"];

const CELL: usize = 90;
const MARGIN_LEFT: usize = 130;
const MARGIN_TOP: usize = 60;
const MARGIN_BOTTOM: usize = 80;
const MARGIN_RIGHT: usize = 30;

/// Light and dark ends of the color ramp
const RAMP_LOW: (f64, f64, f64) = (247.0, 251.0, 255.0);
const RAMP_HIGH: (f64, f64, f64) = (8.0, 48.0, 107.0);

#[derive(Debug, Clone)]
pub struct ConfusionMatrixPlot<L = usize> {
    pub matrix: ConfusionMatrix<L>,
    pub labels: Vec<String>,
    pub title: String,
}

impl<L: Display> ConfusionMatrixPlot<L> {
    /// `labels` must have one entry per class when given
    pub fn new(matrix: ConfusionMatrix<L>, labels: Option<&[String]>) -> Result<Self> {
        let labels = match labels {
            Some(labels) => {
                anyhow::ensure!(
                    labels.len() == matrix.num_classes(),
                    "Expected {} labels for the confusion matrix, got {}",
                    matrix.num_classes(),
                    labels.len()
                );
                labels.to_vec()
            }
            None if matrix.num_classes() == DEFAULT_LABELS.len() => {
                DEFAULT_LABELS.iter().map(|s| s.to_string()).collect()
            }
            None => matrix.classes.iter().map(|c| c.to_string()).collect(),
        };

        Ok(Self {
            matrix,
            labels,
            title: "Confusion Matrix".to_string(),
        })
    }
}

impl<L> ConfusionMatrixPlot<L> {
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Fill color for a cell holding `count`
    fn cell_color(&self, count: usize) -> String {
        let max = self.matrix.max_count().max(1) as f64;
        let t = count as f64 / max;
        let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            lerp(RAMP_LOW.0, RAMP_HIGH.0),
            lerp(RAMP_LOW.1, RAMP_HIGH.1),
            lerp(RAMP_LOW.2, RAMP_HIGH.2)
        )
    }

    /// Render the heatmap as a standalone SVG document
    pub fn to_svg(&self) -> String {
        let n = self.matrix.num_classes();
        let grid = n * CELL;
        let width = MARGIN_LEFT + grid + MARGIN_RIGHT;
        let height = MARGIN_TOP + grid + MARGIN_BOTTOM;
        let half_max = self.matrix.max_count() as f64 / 2.0;

        let mut svg = format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="sans-serif">"##
        );
        svg.push('\n');
        svg.push_str(&format!(
            r##"<text x="{}" y="{}" text-anchor="middle" font-size="18">{}</text>"##,
            MARGIN_LEFT + grid / 2,
            MARGIN_TOP / 2,
            escape(&self.title)
        ));
        svg.push('\n');

        for (row, counts) in self.matrix.counts.iter().enumerate() {
            for (col, count) in counts.iter().enumerate() {
                let x = MARGIN_LEFT + col * CELL;
                let y = MARGIN_TOP + row * CELL;
                let text_color = if (*count as f64) > half_max { "#ffffff" } else { "#000000" };
                svg.push_str(&format!(
                    r##"<rect x="{x}" y="{y}" width="{CELL}" height="{CELL}" fill="{}" stroke="#ffffff"/>"##,
                    self.cell_color(*count)
                ));
                svg.push('\n');
                svg.push_str(&format!(
                    r##"<text x="{}" y="{}" text-anchor="middle" dominant-baseline="middle" font-size="16" fill="{text_color}">{count}</text>"##,
                    x + CELL / 2,
                    y + CELL / 2
                ));
                svg.push('\n');
            }
        }

        for (i, label) in self.labels.iter().enumerate() {
            let center = i * CELL + CELL / 2;
            svg.push_str(&format!(
                r##"<text x="{}" y="{}" text-anchor="middle" font-size="13">{}</text>"##,
                MARGIN_LEFT + center,
                MARGIN_TOP + grid + 20,
                escape(label)
            ));
            svg.push('\n');
            svg.push_str(&format!(
                r##"<text x="{}" y="{}" text-anchor="end" dominant-baseline="middle" font-size="13">{}</text>"##,
                MARGIN_LEFT - 10,
                MARGIN_TOP + center,
                escape(label)
            ));
            svg.push('\n');
        }

        svg.push_str(&format!(
            r##"<text x="{}" y="{}" text-anchor="middle" font-size="14">Predicted</text>"##,
            MARGIN_LEFT + grid / 2,
            MARGIN_TOP + grid + 55
        ));
        svg.push('\n');
        svg.push_str(&format!(
            r##"<text x="20" y="{y}" text-anchor="middle" font-size="14" transform="rotate(-90 20 {y})">True</text>"##,
            y = MARGIN_TOP + grid / 2
        ));
        svg.push('\n');
        svg.push_str("</svg>\n");
        svg
    }

    /// Render as a fixed-width text table
    pub fn to_text(&self) -> String {
        let width = self
            .labels
            .iter()
            .map(|l| l.len())
            .chain(std::iter::once(self.matrix.max_count().to_string().len()))
            .max()
            .unwrap_or(1)
            .max(6);

        let mut out = format!("{}\n", self.title);
        out.push_str(&format!("{:>w$}  Predicted\n", "", w = width));
        out.push_str(&format!("{:>w$}", "True", w = width));
        for label in &self.labels {
            out.push_str(&format!("  {:>w$}", label, w = width));
        }
        out.push('\n');

        for (label, counts) in self.labels.iter().zip(self.matrix.counts.iter()) {
            out.push_str(&format!("{:>w$}", label, w = width));
            for count in counts {
                out.push_str(&format!("  {:>w$}", count, w = width));
            }
            out.push('\n');
        }
        out
    }

    pub fn save_svg(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_svg())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Confusion matrix saved to {}", path.display());
        Ok(())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Build the confusion matrix figure for a pair of label arrays
pub fn plot_confusion_matrix<L: Ord + Clone + Display>(
    y_true: &[L],
    y_pred: &[L],
    labels: Option<&[String]>,
) -> Result<ConfusionMatrixPlot<L>> {
    let matrix = ConfusionMatrix::from_predictions(y_true, y_pred)?;
    ConfusionMatrixPlot::new(matrix, labels)
}
