// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Evaluation CLI for fake review detection
//!
//! Usage:
//!   review-eval --dataset synthetic --seed 42
//!   review-eval --dataset csv --path ./datasets/reviews.csv --split test

use anyhow::Result;
use clap::Parser;
use review_eval::config::ResourceConfig;
use review_eval::model::{select_device, TransformerClassifier, DEFAULT_MODEL_NAME, DEFAULT_NUM_LABELS};
use review_eval::pipeline::{EvaluationConfig, EvaluationPipeline};
use review_eval::preprocessing::Preprocessor;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "review-eval")]
#[command(about = "Evaluate a pretrained model on labelled reviews")]
#[command(version)]
struct Args {
    /// Dataset to evaluate on (synthetic, csv)
    #[arg(short, long, default_value = "synthetic")]
    dataset: String,

    /// Path to the dataset CSV file
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Model name on the Hugging Face Hub, or a local model directory
    #[arg(short, long, default_value = DEFAULT_MODEL_NAME)]
    model: String,

    /// Number of output labels
    #[arg(long, default_value_t = DEFAULT_NUM_LABELS)]
    num_labels: usize,

    /// Random seed for reproducibility
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Evaluation split (train, validation, test)
    #[arg(long, default_value = "test")]
    split: String,

    /// Language resource directory (defaults to $NLTK_DATA or ~/nltk_data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep stopwords in the model input
    #[arg(long)]
    no_stopwords: bool,

    /// Run on CPU even when a GPU is available
    #[arg(long)]
    cpu: bool,

    /// Output directory for results
    #[arg(short, long, default_value = "eval/results")]
    output: PathBuf,

    /// Output format (json, markdown, both)
    #[arg(short, long, default_value = "both")]
    format: String,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    tracing::info!("Fake Review Detection Evaluation");
    tracing::info!("================================");
    tracing::info!("Dataset: {}", args.dataset);
    tracing::info!("Model: {}", args.model);
    tracing::info!("Seed: {}", args.seed);
    tracing::info!("Split: {}", args.split);

    let resource_config = args
        .data_dir
        .map(ResourceConfig::with_data_dir)
        .unwrap_or_default();
    let preprocessor = Preprocessor::from_config(&resource_config);
    if !args.no_stopwords && !preprocessor.stopword_filter().is_available() {
        tracing::warn!(
            "Stopword list not found in {}; run setup-resources to install it",
            resource_config.data_dir.display()
        );
    }

    let config = EvaluationConfig {
        seed: args.seed,
        dataset: args.dataset.clone(),
        dataset_path: args.path.map(|p| p.to_string_lossy().to_string()),
        eval_split: args.split,
        remove_stopwords: !args.no_stopwords,
        model_name: args.model.clone(),
        num_labels: args.num_labels,
        output_dir: args.output.to_string_lossy().to_string(),
        ..EvaluationConfig::default()
    };

    let device = select_device(args.cpu)?;
    let classifier = TransformerClassifier::load(&args.model, args.num_labels, device)?;

    let mut pipeline = EvaluationPipeline::new(config, preprocessor);
    let results = pipeline.run(&classifier)?;

    // Print summary to console
    println!("\n{}", "=".repeat(70));
    println!("EVALUATION SUMMARY");
    println!("{}", "=".repeat(70));
    println!("\nModel: {}", results.model_name);
    println!("Samples: {} ({} split)", results.eval_samples, results.config.eval_split);
    println!("{:-<70}", "");
    for (name, value) in results.metrics.to_map() {
        println!("{:<15} {:>10.4}", name, value);
    }
    println!("{:-<70}", "");
    if results.preprocessing.stopword_fallbacks > 0 {
        println!(
            "Stopwords kept for {} samples (run setup-resources to install them)",
            results.preprocessing.stopword_fallbacks
        );
    }
    println!("\n{}", EvaluationPipeline::confusion_matrix_plot(&results)?.to_text());

    // Save outputs
    std::fs::create_dir_all(&args.output)?;

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");

    if args.format == "json" || args.format == "both" {
        let json_path = args.output.join(format!("eval_{}_{}.json", args.dataset, timestamp));
        EvaluationPipeline::save_results(&results, &json_path)?;
        println!("\nJSON results saved to: {}", json_path.display());
    }

    if args.format == "markdown" || args.format == "both" {
        let report = EvaluationPipeline::generate_report(&results);
        let md_path = args.output.join(format!("eval_{}_{}.md", args.dataset, timestamp));
        std::fs::write(&md_path, report)?;
        println!("Markdown report saved to: {}", md_path.display());
    }

    let svg_path = args.output.join(format!("confusion_matrix_{}_{}.svg", args.dataset, timestamp));
    EvaluationPipeline::save_confusion_matrix(&results, &svg_path)?;
    println!("Confusion matrix saved to: {}", svg_path.display());

    println!("\nEvaluation complete!");

    Ok(())
}
