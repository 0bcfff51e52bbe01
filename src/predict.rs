// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Single review classifier
//!
//! Preprocesses one review and prints the predicted class with its confidence

use anyhow::Result;
use clap::Parser;
use review_eval::config::ResourceConfig;
use review_eval::model::{select_device, ReviewClassifier, TransformerClassifier, DEFAULT_MODEL_NAME, DEFAULT_NUM_LABELS};
use review_eval::pipeline::class_name;
use review_eval::preprocessing::Preprocessor;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "predict-review")]
#[command(about = "Classify a single review")]
#[command(version)]
struct Args {
    /// Review text to classify
    #[arg(short, long)]
    text: String,

    /// Model name on the Hugging Face Hub, or a local model directory
    #[arg(short, long, default_value = DEFAULT_MODEL_NAME)]
    model: String,

    /// Number of output labels
    #[arg(long, default_value_t = DEFAULT_NUM_LABELS)]
    num_labels: usize,

    /// Language resource directory (defaults to $NLTK_DATA or ~/nltk_data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep stopwords in the model input
    #[arg(long)]
    no_stopwords: bool,

    /// Run on CPU even when a GPU is available
    #[arg(long)]
    cpu: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

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
    let processed = preprocessor.preprocess(&args.text, !args.no_stopwords);
    tracing::info!("Preprocessed text: {:?}", processed.text);

    let device = select_device(args.cpu)?;
    let classifier = TransformerClassifier::load(&args.model, args.num_labels, device)?;
    let prediction = classifier.classify(&processed.text)?;

    println!("\n## {} ##", classifier.name());
    println!("{}", "-".repeat(50));
    println!("Input:      {}", args.text);
    println!("Processed:  {}", processed.text);
    if processed.is_degraded() {
        println!("            (stopwords kept: language resources missing)");
    }
    println!("Prediction: {} (class {})", class_name(prediction.class), prediction.class);
    println!("Confidence: {:.2}%", prediction.confidence * 100.0);
    for (class, probability) in prediction.probabilities.iter().enumerate() {
        println!("  {:<10} {:.4}", class_name(class), probability);
    }

    Ok(())
}
