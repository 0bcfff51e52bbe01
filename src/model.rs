// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Pretrained sequence classification models
//!
//! Models and tokenizers are resolved by name from the Hugging Face Hub
//! (or from a local directory holding `config.json`, `tokenizer.json` and
//! `model.safetensors`) and run with candle. Inference is single-example and
//! blocking.

use anyhow::{Context, Result};
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{linear, Linear, Module, VarBuilder, VarMap};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

pub const DEFAULT_MODEL_NAME: &str = "distilbert-base-uncased";
pub const DEFAULT_NUM_LABELS: usize = 2;
/// Longest token sequence fed to the model
pub const MAX_SEQUENCE_LENGTH: usize = 512;

/// A model producing one row of class logits per input sequence
pub trait SequenceClassifier {
    fn num_labels(&self) -> usize;

    /// `input_ids`: `[batch, seq]` u32. `padding_mask`: `[batch, seq]` u8,
    /// 1 at padded positions. Returns `[batch, num_labels]` logits.
    fn logits(&self, input_ids: &Tensor, padding_mask: &Tensor) -> candle_core::Result<Tensor>;
}

/// Classifier output for one text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class: usize,
    /// Probability of `class`
    pub confidence: f32,
    /// Softmax over all classes
    pub probabilities: Vec<f32>,
}

/// Anything that turns review text into a prediction
pub trait ReviewClassifier {
    fn name(&self) -> &str;

    fn classify(&self, text: &str) -> Result<Prediction>;
}

/// DistilBERT encoder with the standard classification head
pub struct DistilBertClassifier {
    encoder: DistilBertModel,
    pre_classifier: Linear,
    classifier: Linear,
    num_labels: usize,
}

impl DistilBertClassifier {
    /// Load encoder weights from `vb`. A checkpoint without a classification
    /// head gets a freshly initialized one, which needs fine-tuning before
    /// its predictions mean anything.
    pub fn load(vb: VarBuilder, config: &DistilBertConfig, dim: usize, num_labels: usize) -> Result<Self> {
        let encoder = DistilBertModel::load(vb.clone(), config).context("Failed to load DistilBERT encoder")?;

        let has_head = vb.contains_tensor("pre_classifier.weight") && vb.contains_tensor("classifier.weight");
        let (pre_classifier, classifier) = if has_head {
            (
                linear(dim, dim, vb.pp("pre_classifier"))?,
                linear(dim, num_labels, vb.pp("classifier"))
                    .context("Checkpoint classifier does not match the requested number of labels")?,
            )
        } else {
            tracing::warn!(
                "Checkpoint has no classification head; initializing {} new output labels",
                num_labels
            );
            let varmap = VarMap::new();
            let head_vb = VarBuilder::from_varmap(&varmap, vb.dtype(), vb.device());
            (
                linear(dim, dim, head_vb.pp("pre_classifier"))?,
                linear(dim, num_labels, head_vb.pp("classifier"))?,
            )
        };

        Ok(Self {
            encoder,
            pre_classifier,
            classifier,
            num_labels,
        })
    }
}

impl SequenceClassifier for DistilBertClassifier {
    fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn logits(&self, input_ids: &Tensor, padding_mask: &Tensor) -> candle_core::Result<Tensor> {
        let hidden = self.encoder.forward(input_ids, padding_mask)?;
        // First token ([CLS]) summarizes the sequence
        let pooled = hidden.i((.., 0))?;
        let pooled = self.pre_classifier.forward(&pooled)?.relu()?;
        self.classifier.forward(&pooled)
    }
}

/// Supported architectures
pub enum ClassificationModel {
    DistilBert(DistilBertClassifier),
}

impl SequenceClassifier for ClassificationModel {
    fn num_labels(&self) -> usize {
        match self {
            ClassificationModel::DistilBert(model) => model.num_labels(),
        }
    }

    fn logits(&self, input_ids: &Tensor, padding_mask: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            ClassificationModel::DistilBert(model) => model.logits(input_ids, padding_mask),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArchitectureHeader {
    model_type: Option<String>,
    dim: Option<usize>,
}

/// Files making up a pretrained checkpoint
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config: dir.join("config.json"),
            tokenizer: dir.join("tokenizer.json"),
            weights: dir.join("model.safetensors"),
        }
    }

    /// Resolve `model_name` as a local directory or a Hub repository id
    pub fn resolve(model_name: &str) -> Result<Self> {
        let local = Path::new(model_name);
        if local.is_dir() {
            tracing::info!("Loading model from local directory {}", local.display());
            return Ok(Self::in_dir(local));
        }

        tracing::info!("Resolving model '{}' from the Hugging Face Hub", model_name);
        let api = hf_hub::api::sync::Api::new().context("Failed to initialize Hugging Face Hub client")?;
        let repo = api.model(model_name.to_string());
        let fetch = |file: &str| {
            repo.get(file)
                .with_context(|| format!("Failed to fetch {} for model '{}'", file, model_name))
        };

        Ok(Self {
            config: fetch("config.json")?,
            tokenizer: fetch("tokenizer.json")?,
            weights: fetch("model.safetensors")?,
        })
    }
}

/// Apply the truncation and padding used for inference
pub fn configure_tokenizer(tokenizer: &mut Tokenizer, max_length: usize) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {e}"))?;
    tokenizer.with_padding(Some(PaddingParams::default()));
    Ok(())
}

/// Load a pretrained classifier and its tokenizer by name
pub fn load_pretrained_model(
    model_name: &str,
    num_labels: usize,
    device: &Device,
) -> Result<(ClassificationModel, Tokenizer)> {
    let files = ModelFiles::resolve(model_name)?;
    load_from_files(&files, num_labels, device)
}

pub fn load_from_files(files: &ModelFiles, num_labels: usize, device: &Device) -> Result<(ClassificationModel, Tokenizer)> {
    anyhow::ensure!(num_labels > 0, "num_labels must be at least 1");

    let config_json = std::fs::read_to_string(&files.config)
        .with_context(|| format!("Failed to read {}", files.config.display()))?;
    let header: ArchitectureHeader =
        serde_json::from_str(&config_json).context("Malformed model config.json")?;

    let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
        .map_err(|e| anyhow::anyhow!("Failed to load tokenizer {}: {e}", files.tokenizer.display()))?;
    configure_tokenizer(&mut tokenizer, MAX_SEQUENCE_LENGTH)?;

    let model = match header.model_type.as_deref() {
        Some("distilbert") => {
            let config: DistilBertConfig =
                serde_json::from_str(&config_json).context("Malformed DistilBERT config")?;
            let dim = header.dim.context("DistilBERT config.json is missing 'dim'")?;
            let weights = std::fs::read(&files.weights)
                .with_context(|| format!("Failed to read weights {}", files.weights.display()))?;
            let vb = VarBuilder::from_buffered_safetensors(weights, DType::F32, device)?;
            ClassificationModel::DistilBert(DistilBertClassifier::load(vb, &config, dim, num_labels)?)
        }
        other => anyhow::bail!(
            "Unsupported model type {:?} in {} (supported: distilbert)",
            other,
            files.config.display()
        ),
    };

    tracing::info!("Model loaded with {} output labels", num_labels);
    Ok((model, tokenizer))
}

/// Classify a single text
pub fn predict<M: SequenceClassifier + ?Sized>(
    model: &M,
    tokenizer: &Tokenizer,
    text: &str,
    device: &Device,
) -> Result<Prediction> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow::anyhow!("Tokenization failed: {e}"))?;

    let len = encoding.get_ids().len().min(MAX_SEQUENCE_LENGTH);
    anyhow::ensure!(len > 0, "Tokenizer produced no tokens");

    let padding: Vec<u8> = encoding.get_attention_mask()[..len]
        .iter()
        .map(|&attend| u8::from(attend == 0))
        .collect();
    let input_ids = Tensor::new(&encoding.get_ids()[..len], device)?.unsqueeze(0)?;
    let padding_mask = Tensor::new(padding.as_slice(), device)?.unsqueeze(0)?;

    let logits = model.logits(&input_ids, &padding_mask)?;
    let probabilities = candle_nn::ops::softmax(&logits.to_dtype(DType::F32)?, D::Minus1)?
        .squeeze(0)?
        .to_vec1::<f32>()?;

    let (class, confidence) = probabilities
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });

    tracing::debug!("Predicted class {} with confidence {:.4}", class, confidence);

    Ok(Prediction {
        class,
        confidence,
        probabilities,
    })
}

/// Pick CUDA when available unless `cpu` is forced
pub fn select_device(cpu: bool) -> Result<Device> {
    if cpu {
        return Ok(Device::Cpu);
    }
    Ok(Device::cuda_if_available(0)?)
}

/// A loaded model, its tokenizer and the device they run on
pub struct TransformerClassifier<M: SequenceClassifier = ClassificationModel> {
    name: String,
    model: M,
    tokenizer: Tokenizer,
    device: Device,
}

impl<M: SequenceClassifier> TransformerClassifier<M> {
    pub fn new(name: &str, model: M, tokenizer: Tokenizer, device: Device) -> Self {
        Self {
            name: name.to_string(),
            model,
            tokenizer,
            device,
        }
    }

    pub fn num_labels(&self) -> usize {
        self.model.num_labels()
    }
}

impl TransformerClassifier<ClassificationModel> {
    pub fn load(model_name: &str, num_labels: usize, device: Device) -> Result<Self> {
        let (model, tokenizer) = load_pretrained_model(model_name, num_labels, &device)?;
        Ok(Self::new(model_name, model, tokenizer, device))
    }
}

impl<M: SequenceClassifier> ReviewClassifier for TransformerClassifier<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, text: &str) -> Result<Prediction> {
        predict(&self.model, &self.tokenizer, text, &self.device)
    }
}
