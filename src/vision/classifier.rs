// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chest X-ray classifier
//!
//! Wraps the pretrained network (an ImageNet backbone whose final layer was
//! replaced with a two-class head) exported to ONNX. The weights are used
//! unchanged; this module only feeds it preprocessed images and reads the
//! two logits back.

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

use super::preprocessing::{preprocess_for_classification, CLASSIFIER_INPUT_SIZE};
use crate::records::{Label, NUM_CLASSES};

/// Result of a single forward pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub label: Label,
    /// Softmax probability of `label`
    pub confidence: f32,
    /// Softmax probabilities indexed by `Label::index()`
    pub probabilities: [f32; NUM_CLASSES],
    pub processing_time_ms: u64,
}

impl Prediction {
    /// Build a prediction from raw logits
    pub fn from_logits(logits: &[f32], processing_time_ms: u64) -> Result<Self> {
        if logits.len() != NUM_CLASSES {
            anyhow::bail!(
                "Classifier produced {} logits, expected {}",
                logits.len(),
                NUM_CLASSES
            );
        }

        let probs = softmax(logits);
        let index = argmax(&probs).context("Empty classifier output")?;
        let label = Label::from_index(index)?;

        Ok(Self {
            label,
            confidence: probs[index],
            probabilities: [probs[0], probs[1]],
            processing_time_ms,
        })
    }
}

/// Something that turns an image into a prediction
///
/// The ONNX model implements this; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
pub trait ImageClassifier: Send + Sync {
    fn classify(&self, image: &DynamicImage) -> Result<Prediction>;

    fn name(&self) -> String;
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the first one wins on ties
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// ONNX Runtime backed classifier (CPU only)
#[derive(Clone)]
pub struct OnnxClassifier {
    session: Arc<Mutex<Session>>,
    input_name: String,
    model_name: String,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("input_name", &self.input_name)
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load the classifier from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Classifier model not found: {}", model_path.display());
        }

        info!("Loading X-ray classifier from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load classifier model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("Classifier input {}: {:?}", input_name, input.input_type);
        }

        let model_name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "xray-classifier".to_string());

        info!("✅ X-ray classifier loaded (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            model_name,
        })
    }

    /// Run the forward pass on an already preprocessed tensor
    pub fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let size = CLASSIFIER_INPUT_SIZE as usize;
        if input.shape() != [1, 3, size, size] {
            anyhow::bail!(
                "Invalid input shape: {:?}, expected [1, 3, {}, {}]",
                input.shape(),
                size,
                size
            );
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Classifier session lock poisoned"))?;

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Classifier inference failed")?;

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Classifier output shape: {:?}", logits.shape());

        Ok(logits.iter().copied().collect())
    }
}

impl ImageClassifier for OnnxClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Prediction> {
        let start = Instant::now();
        let input = preprocess_for_classification(image);
        let logits = self.forward(&input)?;
        let prediction = Prediction::from_logits(&logits, start.elapsed().as_millis() as u64)?;

        debug!(
            "Classified as {} ({:.3}) in {}ms",
            prediction.label, prediction.confidence, prediction.processing_time_ms
        );

        Ok(prediction)
    }

    fn name(&self) -> String {
        self.model_name.clone()
    }
}
