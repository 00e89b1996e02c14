//! ONNX inference using tract
//!
//! Runs a pre-trained intrusion classifier (e.g. an SVM exported with
//! skl2onnx, zipmap disabled) on batches of preprocessed CAN features.

use super::Classifier;
use crate::dataset::BatchView;
use crate::models::Label;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
pub const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based classifier using tract for lightweight inference
pub struct OnnxClassifier {
    model: TractModel,
    model_path: PathBuf,
    input_width: Option<usize>,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl OnnxClassifier {
    /// Load a model from disk.
    ///
    /// With `input_shape = Some((rows, cols))` the input fact is pinned to
    /// `[rows, cols]`; otherwise the model's own declared input is used.
    pub fn load(path: impl AsRef<Path>, input_shape: Option<(usize, usize)>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read model file {}", path.display()))?;
        let model = Self::load_model(&bytes, input_shape)?;

        Ok(Self {
            model,
            model_path: path.to_path_buf(),
            input_width: input_shape.map(|(_, cols)| cols),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        })
    }

    /// Parse and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8], input_shape: Option<(usize, usize)>) -> Result<TractModel> {
        let mut model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?;

        if let Some((rows, cols)) = input_shape {
            model = model
                .with_input_fact(0, f32::fact([rows, cols]).into())
                .context("Failed to set input shape")?;
        }

        let model = model
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Get inference statistics
    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }

    fn batch_to_tensor(batch: BatchView<'_>) -> Result<Tensor> {
        let array =
            tract_ndarray::Array2::from_shape_vec((batch.rows(), batch.cols()), batch.values().to_vec())
                .context("Batch shape does not match its values")?;
        Ok(array.into())
    }
}

/// Decode the model's first output into one label per row.
///
/// A rank-1 tensor is taken as labels directly. A rank-2 `[rows, classes]`
/// tensor is taken as scores and reduced by argmax, lowest class index
/// winning ties.
fn tensor_to_labels(output: &Tensor, rows: usize) -> Result<Vec<Label>> {
    let labels: Vec<Label> = match output.rank() {
        1 => {
            let cast = output.cast_to::<i64>()?;
            let view = cast.to_array_view::<i64>()?;
            view.iter().copied().collect()
        }
        2 if output.shape()[1] == 1 => {
            let cast = output.cast_to::<i64>()?;
            let view = cast.to_array_view::<i64>()?;
            view.iter().copied().collect()
        }
        2 => {
            let cast = output.cast_to::<f32>()?;
            let view = cast.to_array_view::<f32>()?.into_dimensionality::<tract_ndarray::Ix2>()?;
            view.outer_iter()
                .map(|scores| {
                    let mut best = 0usize;
                    for (index, score) in scores.iter().enumerate() {
                        if *score > scores[best] {
                            best = index;
                        }
                    }
                    best as Label
                })
                .collect()
        }
        rank => anyhow::bail!("Unsupported model output rank {}", rank),
    };

    if labels.len() != rows {
        anyhow::bail!("Model returned {} labels for {} rows", labels.len(), rows);
    }
    Ok(labels)
}

impl Classifier for OnnxClassifier {
    fn predict(&self, batch: BatchView<'_>) -> Result<Vec<Label>> {
        if let Some(width) = self.input_width {
            if batch.cols() != width {
                anyhow::bail!("Batch has {} features, model expects {}", batch.cols(), width);
            }
        }

        let start = Instant::now();
        let input = Self::batch_to_tensor(batch)?;

        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        let labels = tensor_to_labels(output, batch.rows())?;

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), rows = batch.rows(), "Inference completed");
        }

        Ok(labels)
    }

    fn input_width(&self) -> Option<usize> {
        self.input_width
    }

    fn description(&self) -> String {
        format!("onnx:{}", self.model_path.display())
    }
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}
