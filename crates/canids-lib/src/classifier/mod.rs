//! Classifier adapter
//!
//! The model is an opaque, read-only black box: a batch of fixed-width
//! feature rows goes in, one label per row comes out. It is loaded once at
//! process start and shared by every session.

mod onnx;

pub use onnx::{InferenceStats, OnnxClassifier, MAX_INFERENCE_MS};

use crate::dataset::BatchView;
use crate::models::Label;
use anyhow::Result;

/// Trait for classifier implementations
pub trait Classifier: Send + Sync {
    /// Classify every row of the batch, in row order
    fn predict(&self, batch: BatchView<'_>) -> Result<Vec<Label>>;

    /// Number of feature columns the model expects, when known
    fn input_width(&self) -> Option<usize> {
        None
    }

    /// Human-readable identity for logs and metrics
    fn description(&self) -> String;
}
