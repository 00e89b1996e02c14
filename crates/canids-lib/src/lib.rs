//! Core library for the CAN intrusion-detection prediction stream
//!
//! This crate provides:
//! - Dataset loading and preprocessing of extracted CAN features
//! - Classifier abstraction with an ONNX backend
//! - Majority voting over batch and interval predictions
//! - The paced streaming session driven over any message transport
//! - Health checks and observability

pub mod classifier;
pub mod dataset;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod session;
pub mod vote;

pub use classifier::{Classifier, OnnxClassifier};
pub use dataset::{DatasetCatalog, FeatureTable, Preprocessor, RawTable};
pub use error::{DatasetError, EmptyInputError, PreprocessError, SessionError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{StreamMetrics, StructuredLogger};
pub use session::{SessionConfig, SessionContext, SessionOutcome, StreamingSession, Transport};
pub use vote::majority_vote;
