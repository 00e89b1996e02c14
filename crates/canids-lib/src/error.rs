//! Error types for dataset handling and stream sessions

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load a tabular dataset from disk
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read dataset {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("dataset {} is malformed: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("dataset loader task failed: {0}")]
    Task(String),
}

/// Failure while turning a raw table into classifier features
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("missing value in numeric column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("non-finite value in column '{column}' at row {row}")]
    NonFinite { column: String, row: usize },

    #[error("dataset has {actual} feature columns, classifier expects {expected}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("dataset has no feature columns")]
    NoColumns,
}

/// Majority vote was asked to reduce an empty sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("majority vote over an empty label sequence")]
pub struct EmptyInputError;

/// Session-fatal errors. None of them are retried.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid attack type")]
    InvalidSelection(Option<String>),

    #[error("Malformed selection message: {0}")]
    MalformedRequest(String),

    #[error("Unexpected message after selection")]
    UnexpectedMessage,

    #[error(transparent)]
    DatasetLoad(#[from] DatasetError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error("prediction failed: {0}")]
    Prediction(String),

    #[error("client disconnected")]
    TransportClosed,
}

impl SessionError {
    /// Stable tag for metrics labels and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::InvalidSelection(_) => "invalid_selection",
            SessionError::MalformedRequest(_) => "malformed_request",
            SessionError::UnexpectedMessage => "unexpected_message",
            SessionError::DatasetLoad(_) => "dataset_load",
            SessionError::Preprocess(_) => "preprocess",
            SessionError::Prediction(_) => "prediction",
            SessionError::TransportClosed => "transport_closed",
        }
    }
}

impl From<EmptyInputError> for SessionError {
    fn from(err: EmptyInputError) -> Self {
        SessionError::Prediction(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selection_message_is_stable() {
        let err = SessionError::InvalidSelection(Some("foo".to_string()));
        assert_eq!(err.to_string(), "Invalid attack type");
        assert_eq!(err.kind(), "invalid_selection");
    }

    #[test]
    fn test_dataset_error_is_transparent() {
        let err: SessionError = DatasetError::NotFound(PathBuf::from("/tmp/missing.csv")).into();
        assert_eq!(err.to_string(), "dataset file not found: /tmp/missing.csv");
        assert_eq!(err.kind(), "dataset_load");
    }
}
