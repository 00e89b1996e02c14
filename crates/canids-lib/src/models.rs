//! Core data models for the prediction stream

use serde::{Deserialize, Serialize};

/// Discrete class identifier produced by the classifier
pub type Label = i64;

/// First (and only) message a client sends on a stream session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionRequest {
    /// Category key naming the dataset to stream. Kept as raw JSON so a
    /// non-string key reads as an unknown category.
    #[serde(default)]
    pub attack: Option<serde_json::Value>,
}

impl SelectionRequest {
    pub fn attack_key(&self) -> Option<&str> {
        self.attack.as_ref().and_then(serde_json::Value::as_str)
    }
}

/// Messages emitted by the server over a stream session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// Interval or final verdict
    Prediction {
        prediction: Option<Label>,
        #[serde(rename = "final")]
        is_final: bool,
    },
    /// Session-fatal failure; nothing follows it
    Error { error: String },
}

impl ServerMessage {
    pub fn interim(label: Label) -> Self {
        Self::Prediction {
            prediction: Some(label),
            is_final: false,
        }
    }

    pub fn verdict(label: Option<Label>) -> Self {
        Self::Prediction {
            prediction: label,
            is_final: true,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// True for the final verdict and for errors
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Prediction { is_final, .. } => *is_final,
            Self::Error { .. } => true,
        }
    }
}

/// Category advertised by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub key: String,
    pub available: bool,
}
