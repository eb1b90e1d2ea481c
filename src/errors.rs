//! Shared error types for the prediction services
//!
//! Inference never surfaces these: model failures during prediction are
//! converted into a heuristic outcome (see [`crate::model::PredictionSource`]).
//! Training, configuration lookup and CLI I/O do propagate them.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pipeline-ml operations
#[derive(Debug, Error)]
pub enum Error {
    /// Requested configuration for a model the registry does not know
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Training was invoked with fewer samples than the configured minimum
    #[error("Insufficient training data: {samples} samples, minimum {minimum}")]
    InsufficientData { samples: usize, minimum: usize },

    /// Training records that cannot be turned into a dataset
    #[error("Invalid training data: {0}")]
    InvalidTrainingData(String),

    /// Feature vector width does not match what the model was fitted on
    #[error("Feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Numerical fit failed (diverged, empty partition, ...)
    #[error("Model fit failed: {0}")]
    Fit(String),

    /// Model invocation failed at prediction time
    #[error("Model inference failed: {0}")]
    Inference(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// File system related errors
    #[error("File system error: {message}")]
    FileSystem {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML errors
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Create a file system error with path context
    pub fn file_system(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source),
        }
    }

    /// Whether the error was raised by the training orchestrator
    pub fn is_training_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. } | Self::InvalidTrainingData(_) | Self::Fit(_)
        )
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;
