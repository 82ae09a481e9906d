//! Error types for Synheart Stress

use thiserror::Error;

/// Errors that can occur while loading a model or classifying a record
#[derive(Debug, Error)]
pub enum StressError {
    /// The model artifact is absent, malformed, or incomplete.
    #[error("Failed to load model: {0}")]
    ModelLoadError(String),

    /// A prediction request carried a missing or non-numeric field.
    #[error("Invalid input: {0}")]
    InvalidInputError(String),

    /// The loaded model has no training rows to vote with.
    #[error("Training set is empty; no neighbors to vote")]
    EmptyTrainingSetError,

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl StressError {
    pub(crate) fn model_load(msg: impl Into<String>) -> Self {
        StressError::ModelLoadError(msg.into())
    }

    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        StressError::InvalidInputError(msg.into())
    }

    /// Whether the caller can recover by re-submitting corrected input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StressError::InvalidInputError(_))
    }
}
