//! Error types for the wrm-model crate

use std::fmt;
use thiserror::Error;
use wrm_data::DataError;

/// Why a model cannot serve a request right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    /// A training run is in progress on this model instance.
    Training,
    /// The model has never been trained.
    Untrained,
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReadyReason::Training => f.write_str("training in progress"),
            NotReadyReason::Untrained => f.write_str("model has not been trained"),
        }
    }
}

/// Numeric failures inside the training procedure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NumericError {
    #[error("loss became non-finite in epoch {epoch}")]
    NonFiniteLoss { epoch: usize },
    #[error("gradient became non-finite in epoch {epoch}")]
    NonFiniteGradient { epoch: usize },
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("target length {actual} does not match model output size {expected}")]
    TargetShape { expected: usize, actual: usize },
}

/// Failure of a single inference step. Recovered by the iterative
/// forecaster; never surfaced as a failure of a whole forecast.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictionStepError {
    #[error("window has {actual} values, model expects {expected}")]
    WindowLength { expected: usize, actual: usize },
    #[error("window contains a non-finite value")]
    NonFiniteInput,
    #[error("model produced a non-finite value ({0})")]
    NonFiniteOutput(f64),
}

/// Custom error types for the wrm-model crate
#[derive(Debug, Error)]
pub enum ModelError {
    /// Insufficient or malformed input series
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("model not ready: {0}")]
    ModelNotReady(NotReadyReason),

    /// Numeric failure while fitting; the caller may retry training
    #[error("training failed: {source}")]
    TrainingFailed {
        #[source]
        source: NumericError,
    },

    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("model file i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("model encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("model file is inconsistent: {0}")]
    Corrupt(String),
}

impl ModelError {
    /// True for the "series too short" family of errors.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, ModelError::Data(DataError::InsufficientData { .. }))
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ModelError>;
