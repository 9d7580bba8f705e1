//! Error types for the wrm-allocation crate

use thiserror::Error;

/// Malformed crop or growth-stage tables.
#[derive(Debug, Error)]
pub enum CropTableError {
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("crop {crop}: {field} must be a positive number, got {value}")]
    BadValue {
        crop: String,
        field: &'static str,
        value: f64,
    },

    #[error("crop {0} is listed twice")]
    DuplicateCrop(String),

    #[error("growth stage {stage} refers to unknown crop {crop}")]
    StageWithoutCrop { crop: String, stage: String },

    #[error("crop table is empty")]
    Empty,
}

/// Inputs that cannot produce a recommendation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AllocationError {
    #[error("reservoir capacity must be positive, got {0}")]
    InvalidCapacity(f64),

    #[error("no current reservoir level and no level forecast")]
    NoLevelReading,

    #[error("reservoir level must be a finite number, got {0}")]
    InvalidLevel(f64),

    #[error("field size must be a non-negative number of hectares, got {0}")]
    InvalidFieldSize(f64),

    #[error("unknown irrigation method: {0}")]
    UnknownIrrigationMethod(String),

    #[error("invalid allocation configuration: {0}")]
    InvalidConfig(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, AllocationError>;
