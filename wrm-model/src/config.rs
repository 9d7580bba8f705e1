//! Model and forecast configuration.

use serde::{Deserialize, Serialize};
use wrm_core::forecast::DEFAULT_HORIZON_DAYS;

use crate::error::{ModelError, Result};

/// What the iterative forecaster substitutes for a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepFallback {
    /// The midpoint of the normalized range (0.5).
    #[default]
    Midpoint,
    /// The previous normalized value in the rolling window.
    RepeatLast,
}

impl StepFallback {
    pub const MIDPOINT: f64 = 0.5;

    /// The normalized value to use in place of a failed prediction.
    pub fn substitute(&self, previous: Option<f64>) -> f64 {
        match self {
            StepFallback::Midpoint => Self::MIDPOINT,
            StepFallback::RepeatLast => previous.unwrap_or(Self::MIDPOINT),
        }
    }
}

/// Hyper-parameters of one signal's sequence model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Input window length (W)
    pub window_size: usize,
    /// Values predicted per call (L)
    pub look_ahead: usize,
    /// Hidden size of each stacked recurrent layer, bottom first
    pub hidden_sizes: Vec<usize>,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub epochs: usize,
    /// Clip gradients to this global norm
    pub gradient_clip: Option<f64>,
    /// Seed for weight initialization and epoch shuffling
    pub seed: u64,
    pub fallback: StepFallback,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            window_size: 7,
            look_ahead: 1,
            hidden_sizes: vec![64, 32],
            learning_rate: 0.001,
            batch_size: 32,
            epochs: 50,
            gradient_clip: Some(1.0),
            seed: 42,
            fallback: StepFallback::Midpoint,
        }
    }
}

impl ModelConfig {
    /// Single 50-unit layer, as used for a lone consumption series.
    pub fn single_layer() -> Self {
        Self::default().with_hidden_sizes(vec![50])
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_look_ahead(mut self, look_ahead: usize) -> Self {
        self.look_ahead = look_ahead;
        self
    }

    pub fn with_hidden_sizes(mut self, hidden_sizes: Vec<usize>) -> Self {
        self.hidden_sizes = hidden_sizes;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_gradient_clip(mut self, clip: Option<f64>) -> Self {
        self.gradient_clip = clip;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_fallback(mut self, fallback: StepFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Smallest series length that can be trained on.
    pub fn min_training_len(&self) -> usize {
        self.window_size + self.look_ahead
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(ModelError::InvalidConfig(msg.to_string()));
        if self.window_size == 0 {
            return invalid("window_size must be positive");
        }
        if self.look_ahead == 0 {
            return invalid("look_ahead must be positive");
        }
        if self.hidden_sizes.is_empty() || self.hidden_sizes.contains(&0) {
            return invalid("hidden_sizes must list at least one positive layer size");
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid("learning_rate must be positive");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be positive");
        }
        if self.epochs == 0 {
            return invalid("epochs must be positive");
        }
        if let Some(clip) = self.gradient_clip {
            if !(clip.is_finite() && clip > 0.0) {
                return invalid("gradient_clip must be positive");
            }
        }
        Ok(())
    }
}

/// Forecasting settings shared by every signal of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub model: ModelConfig,
    pub horizon_days: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.window_size, 7);
        assert_eq!(config.look_ahead, 1);
        assert_eq!(config.hidden_sizes, vec![64, 32]);
        assert_eq!(config.learning_rate, 0.001);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.epochs, 50);
        assert_eq!(config.min_training_len(), 8);
        assert!(config.validate().is_ok());
        assert_eq!(ForecastConfig::default().horizon_days, 30);
    }

    #[test]
    fn test_builder() {
        let config = ModelConfig::single_layer()
            .with_window_size(14)
            .with_epochs(100)
            .with_fallback(StepFallback::RepeatLast);
        assert_eq!(config.hidden_sizes, vec![50]);
        assert_eq!(config.window_size, 14);
        assert_eq!(config.epochs, 100);
        assert_eq!(config.fallback, StepFallback::RepeatLast);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ModelConfig::default().with_window_size(0).validate().is_err());
        assert!(ModelConfig::default().with_hidden_sizes(vec![]).validate().is_err());
        assert!(ModelConfig::default().with_hidden_sizes(vec![8, 0]).validate().is_err());
        assert!(ModelConfig::default().with_learning_rate(f64::NAN).validate().is_err());
        assert!(ModelConfig::default().with_batch_size(0).validate().is_err());
        assert!(ModelConfig::default().with_gradient_clip(Some(0.0)).validate().is_err());
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = r#"{ "model": { "window_size": 14, "fallback": "repeat_last" }, "horizon_days": 10 }"#;
        let config: ForecastConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.horizon_days, 10);
        assert_eq!(config.model.window_size, 14);
        assert_eq!(config.model.fallback, StepFallback::RepeatLast);
        assert_eq!(config.model.hidden_sizes, vec![64, 32]);
    }

    #[test]
    fn test_fallback_values() {
        assert_eq!(StepFallback::Midpoint.substitute(Some(0.9)), 0.5);
        assert_eq!(StepFallback::RepeatLast.substitute(Some(0.9)), 0.9);
        assert_eq!(StepFallback::RepeatLast.substitute(None), 0.5);
    }
}
