//! A trained single-signal model and its on-disk form.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use wrm_core::Signal;
use wrm_data::{
    normalize::{self, NormalizationParams},
    window, DataError,
};

use crate::{
    config::ModelConfig,
    error::{ModelError, PredictionStepError, Result},
    iterative::{self, StepPredictor},
    network::LstmNetwork,
    trainer::{self, TrainingReport},
};

/// Network weights together with everything needed to use them: the
/// configuration they were trained with and the normalization parameters
/// of the training series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub signal: Signal,
    pub config: ModelConfig,
    pub params: NormalizationParams,
    pub report: TrainingReport,
    network: LstmNetwork,
}

impl TrainedModel {
    /// Fit a fresh network to `series`.
    pub fn train(signal: Signal, config: &ModelConfig, series: &[f64]) -> Result<Self> {
        config.validate()?;
        let required = config.min_training_len();
        if series.len() < required {
            return Err(DataError::InsufficientData {
                required,
                actual: series.len(),
            }
            .into());
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(DataError::InvalidParameter(format!(
                "{} series contains non-finite values",
                signal
            ))
            .into());
        }

        let params = normalize::fit(series)?;
        let scaled = normalize::normalize(series, &params);
        let windows = window::build_training_set(&scaled, config.window_size, config.look_ahead)?;

        log::info!(
            "training {} model on {} windows ({} epochs, layers {:?})",
            signal,
            windows.len(),
            config.epochs,
            config.hidden_sizes
        );
        let mut network = LstmNetwork::new(&config.hidden_sizes, config.look_ahead, config.seed);
        let report = trainer::fit(&mut network, &windows, config)
            .map_err(|source| ModelError::TrainingFailed { source })?;
        log::info!("{} model trained, final loss {:.6}", signal, report.final_loss);

        Ok(Self {
            signal,
            config: config.clone(),
            params,
            report,
            network,
        })
    }

    /// Forecast `days` values in original units past the end of `history`.
    pub fn forecast(&self, history: &[f64], days: usize) -> Result<Vec<f64>> {
        iterative::forecast(self, history, &self.params, days, self.config.fallback)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        log::info!("saved {} model to {}", self.signal, path.as_ref().display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let model: TrainedModel = serde_json::from_reader(reader)?;
        model.check_consistency()?;
        log::debug!("loaded {} model from {}", model.signal, path.as_ref().display());
        Ok(model)
    }

    fn check_consistency(&self) -> Result<()> {
        let corrupt = |msg: String| Err(ModelError::Corrupt(msg));
        if self.network.hidden_sizes() != self.config.hidden_sizes {
            return corrupt(format!(
                "layers {:?} do not match configured {:?}",
                self.network.hidden_sizes(),
                self.config.hidden_sizes
            ));
        }
        if self.network.output_size() != self.config.look_ahead {
            return corrupt(format!(
                "output size {} does not match look_ahead {}",
                self.network.output_size(),
                self.config.look_ahead
            ));
        }
        let mut input_size = 1;
        for (k, layer) in self.network.layers.iter().enumerate() {
            let h = layer.hidden_size;
            if layer.input_size != input_size
                || layer.w_x.dim() != (4 * h, input_size)
                || layer.w_h.dim() != (4 * h, h)
                || layer.b.len() != 4 * h
            {
                return corrupt(format!("layer {} has inconsistent weight shapes", k));
            }
            input_size = h;
        }
        if self.network.head.weights.dim() != (self.network.output_size(), input_size) {
            return corrupt("output projection has inconsistent weight shape".to_string());
        }
        if !(self.params.min.is_finite() && self.params.max.is_finite()) {
            return corrupt("normalization parameters are not finite".to_string());
        }
        Ok(())
    }
}

impl StepPredictor for TrainedModel {
    fn window_size(&self) -> usize {
        self.config.window_size
    }

    fn predict_one(&self, window: &[f64]) -> std::result::Result<f64, PredictionStepError> {
        if window.len() != self.config.window_size {
            return Err(PredictionStepError::WindowLength {
                expected: self.config.window_size,
                actual: window.len(),
            });
        }
        if window.iter().any(|v| !v.is_finite()) {
            return Err(PredictionStepError::NonFiniteInput);
        }
        let output = self.network.predict(window);
        let value = output.first().copied().unwrap_or(f64::NAN);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(PredictionStepError::NonFiniteOutput(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NumericError;

    fn small_config() -> ModelConfig {
        ModelConfig::default()
            .with_hidden_sizes(vec![6, 4])
            .with_learning_rate(0.01)
            .with_batch_size(8)
            .with_epochs(5)
    }

    fn seasonal(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| 1000.0 + 250.0 * (i as f64 * std::f64::consts::TAU / 14.0).sin())
            .collect()
    }

    #[test]
    fn test_train_and_forecast() {
        let series = seasonal(40);
        let model = TrainedModel::train(Signal::Inflow, &small_config(), &series).unwrap();
        assert_eq!(model.params.min, series.iter().cloned().fold(f64::INFINITY, f64::min));
        assert_eq!(model.report.windows, 40 - 7);
        let out = model.forecast(&series, 30).unwrap();
        assert_eq!(out.len(), 30);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_short_series_is_insufficient() {
        let err = TrainedModel::train(Signal::Level, &small_config(), &seasonal(7)).unwrap_err();
        assert!(err.is_insufficient_data());
        // exactly W + L points is one window
        let model = TrainedModel::train(Signal::Level, &small_config(), &seasonal(8)).unwrap();
        assert_eq!(model.report.windows, 1);
    }

    #[test]
    fn test_divergent_training_fails_with_cause() {
        let config = small_config()
            .with_learning_rate(1e200)
            .with_gradient_clip(None)
            .with_batch_size(1);
        let err = TrainedModel::train(Signal::Outflow, &config, &seasonal(40)).unwrap_err();
        match err {
            ModelError::TrainingFailed { source } => assert!(matches!(
                source,
                NumericError::NonFiniteLoss { .. } | NumericError::NonFiniteGradient { .. }
            )),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = TrainedModel::train(Signal::Inflow, &small_config().with_epochs(0), &seasonal(40))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }

    #[test]
    fn test_predict_one_checks_window() {
        let model = TrainedModel::train(Signal::Inflow, &small_config(), &seasonal(20)).unwrap();
        assert_eq!(
            model.predict_one(&[0.5; 3]),
            Err(PredictionStepError::WindowLength {
                expected: 7,
                actual: 3
            })
        );
        let mut window = [0.5; 7];
        window[2] = f64::NAN;
        assert_eq!(model.predict_one(&window), Err(PredictionStepError::NonFiniteInput));
        assert!(model.predict_one(&[0.5; 7]).is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inflow.json");
        let series = seasonal(30);
        let model = TrainedModel::train(Signal::Inflow, &small_config(), &series).unwrap();
        model.save(&path).unwrap();

        let loaded = TrainedModel::load(&path).unwrap();
        assert_eq!(loaded.signal, Signal::Inflow);
        assert!((loaded.params.min - model.params.min).abs() < 1e-9);
        assert!((loaded.params.max - model.params.max).abs() < 1e-9);
        assert_eq!(loaded.config.hidden_sizes, model.config.hidden_sizes);
        let window = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];
        let a = model.predict_one(&window).unwrap();
        let b = loaded.predict_one(&window).unwrap();
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_load_rejects_mismatched_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.json");
        let mut model = TrainedModel::train(Signal::Level, &small_config(), &seasonal(20)).unwrap();
        model.config.hidden_sizes = vec![6];
        model.save(&path).unwrap();
        assert!(matches!(TrainedModel::load(&path), Err(ModelError::Corrupt(_))));
    }
}
