//! Per-signal model lifecycle: Idle -> Training -> Ready.
//!
//! A [`SignalForecaster`] owns at most one trained model for one signal.
//! Training and forecasting share the instance through `&self`; the state
//! lock is only held for transitions, never across a training run, so a
//! forecast request made while training is rejected immediately with
//! [`ModelError::ModelNotReady`] instead of blocking.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use wrm_core::Signal;

use crate::{
    config::ModelConfig,
    error::{ModelError, NotReadyReason, Result},
    model::TrainedModel,
    trainer::TrainingReport,
};

#[derive(Debug)]
enum ModelState {
    Idle,
    Training { previous: Option<Arc<TrainedModel>> },
    Ready(Arc<TrainedModel>),
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    Idle,
    Training,
    Ready,
}

#[derive(Debug)]
pub struct SignalForecaster {
    signal: Signal,
    config: ModelConfig,
    state: Mutex<ModelState>,
}

/// Marks a training run in progress. If the run does not complete (error
/// or panic), dropping the guard puts back the model that was ready before.
struct TrainingGuard<'a> {
    forecaster: &'a SignalForecaster,
    done: bool,
}

impl TrainingGuard<'_> {
    fn finish(mut self, model: Arc<TrainedModel>) {
        *self.forecaster.lock() = ModelState::Ready(model);
        self.done = true;
    }
}

impl Drop for TrainingGuard<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut state = self.forecaster.lock();
        let restored = match std::mem::replace(&mut *state, ModelState::Idle) {
            ModelState::Training { previous: Some(model) } => ModelState::Ready(model),
            ModelState::Training { previous: None } => ModelState::Idle,
            other => other,
        };
        *state = restored;
    }
}

impl SignalForecaster {
    pub fn new(signal: Signal, config: ModelConfig) -> Self {
        Self {
            signal,
            config,
            state: Mutex::new(ModelState::Idle),
        }
    }

    /// Wrap an already trained (e.g. loaded) model.
    pub fn from_trained(model: TrainedModel) -> Self {
        Self {
            signal: model.signal,
            config: model.config.clone(),
            state: Mutex::new(ModelState::Ready(Arc::new(model))),
        }
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, ModelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> ModelStatus {
        match &*self.lock() {
            ModelState::Idle => ModelStatus::Idle,
            ModelState::Training { .. } => ModelStatus::Training,
            ModelState::Ready(_) => ModelStatus::Ready,
        }
    }

    fn begin_training(&self) -> Result<TrainingGuard<'_>> {
        let mut state = self.lock();
        let previous = match &*state {
            ModelState::Training { .. } => {
                return Err(ModelError::ModelNotReady(NotReadyReason::Training))
            }
            ModelState::Idle => None,
            ModelState::Ready(model) => Some(Arc::clone(model)),
        };
        *state = ModelState::Training { previous };
        Ok(TrainingGuard {
            forecaster: self,
            done: false,
        })
    }

    /// Train on `series`, replacing any previous model on success.
    ///
    /// Fails with `ModelNotReady` if another training run is in progress.
    /// On failure the previous model (if any) stays in service.
    pub fn train(&self, series: &[f64]) -> Result<TrainingReport> {
        let guard = self.begin_training()?;
        let model = TrainedModel::train(self.signal, &self.config, series)?;
        let report = model.report.clone();
        guard.finish(Arc::new(model));
        Ok(report)
    }

    /// The current model, if one is ready.
    pub fn trained(&self) -> Result<Arc<TrainedModel>> {
        match &*self.lock() {
            ModelState::Ready(model) => Ok(Arc::clone(model)),
            ModelState::Training { .. } => Err(ModelError::ModelNotReady(NotReadyReason::Training)),
            ModelState::Idle => Err(ModelError::ModelNotReady(NotReadyReason::Untrained)),
        }
    }

    /// Forecast `days` values past the end of `history` (original units).
    pub fn forecast(&self, history: &[f64], days: usize) -> Result<Vec<f64>> {
        let model = self.trained()?;
        model.forecast(history, days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ModelConfig {
        ModelConfig::default()
            .with_window_size(4)
            .with_hidden_sizes(vec![4])
            .with_epochs(2)
    }

    fn series(len: usize) -> Vec<f64> {
        (0..len).map(|i| 50.0 + (i % 5) as f64 * 3.0).collect()
    }

    #[test]
    fn test_forecast_before_training_fails_fast() {
        let forecaster = SignalForecaster::new(Signal::Inflow, config());
        assert_eq!(forecaster.status(), ModelStatus::Idle);
        let err = forecaster.forecast(&series(10), 5).unwrap_err();
        assert!(matches!(
            err,
            ModelError::ModelNotReady(NotReadyReason::Untrained)
        ));
    }

    #[test]
    fn test_train_then_forecast() {
        let forecaster = SignalForecaster::new(Signal::Outflow, config());
        let report = forecaster.train(&series(20)).unwrap();
        assert_eq!(report.epochs, 2);
        assert_eq!(forecaster.status(), ModelStatus::Ready);
        assert_eq!(forecaster.forecast(&series(20), 5).unwrap().len(), 5);
    }

    #[test]
    fn test_requests_during_training_are_rejected() {
        let forecaster = SignalForecaster::new(Signal::Level, config());
        let guard = forecaster.begin_training().unwrap();
        assert_eq!(forecaster.status(), ModelStatus::Training);
        assert!(matches!(
            forecaster.forecast(&series(10), 3),
            Err(ModelError::ModelNotReady(NotReadyReason::Training))
        ));
        assert!(matches!(
            forecaster.train(&series(10)),
            Err(ModelError::ModelNotReady(NotReadyReason::Training))
        ));
        drop(guard);
        assert_eq!(forecaster.status(), ModelStatus::Idle);
    }

    #[test]
    fn test_failed_retrain_keeps_previous_model() {
        let forecaster = SignalForecaster::new(Signal::Inflow, config());
        forecaster.train(&series(20)).unwrap();
        let before = forecaster.trained().unwrap();

        let err = forecaster.train(&series(3)).unwrap_err();
        assert!(err.is_insufficient_data());
        assert_eq!(forecaster.status(), ModelStatus::Ready);
        assert!(Arc::ptr_eq(&before, &forecaster.trained().unwrap()));
    }

    #[test]
    fn test_failed_first_training_returns_to_idle() {
        let forecaster = SignalForecaster::new(Signal::Inflow, config());
        assert!(forecaster.train(&series(2)).is_err());
        assert_eq!(forecaster.status(), ModelStatus::Idle);
    }

    #[test]
    fn test_consumption_on_single_layer() {
        let config = ModelConfig::single_layer().with_window_size(4).with_epochs(1);
        let forecaster = SignalForecaster::new(Signal::Consumption, config);
        forecaster.train(&series(15)).unwrap();
        let model = forecaster.trained().unwrap();
        assert_eq!(model.signal, Signal::Consumption);
        assert_eq!(model.config.hidden_sizes, vec![50]);
        assert_eq!(forecaster.forecast(&series(15), 3).unwrap().len(), 3);
    }

    #[test]
    fn test_concurrent_forecasts_share_model() {
        let forecaster = SignalForecaster::new(Signal::Level, config());
        forecaster.train(&series(20)).unwrap();
        let history = series(20);
        let results: Vec<Vec<f64>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| forecaster.forecast(&history, 7).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for r in &results[1..] {
            assert_eq!(r, &results[0]);
        }
    }
}
