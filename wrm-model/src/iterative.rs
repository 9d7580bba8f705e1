//! Multi-day forecasting by feeding one-step predictions back as input.

use std::collections::VecDeque;

use wrm_data::{
    normalize::{self, NormalizationParams},
    DataError,
};

use crate::{
    config::StepFallback,
    error::{ModelError, PredictionStepError, Result},
};

/// Anything that maps a normalized window to the next normalized value.
pub trait StepPredictor {
    fn window_size(&self) -> usize;
    fn predict_one(&self, window: &[f64]) -> std::result::Result<f64, PredictionStepError>;
}

impl<P: StepPredictor + ?Sized> StepPredictor for &P {
    fn window_size(&self) -> usize {
        (**self).window_size()
    }

    fn predict_one(&self, window: &[f64]) -> std::result::Result<f64, PredictionStepError> {
        (**self).predict_one(window)
    }
}

/// Forecast `days` values past the end of `history`.
///
/// The window is seeded with the last W normalized history values. Each
/// step predicts one value, appends it and drops the oldest, so later days
/// are conditioned on earlier predictions and errors compound with the
/// horizon. A failed step is logged and replaced by `fallback`; it never
/// aborts the forecast. Predictions are not clamped to the normalized
/// range before denormalizing, so values past the historical extremes can
/// be produced.
pub fn forecast<P: StepPredictor>(
    predictor: &P,
    history: &[f64],
    params: &NormalizationParams,
    days: usize,
    fallback: StepFallback,
) -> Result<Vec<f64>> {
    let window_size = predictor.window_size();
    if history.len() < window_size {
        return Err(ModelError::Data(DataError::InsufficientData {
            required: window_size,
            actual: history.len(),
        }));
    }

    let seed = &history[history.len() - window_size..];
    let mut window: VecDeque<f64> = normalize::normalize(seed, params).into();
    let mut predicted = Vec::with_capacity(days);

    for day in 0..days {
        let input: Vec<f64> = window.iter().copied().collect();
        let next = match predictor.predict_one(&input) {
            Ok(value) => value,
            Err(err) => {
                let value = fallback.substitute(window.back().copied());
                log::warn!("forecast step {} failed ({}), using {}", day + 1, err, value);
                value
            }
        };
        predicted.push(next);
        window.pop_front();
        window.push_back(next);
    }

    Ok(normalize::denormalize(&predicted, params))
}
