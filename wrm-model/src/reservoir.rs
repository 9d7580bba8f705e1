//! Inflow, outflow and level models of one reservoir.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use wrm_core::{ForecastBundle, ReservoirHistory, Signal, TimeSeries};
use wrm_data::interpolation::fill_series;

use crate::{
    config::ModelConfig,
    error::Result,
    forecaster::SignalForecaster,
    model::TrainedModel,
    trainer::TrainingReport,
};

/// Three independent [`SignalForecaster`]s, one per reservoir signal.
#[derive(Debug)]
pub struct ReservoirForecaster {
    inflow: SignalForecaster,
    outflow: SignalForecaster,
    level: SignalForecaster,
}

impl ReservoirForecaster {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            inflow: SignalForecaster::new(Signal::Inflow, config.clone()),
            outflow: SignalForecaster::new(Signal::Outflow, config.clone()),
            level: SignalForecaster::new(Signal::Level, config.clone()),
        }
    }

    /// Build from previously trained models; signals without a model start idle.
    pub fn from_trained(config: &ModelConfig, models: Vec<TrainedModel>) -> Self {
        let mut forecaster = Self::new(config);
        for model in models {
            match model.signal {
                Signal::Inflow => forecaster.inflow = SignalForecaster::from_trained(model),
                Signal::Outflow => forecaster.outflow = SignalForecaster::from_trained(model),
                Signal::Level => forecaster.level = SignalForecaster::from_trained(model),
                Signal::Consumption => {
                    log::warn!("ignoring consumption model in a reservoir forecaster")
                }
            }
        }
        forecaster
    }

    pub fn forecaster(&self, signal: Signal) -> Option<&SignalForecaster> {
        match signal {
            Signal::Inflow => Some(&self.inflow),
            Signal::Outflow => Some(&self.outflow),
            Signal::Level => Some(&self.level),
            Signal::Consumption => None,
        }
    }

    fn each(&self) -> [&SignalForecaster; 3] {
        [&self.inflow, &self.outflow, &self.level]
    }

    /// Train every signal that has data, concurrently.
    ///
    /// Gaps are filled by linear interpolation first. A signal with no
    /// observations is skipped; a signal too short to train is reported in
    /// its own entry without affecting the others.
    pub fn train_all(
        &self,
        history: &ReservoirHistory,
    ) -> BTreeMap<Signal, Result<TrainingReport>> {
        let jobs: Vec<(&SignalForecaster, TimeSeries)> = self
            .each()
            .into_iter()
            .filter_map(|forecaster| {
                let series = history.series(forecaster.signal())?;
                if series.is_empty() {
                    log::info!("no {} observations, skipping", forecaster.signal());
                    return None;
                }
                match fill_series(series) {
                    Ok(filled) => Some((forecaster, filled)),
                    Err(err) => {
                        log::warn!("cannot prepare {} series: {}", forecaster.signal(), err);
                        None
                    }
                }
            })
            .collect();

        std::thread::scope(|scope| {
            let handles: Vec<_> = jobs
                .iter()
                .map(|(forecaster, series)| {
                    let handle = scope.spawn(move || forecaster.train(&series.values()));
                    (forecaster.signal(), handle)
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|(signal, handle)| match handle.join() {
                    Ok(result) => Some((signal, result)),
                    Err(_) => {
                        log::error!("{} training thread panicked", signal);
                        None
                    }
                })
                .collect()
        })
    }

    /// Forecast every ready signal `days` ahead of the last history date.
    ///
    /// A signal whose observations stop before that date is forecast through
    /// the missing days first, so every signal lands on the same calendar
    /// days. Signals without a trained model or without enough history are
    /// left out of the bundle (logged at warn).
    pub fn forecast_bundle(&self, history: &ReservoirHistory, days: usize) -> Result<ForecastBundle> {
        let anchor = history.last_date().ok_or_else(|| {
            wrm_data::DataError::InsufficientData {
                required: 1,
                actual: 0,
            }
        })?;

        let mut signals = Vec::with_capacity(3);
        for forecaster in self.each() {
            let signal = forecaster.signal();
            let Some(series) = history.series(signal).filter(|s| !s.is_empty()) else {
                continue;
            };
            let filled = fill_series(series)?;
            let lag = lag_days(&filled, anchor);
            if lag > 0 {
                log::debug!("{} observations end {} days before {}", signal, lag, anchor);
            }
            match forecaster.forecast(&filled.values(), days + lag) {
                Ok(mut values) => signals.push((signal, values.split_off(lag))),
                Err(err) => log::warn!("no {} forecast: {}", signal, err),
            }
        }
        Ok(ForecastBundle::from_signals(anchor, &signals))
    }
}

/// Days between the last observation of `series` and `anchor`.
fn lag_days(series: &TimeSeries, anchor: NaiveDate) -> usize {
    series
        .last_date()
        .map_or(0, |last| (anchor - last).num_days().max(0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecaster::ModelStatus;

    fn config() -> ModelConfig {
        ModelConfig::default()
            .with_window_size(4)
            .with_hidden_sizes(vec![4])
            .with_epochs(2)
    }

    fn history(days: usize, with_outflow: bool) -> ReservoirHistory {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let wave = |i: usize, base: f64| base + (i % 7) as f64 * 2.0;
        let series = |base: f64| {
            TimeSeries::from_values(start, &(0..days).map(|i| wave(i, base)).collect::<Vec<_>>())
                .unwrap()
        };
        ReservoirHistory {
            inflow: series(100.0),
            outflow: if with_outflow {
                series(80.0)
            } else {
                TimeSeries::default()
            },
            level: series(5000.0),
        }
    }

    #[test]
    fn test_train_all_and_forecast() {
        let history = history(30, true);
        let forecaster = ReservoirForecaster::new(&config());
        let reports = forecaster.train_all(&history);
        assert_eq!(reports.len(), 3);
        assert!(reports.values().all(|r| r.is_ok()));

        let bundle = forecaster.forecast_bundle(&history, 30).unwrap();
        assert_eq!(bundle.daily.len(), 30);
        assert_eq!(
            bundle.daily[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
        );
        assert!(bundle.daily.iter().all(|p| p.inflow.is_some()
            && p.outflow.is_some()
            && p.level.is_some()));
        assert_eq!(bundle.weekly.len(), 4);
        assert_eq!(bundle.monthly.len(), 1);
    }

    #[test]
    fn test_missing_signal_is_skipped() {
        let history = history(30, false);
        let forecaster = ReservoirForecaster::new(&config());
        let reports = forecaster.train_all(&history);
        assert!(!reports.contains_key(&Signal::Outflow));
        assert_eq!(
            forecaster.forecaster(Signal::Outflow).map(|f| f.status()),
            Some(ModelStatus::Idle)
        );

        let bundle = forecaster.forecast_bundle(&history, 7).unwrap();
        assert!(bundle.daily.iter().all(|p| p.outflow.is_none() && p.inflow.is_some()));
    }

    #[test]
    fn test_trailing_gap_is_forecast_through() {
        let mut history = history(30, true);
        let level: Vec<f64> = history.level.values()[..28].to_vec();
        history.level =
            TimeSeries::from_values(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &level).unwrap();
        let forecaster = ReservoirForecaster::new(&config());
        assert!(forecaster.train_all(&history).values().all(|r| r.is_ok()));

        let bundle = forecaster.forecast_bundle(&history, 5).unwrap();
        assert_eq!(bundle.daily.len(), 5);
        assert_eq!(
            bundle.daily[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
        );

        // level stops on Jan 28: its Jan 31 value is the third step from there
        let direct = forecaster
            .forecaster(Signal::Level)
            .unwrap()
            .forecast(&level, 7)
            .unwrap();
        for (point, expected) in bundle.daily.iter().zip(&direct[2..]) {
            assert_eq!(point.level, Some(expected.max(0.0)));
        }
        assert!(bundle.daily.iter().all(|p| p.inflow.is_some() && p.outflow.is_some()));
    }

    #[test]
    fn test_short_signal_fails_alone() {
        let mut history = history(30, true);
        history.level = TimeSeries::from_values(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            &[1.0, 2.0, 3.0],
        )
        .unwrap();
        let forecaster = ReservoirForecaster::new(&config());
        let reports = forecaster.train_all(&history);
        assert!(reports[&Signal::Inflow].is_ok());
        assert!(reports[&Signal::Level]
            .as_ref()
            .is_err_and(|e| e.is_insufficient_data()));
    }
}
