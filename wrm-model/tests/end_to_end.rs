use chrono::NaiveDate;
use wrm_core::{ForecastBundle, ReservoirHistory, Signal, TimeSeries};
use wrm_model::{ModelConfig, ReservoirForecaster, SignalForecaster};

fn seasonal(days: usize, base: f64, amplitude: f64) -> Vec<f64> {
    (0..days)
        .map(|d| base + amplitude * (d as f64 * std::f64::consts::TAU / 30.0).sin())
        .collect()
}

#[test]
fn sixty_days_in_thirty_days_out() {
    let history = seasonal(60, 400.0, 120.0);
    let forecaster = SignalForecaster::new(Signal::Inflow, ModelConfig::default());
    let report = forecaster.train(&history).unwrap();
    assert_eq!(report.windows, 60 - 7);
    assert_eq!(report.loss_history.len(), 50);

    let values = forecaster.forecast(&history, 30).unwrap();
    assert_eq!(values.len(), 30);

    let anchor = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    let bundle = ForecastBundle::from_signals(anchor, &[(Signal::Inflow, values)]);
    assert_eq!(bundle.daily.len(), 30);
    assert!(bundle.daily.iter().all(|p| p.inflow.is_some_and(|v| v >= 0.0)));
    assert_eq!(bundle.weekly.len(), 30 / 7);
    assert_eq!(bundle.monthly.len(), 1);
    assert_eq!(bundle.monthly[0], bundle.daily[29]);
}

#[test]
fn reservoir_bundle_from_history() {
    let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let history = ReservoirHistory {
        inflow: TimeSeries::from_values(start, &seasonal(60, 300.0, 80.0)).unwrap(),
        outflow: TimeSeries::from_values(start, &seasonal(60, 250.0, 40.0)).unwrap(),
        level: TimeSeries::from_values(start, &seasonal(60, 9000.0, 600.0)).unwrap(),
    };
    let config = ModelConfig::default()
        .with_hidden_sizes(vec![16, 8])
        .with_epochs(10);
    let forecaster = ReservoirForecaster::new(&config);
    let reports = forecaster.train_all(&history);
    assert!(reports.values().all(|r| r.is_ok()));

    let bundle = forecaster.forecast_bundle(&history, 30).unwrap();
    assert_eq!(bundle.daily.len(), 30);
    assert_eq!(bundle.daily[0].date, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    for signal in Signal::RESERVOIR {
        let values = bundle.signal_values(signal);
        assert_eq!(values.len(), 30);
        assert!(values.iter().all(|v| *v >= 0.0));
    }
}
