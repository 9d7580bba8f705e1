//! Model training and persistence commands.

use anyhow::Context;
use log::{info, warn};
use std::path::{Path, PathBuf};
use wrm_core::{ReservoirHistory, Signal};
use wrm_data::interpolation::fill_series;
use wrm_model::{ModelConfig, TrainedModel};

use crate::settings::{read_history, Settings};

/// Train a model per reservoir signal, each on its own blocking thread.
///
/// Signals without observations or with too little history are skipped
/// with a warning; any other training failure aborts.
pub async fn train_models(
    history: &ReservoirHistory,
    config: &ModelConfig,
) -> anyhow::Result<Vec<TrainedModel>> {
    let mut handles = Vec::with_capacity(Signal::RESERVOIR.len());
    for signal in Signal::RESERVOIR {
        let Some(series) = history.series(signal).filter(|s| !s.is_empty()) else {
            warn!("no {} observations in history, skipping", signal);
            continue;
        };
        let values = fill_series(series)?.values();
        let config = config.clone();
        let handle = tokio::task::spawn_blocking(move || TrainedModel::train(signal, &config, &values));
        handles.push((signal, handle));
    }

    let mut models = Vec::with_capacity(handles.len());
    for (signal, handle) in handles {
        match handle.await? {
            Ok(model) => models.push(model),
            Err(err) if err.is_insufficient_data() => {
                warn!("skipping {} model: {}", signal, err)
            }
            Err(err) => return Err(err).with_context(|| format!("training {} model", signal)),
        }
    }
    if models.is_empty() {
        anyhow::bail!("no signal has enough history to train a model");
    }
    Ok(models)
}

pub fn model_path(dir: &Path, signal: Signal) -> PathBuf {
    dir.join(format!("{}.json", signal))
}

/// Load whichever of the inflow/outflow/level models exist in `dir`.
pub fn load_models(dir: &Path) -> anyhow::Result<Vec<TrainedModel>> {
    let mut models = Vec::new();
    for signal in Signal::RESERVOIR {
        let path = model_path(dir, signal);
        if !path.exists() {
            continue;
        }
        let model = TrainedModel::load(&path)
            .with_context(|| format!("loading {}", path.display()))?;
        if model.signal != signal {
            anyhow::bail!("{} holds a {} model", path.display(), model.signal);
        }
        models.push(model);
    }
    if models.is_empty() {
        anyhow::bail!("no models found in {}", dir.display());
    }
    Ok(models)
}

/// `train`: fit and save one model per signal as `<output_dir>/<signal>.json`.
pub async fn run_train(
    history_csv: &str,
    output_dir: &str,
    config: Option<&str>,
) -> anyhow::Result<()> {
    let settings = Settings::load(config)?;
    let history = read_history(history_csv)?;
    let models = train_models(&history, &settings.forecast.model).await?;

    let dir = Path::new(output_dir);
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for model in &models {
        let path = model_path(dir, model.signal);
        model.save(&path)?;
        info!(
            "{}: {} windows, final loss {:.6} -> {}",
            model.signal,
            model.report.windows,
            model.report.final_loss,
            path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wrm_core::TimeSeries;

    fn history() -> ReservoirHistory {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let series = |base: f64| {
            let values: Vec<f64> = (0..20).map(|d| base + (d % 4) as f64).collect();
            TimeSeries::from_values(start, &values).unwrap()
        };
        ReservoirHistory {
            inflow: series(10.0),
            outflow: TimeSeries::default(),
            level: series(300.0),
        }
    }

    fn config() -> ModelConfig {
        ModelConfig::default()
            .with_window_size(3)
            .with_hidden_sizes(vec![3])
            .with_epochs(2)
    }

    #[tokio::test]
    async fn test_train_models_skips_empty_signals() {
        let models = train_models(&history(), &config()).await.unwrap();
        let signals: Vec<Signal> = models.iter().map(|m| m.signal).collect();
        assert_eq!(signals, vec![Signal::Inflow, Signal::Level]);
    }

    #[tokio::test]
    async fn test_saved_models_load_back() {
        let dir = tempfile::tempdir().unwrap();
        for model in train_models(&history(), &config()).await.unwrap() {
            model.save(model_path(dir.path(), model.signal)).unwrap();
        }
        let loaded = load_models(dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(dir.path().join("inflow.json").exists());
    }

    #[test]
    fn test_empty_model_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_models(dir.path()).is_err());
    }
}
