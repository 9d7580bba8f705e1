//! Forecast command.

use anyhow::Context;
use log::info;
use std::path::Path;
use wrm_core::{
    export::{export_daily, ExportFormat},
    ForecastBundle, ReservoirHistory,
};
use wrm_model::{ModelConfig, ReservoirForecaster};

use crate::{
    settings::{read_history, Settings},
    train::{load_models, train_models},
};

/// Forecast `days` ahead of `history`, training fresh models unless a
/// model directory is given.
pub async fn build_bundle(
    history: &ReservoirHistory,
    models_dir: Option<&str>,
    config: &ModelConfig,
    days: usize,
) -> anyhow::Result<ForecastBundle> {
    let models = match models_dir {
        Some(dir) => load_models(Path::new(dir))?,
        None => train_models(history, config).await?,
    };
    let forecaster = ReservoirForecaster::from_trained(config, models);
    let bundle = forecaster.forecast_bundle(history, days)?;
    info!(
        "forecast {} days ({} weekly, {} monthly points)",
        bundle.daily.len(),
        bundle.weekly.len(),
        bundle.monthly.len()
    );
    Ok(bundle)
}

/// `forecast`: export the daily forecast to `output`, or print the whole
/// bundle as JSON when no output path is given.
pub async fn run_forecast(
    history_csv: &str,
    models_dir: Option<&str>,
    days: Option<usize>,
    format: ExportFormat,
    output: Option<&str>,
    config: Option<&str>,
) -> anyhow::Result<()> {
    let settings = Settings::load(config)?;
    let history = read_history(history_csv)?;
    let days = days.unwrap_or(settings.forecast.horizon_days);
    let bundle = build_bundle(&history, models_dir, &settings.forecast.model, days).await?;

    match output {
        Some(path) => {
            let text = export_daily(&bundle, format)?;
            std::fs::write(path, text).with_context(|| format!("writing {}", path))?;
            info!("wrote daily forecast to {}", path);
        }
        None => println!("{}", serde_json::to_string_pretty(&bundle)?),
    }
    Ok(())
}
