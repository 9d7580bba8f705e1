//! Optional JSON settings file and history input.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use wrm_allocation::AllocationConfig;
use wrm_core::ReservoirHistory;
use wrm_model::ForecastConfig;

/// Contents of the `--config` file. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub forecast: ForecastConfig,
    pub allocation: AllocationConfig,
}

impl Settings {
    /// Defaults when `path` is `None`.
    pub fn load(path: Option<&str>) -> anyhow::Result<Settings> {
        let Some(path) = path else {
            return Ok(Settings::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path))?;
        let settings: Settings =
            serde_json::from_str(&text).with_context(|| format!("parsing settings in {}", path))?;
        settings.forecast.model.validate()?;
        settings.allocation.validate()?;
        Ok(settings)
    }
}

/// Read and parse a `Date,Inflow,Outflow,Level` history CSV.
pub fn read_history<P: AsRef<Path>>(path: P) -> anyhow::Result<ReservoirHistory> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading history from {}", path.display()))?;
    let history = ReservoirHistory::parse_history_csv(&text)
        .with_context(|| format!("parsing history in {}", path.display()))?;
    Ok(history)
}
