//! Export of the daily forecast for downstream consumers.
//!
//! The CSV layout (`Date,Inflow (m³),Outflow (m³),Level (m³)`, two decimal
//! places) is consumed by existing dashboard tooling and must not change.

use std::str::FromStr;
use thiserror::Error;

use crate::forecast::{ForecastBundle, ForecastPoint};

/// Header row of the CSV export.
pub const CSV_HEADER: [&str; 4] = ["Date", "Inflow (m³)", "Outflow (m³)", "Level (m³)"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("json export failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("export i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("export is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

fn fixed(value: Option<f64>) -> String {
    value.map_or(String::new(), |v| format!("{:.2}", v))
}

/// Pretty-printed JSON array of the daily points.
pub fn daily_to_json(bundle: &ForecastBundle) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&bundle.daily)?)
}

/// CSV of the daily points. Signals that were not forecast are empty cells.
pub fn daily_to_csv(bundle: &ForecastBundle) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(CSV_HEADER)?;
    for ForecastPoint {
        date,
        inflow,
        outflow,
        level,
        ..
    } in &bundle.daily
    {
        wtr.write_record([
            wrm_utils::dates::format_date(date),
            fixed(*inflow),
            fixed(*outflow),
            fixed(*level),
        ])?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn export_daily(bundle: &ForecastBundle, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => daily_to_json(bundle),
        ExportFormat::Csv => daily_to_csv(bundle),
    }
}
