use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    forecast::Signal,
    series::{SeriesError, TimeSeries, TimeSeriesPoint},
};

/// Errors raised while reading a reservoir history CSV.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("history csv has no `{0}` column")]
    MissingColumn(&'static str),
    #[error("row {row}: unparseable date `{value}`")]
    BadDate { row: usize, value: String },
    #[error("{signal} series: {source}")]
    Series {
        signal: Signal,
        #[source]
        source: SeriesError,
    },
}

/// Daily history of one reservoir: one series per tracked signal.
///
/// Blank or non-numeric cells are gaps; the signal's series simply has no
/// point on that date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservoirHistory {
    pub inflow: TimeSeries,
    pub outflow: TimeSeries,
    pub level: TimeSeries,
}

/// Live state of a reservoir used by the allocation engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReservoirSnapshot {
    /// Capacity, in reservoir units (m³)
    pub capacity: f64,
    /// Latest measured level, if a live reading is available
    pub current_level: Option<f64>,
}

#[derive(Debug, Default)]
struct Columns {
    date: Option<usize>,
    inflow: Option<usize>,
    outflow: Option<usize>,
    level: Option<usize>,
}

impl Columns {
    /// Match headers by prefix so both `Level` and `Level (m³)` are accepted.
    fn from_headers(headers: &StringRecord) -> Columns {
        let mut columns = Columns::default();
        for (i, header) in headers.iter().enumerate() {
            let h = header.trim().to_lowercase();
            if h.starts_with("date") {
                columns.date.get_or_insert(i);
            } else if h.starts_with("inflow") {
                columns.inflow.get_or_insert(i);
            } else if h.starts_with("outflow") {
                columns.outflow.get_or_insert(i);
            } else if h.starts_with("level") {
                columns.level.get_or_insert(i);
            }
        }
        columns
    }
}

fn parse_cell(record: &StringRecord, column: Option<usize>) -> Option<f64> {
    column
        .and_then(|c| record.get(c))
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

impl ReservoirHistory {
    /// Parse a history CSV.
    ///
    /// Expected format (with headers): `Date,Inflow,Outflow,Level`
    ///
    /// # Example CSV
    /// ```text
    /// Date,Inflow,Outflow,Level
    /// 2024-01-01,120.5,98.0,45000
    /// 2024-01-02,,101.2,45019
    /// ```
    ///
    /// Dates may be `YYYY-MM-DD` or `YYYYMMDD`. Rows must be in date order.
    /// At least the date column and one signal column are required.
    pub fn parse_history_csv(csv_object: &str) -> Result<ReservoirHistory, HistoryError> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_object.as_bytes());
        let columns = Columns::from_headers(rdr.headers()?);
        let date_column = columns.date.ok_or(HistoryError::MissingColumn("Date"))?;
        if columns.inflow.is_none() && columns.outflow.is_none() && columns.level.is_none() {
            return Err(HistoryError::MissingColumn("Inflow/Outflow/Level"));
        }

        let mut inflow = Vec::new();
        let mut outflow = Vec::new();
        let mut level = Vec::new();
        let mut skipped = 0u32;
        for (i, row) in rdr.records().enumerate() {
            let record = row?;
            let raw_date = record.get(date_column).unwrap_or("").trim();
            if raw_date.is_empty() {
                skipped += 1;
                continue;
            }
            let date = wrm_utils::dates::parse_date_any(raw_date).map_err(|_| {
                HistoryError::BadDate {
                    row: i + 1,
                    value: raw_date.to_string(),
                }
            })?;
            if let Some(v) = parse_cell(&record, columns.inflow) {
                inflow.push(TimeSeriesPoint::new(date, v));
            }
            if let Some(v) = parse_cell(&record, columns.outflow) {
                outflow.push(TimeSeriesPoint::new(date, v));
            }
            if let Some(v) = parse_cell(&record, columns.level) {
                level.push(TimeSeriesPoint::new(date, v));
            }
        }

        let build = |signal: Signal, points: Vec<TimeSeriesPoint>| {
            TimeSeries::new(points).map_err(|source| HistoryError::Series { signal, source })
        };
        let history = ReservoirHistory {
            inflow: build(Signal::Inflow, inflow)?,
            outflow: build(Signal::Outflow, outflow)?,
            level: build(Signal::Level, level)?,
        };
        log::info!(
            "history: loaded {} inflow, {} outflow, {} level observations, skipped {} rows",
            history.inflow.len(),
            history.outflow.len(),
            history.level.len(),
            skipped
        );
        Ok(history)
    }

    /// The series for a reservoir signal. `Consumption` is not tracked per
    /// reservoir and yields `None`.
    pub fn series(&self, signal: Signal) -> Option<&TimeSeries> {
        match signal {
            Signal::Inflow => Some(&self.inflow),
            Signal::Outflow => Some(&self.outflow),
            Signal::Level => Some(&self.level),
            Signal::Consumption => None,
        }
    }

    /// Latest date observed on any signal.
    pub fn last_date(&self) -> Option<chrono::NaiveDate> {
        [&self.inflow, &self.outflow, &self.level]
            .iter()
            .filter_map(|s| s.last_date())
            .max()
    }
}
