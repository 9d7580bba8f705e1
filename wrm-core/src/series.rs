use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::date_range::DateRange;

/// Errors raised while assembling a time series.
#[derive(Debug, Error, PartialEq, Clone)]
pub enum SeriesError {
    #[error("duplicate observation for {0}")]
    DuplicateDate(NaiveDate),
    #[error("observations out of order: {next} follows {previous}")]
    Unordered {
        previous: NaiveDate,
        next: NaiveDate,
    },
    #[error("non-finite value on {0}")]
    NonFinite(NaiveDate),
}

/// A single dated observation (a daily inflow, outflow, level or
/// consumption reading).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        TimeSeriesPoint { date, value }
    }
}

/// A date-ordered series of observations with no duplicate dates.
///
/// Dates are strictly increasing but not necessarily contiguous; gaps are
/// filled by `wrm_data::interpolation` before the series reaches a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries(Vec<TimeSeriesPoint>);

impl TimeSeries {
    /// Build a series, rejecting duplicate dates, out-of-order input and
    /// non-finite values.
    pub fn new(points: Vec<TimeSeriesPoint>) -> Result<TimeSeries, SeriesError> {
        for point in &points {
            if !point.value.is_finite() {
                return Err(SeriesError::NonFinite(point.date));
            }
        }
        for pair in points.windows(2) {
            let (previous, next) = (pair[0].date, pair[1].date);
            if next == previous {
                return Err(SeriesError::DuplicateDate(next));
            }
            if next < previous {
                return Err(SeriesError::Unordered { previous, next });
            }
        }
        Ok(TimeSeries(points))
    }

    /// Build a daily series of `values` starting on `start`.
    pub fn from_values(start: NaiveDate, values: &[f64]) -> Result<TimeSeries, SeriesError> {
        let dates = DateRange(start, NaiveDate::MAX);
        let points = dates
            .zip(values.iter())
            .map(|(date, value)| TimeSeriesPoint::new(date, *value))
            .collect();
        TimeSeries::new(points)
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.0
    }

    pub fn into_points(self) -> Vec<TimeSeriesPoint> {
        self.0
    }

    /// Raw values in date order.
    pub fn values(&self) -> Vec<f64> {
        self.0.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.0.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.0.last().map(|p| p.date)
    }

    pub fn last_value(&self) -> Option<f64> {
        self.0.last().map(|p| p.value)
    }
}
