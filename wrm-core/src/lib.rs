//! Core types for water resource forecasting.
//!
//! Time series input, per-signal forecast output, reservoir history
//! parsing and the export formats consumed by the dashboard.

pub mod date_range;
pub mod export;
pub mod forecast;
pub mod reservoir;
pub mod series;

pub use forecast::{ForecastBundle, ForecastPoint, Signal};
pub use reservoir::{ReservoirHistory, ReservoirSnapshot};
pub use series::{SeriesError, TimeSeries, TimeSeriesPoint};
