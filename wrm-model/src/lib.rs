//! Recurrent sequence models for daily water time series.
//!
//! Each signal (inflow, outflow, reservoir level, consumption) gets its own
//! univariate model: a stack of LSTM layers trained on sliding windows of
//! the min/max normalized series, used to forecast one day at a time.
//!
//! ```no_run
//! use wrm_core::Signal;
//! use wrm_model::{ModelConfig, SignalForecaster};
//!
//! # fn main() -> wrm_model::Result<()> {
//! let history: Vec<f64> = (0..90).map(|d| 1200.0 + (d % 30) as f64 * 4.0).collect();
//! let forecaster = SignalForecaster::new(Signal::Inflow, ModelConfig::default());
//! forecaster.train(&history)?;
//! let next_month = forecaster.forecast(&history, 30)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod forecaster;
pub mod iterative;
pub mod model;
pub mod network;
pub mod optimizer;
pub mod reservoir;
mod trainer;

pub use config::{ForecastConfig, ModelConfig, StepFallback};
pub use error::{ModelError, NotReadyReason, NumericError, PredictionStepError, Result};
pub use forecaster::{ModelStatus, SignalForecaster};
pub use iterative::StepPredictor;
pub use model::TrainedModel;
pub use reservoir::ReservoirForecaster;
pub use trainer::TrainingReport;
