use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::date_range::DateRange;

/// Every `DAYS_PER_WEEK`th daily point is sampled into the weekly view.
pub const DAYS_PER_WEEK: usize = 7;

/// The daily point at this (1-based) position becomes the monthly view.
pub const DAYS_PER_MONTH: usize = 30;

/// Default forecast horizon in days.
pub const DEFAULT_HORIZON_DAYS: usize = 30;

/// A tracked signal. Each signal gets its own independently trained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Inflow,
    Outflow,
    Level,
    Consumption,
}

impl Signal {
    /// The three signals forecast for a reservoir.
    pub const RESERVOIR: [Signal; 3] = [Signal::Inflow, Signal::Outflow, Signal::Level];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Inflow => "inflow",
            Signal::Outflow => "outflow",
            Signal::Level => "level",
            Signal::Consumption => "consumption",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inflow" => Ok(Signal::Inflow),
            "outflow" => Ok(Signal::Outflow),
            "level" => Ok(Signal::Level),
            "consumption" | "value" => Ok(Signal::Consumption),
            other => Err(format!("unknown signal: {other}")),
        }
    }
}

/// One forecast day. Only the modeled signals are present.
///
/// Values are clamped to be non-negative when packaged; a reservoir cannot
/// hold or release a negative volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflow: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outflow: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl ForecastPoint {
    pub fn new(date: NaiveDate) -> Self {
        ForecastPoint {
            date,
            inflow: None,
            outflow: None,
            level: None,
            value: None,
        }
    }

    /// Set the value for `signal`, clamped at zero.
    pub fn set(&mut self, signal: Signal, value: f64) {
        let clamped = Some(value.max(0.0));
        match signal {
            Signal::Inflow => self.inflow = clamped,
            Signal::Outflow => self.outflow = clamped,
            Signal::Level => self.level = clamped,
            Signal::Consumption => self.value = clamped,
        }
    }

    pub fn get(&self, signal: Signal) -> Option<f64> {
        match signal {
            Signal::Inflow => self.inflow,
            Signal::Outflow => self.outflow,
            Signal::Level => self.level,
            Signal::Consumption => self.value,
        }
    }
}

/// Daily, weekly and monthly views of one forecast run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    pub daily: Vec<ForecastPoint>,
    pub weekly: Vec<ForecastPoint>,
    pub monthly: Vec<ForecastPoint>,
}

impl ForecastBundle {
    /// Derive the weekly (every 7th day) and monthly (day 30) views.
    pub fn from_daily(daily: Vec<ForecastPoint>) -> ForecastBundle {
        let weekly = daily
            .iter()
            .enumerate()
            .filter(|(i, _)| (i + 1) % DAYS_PER_WEEK == 0)
            .map(|(_, p)| p.clone())
            .collect();
        let monthly = daily
            .get(DAYS_PER_MONTH - 1)
            .cloned()
            .into_iter()
            .collect();
        ForecastBundle {
            daily,
            weekly,
            monthly,
        }
    }

    /// Lay raw per-signal forecasts out on the days after `anchor`.
    ///
    /// The horizon is the longest of the supplied forecasts; a signal with a
    /// shorter forecast is absent from the trailing days.
    pub fn from_signals(anchor: NaiveDate, forecasts: &[(Signal, Vec<f64>)]) -> ForecastBundle {
        let horizon = forecasts.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let daily = DateRange::following(anchor, horizon)
            .enumerate()
            .map(|(i, date)| {
                let mut point = ForecastPoint::new(date);
                for (signal, values) in forecasts {
                    if let Some(v) = values.get(i) {
                        point.set(*signal, *v);
                    }
                }
                point
            })
            .collect();
        ForecastBundle::from_daily(daily)
    }

    /// Daily values of one signal, in date order. Days where the signal is
    /// absent are skipped.
    pub fn signal_values(&self, signal: Signal) -> Vec<f64> {
        self.daily.iter().filter_map(|p| p.get(signal)).collect()
    }
}
