//! Allocation recommendation from a reservoir forecast and crop demand.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use wrm_core::{forecast::DAYS_PER_WEEK, ForecastBundle, ReservoirSnapshot, Signal};
use wrm_utils::dates::days_after;

use crate::{
    demand::DemandCalculator,
    error::{AllocationError, Result},
    irrigation::IrrigationMethod,
};

const CRITICAL_FULLNESS: f64 = 0.30;
const WARNING_FULLNESS: f64 = 0.60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStatus {
    Optimal,
    Warning,
    Critical,
}

impl AllocationStatus {
    /// Classify reservoir fullness (level / capacity).
    pub fn from_fullness(fullness: f64) -> Self {
        if fullness < CRITICAL_FULLNESS {
            AllocationStatus::Critical
        } else if fullness < WARNING_FULLNESS {
            AllocationStatus::Warning
        } else {
            AllocationStatus::Optimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStatus::Optimal => "optimal",
            AllocationStatus::Warning => "warning",
            AllocationStatus::Critical => "critical",
        }
    }

    /// Days of crop demand to release.
    pub fn supply_days(&self) -> u32 {
        match self {
            AllocationStatus::Critical => 3,
            AllocationStatus::Warning => 5,
            AllocationStatus::Optimal => 7,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AllocationStatus::Critical => {
                "Reservoir critically low: water is scarce, release only three days of supply and irrigate essential crops first."
            }
            AllocationStatus::Warning => {
                "Reservoir below 60% of capacity: release five days of supply and irrigate with caution."
            }
            AllocationStatus::Optimal => {
                "Reservoir levels are sufficient for a full week of irrigation."
            }
        }
    }
}

/// Suggested release for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRecommendation {
    /// Liters, rounded to the nearest liter
    pub recommended_amount: f64,
    pub recommended_date: NaiveDate,
    pub status: AllocationStatus,
    pub message: String,
    /// Reservoir units after the release
    pub projected_reservoir_level: f64,
    pub impact_message: String,
}

/// The field a recommendation is made for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub crop: String,
    pub field_size_ha: f64,
    pub days_since_planting: u32,
    pub irrigation: IrrigationMethod,
    /// Day 0 of the forecast; forecast day `i` is `today + i + 1`
    pub today: NaiveDate,
}

/// Forecasted reservoir signals, day 1 first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservoirOutlook {
    pub level: Vec<f64>,
    pub inflow: Vec<f64>,
    pub outflow: Vec<f64>,
}

impl ReservoirOutlook {
    pub fn from_levels(level: Vec<f64>) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn from_bundle(bundle: &ForecastBundle) -> Self {
        Self {
            level: bundle.signal_values(Signal::Level),
            inflow: bundle.signal_values(Signal::Inflow),
            outflow: bundle.signal_values(Signal::Outflow),
        }
    }

    /// Net inflow over the first `days` days, when both flows are forecast.
    fn net_flow(&self, days: usize) -> Option<f64> {
        if self.inflow.is_empty() || self.outflow.is_empty() {
            return None;
        }
        Some(
            self.inflow
                .iter()
                .zip(&self.outflow)
                .take(days)
                .map(|(i, o)| i - o)
                .sum(),
        )
    }
}

/// Index of the strictly highest level within the first week that beats
/// `current`; ties go to the earliest day.
fn best_day(levels: &[f64], current: f64) -> Option<usize> {
    let mut best = current;
    let mut best_day = None;
    for (i, &level) in levels.iter().take(DAYS_PER_WEEK).enumerate() {
        if level > best {
            best = level;
            best_day = Some(i);
        }
    }
    best_day
}

impl DemandCalculator {
    /// Recommend how much water to release for `request`, and when.
    ///
    /// # Errors
    ///
    /// `InvalidCapacity` for a non-positive capacity, `NoLevelReading` when
    /// there is neither a current level nor a level forecast, `InvalidLevel`
    /// for a non-finite level, and `InvalidFieldSize` for a negative field.
    pub fn recommend(
        &self,
        request: &RecommendationRequest,
        outlook: &ReservoirOutlook,
        snapshot: &ReservoirSnapshot,
    ) -> Result<AllocationRecommendation> {
        if !(snapshot.capacity.is_finite() && snapshot.capacity > 0.0) {
            return Err(AllocationError::InvalidCapacity(snapshot.capacity));
        }
        if !(request.field_size_ha.is_finite() && request.field_size_ha >= 0.0) {
            return Err(AllocationError::InvalidFieldSize(request.field_size_ha));
        }
        let current = snapshot
            .current_level
            .or_else(|| outlook.level.first().copied())
            .ok_or(AllocationError::NoLevelReading)?;
        if !current.is_finite() {
            return Err(AllocationError::InvalidLevel(current));
        }

        let daily = self.daily_requirement(
            &request.crop,
            request.field_size_ha,
            request.days_since_planting,
            request.irrigation,
        );
        let weekly = daily * DAYS_PER_WEEK as f64;

        let fullness = current / snapshot.capacity;
        let status = AllocationStatus::from_fullness(fullness);
        let days = status.supply_days();
        let amount = (daily * days as f64).round();

        let recommended_date = match best_day(&outlook.level, current) {
            Some(i) => days_after(&request.today, i as i64 + 1),
            None => request.today,
        };

        let release = amount / self.config().liters_per_reservoir_unit;
        let projected = match outlook.net_flow(days as usize) {
            Some(net) => current + net - release,
            None => current - release,
        };
        let impact_message = format!(
            "Weekly crop demand is {:.0} L. Releasing {:.0} L ({} days) leaves the reservoir at {:.2} ({:.1}% of capacity).",
            weekly,
            amount,
            days,
            projected,
            projected / snapshot.capacity * 100.0
        );
        log::debug!(
            "{} recommendation for {} ({} ha): {:.0} L on {}",
            status.as_str(),
            request.crop,
            request.field_size_ha,
            amount,
            recommended_date
        );

        Ok(AllocationRecommendation {
            recommended_amount: amount,
            recommended_date,
            status,
            message: status.message().to_string(),
            projected_reservoir_level: projected,
            impact_message,
        })
    }
}
