//! Irrigation methods and allocation settings.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{AllocationError, Result};

/// How water is delivered to the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IrrigationMethod {
    Flood,
    Furrow,
    Sprinkler,
    Drip,
}

impl IrrigationMethod {
    pub const ALL: [IrrigationMethod; 4] = [
        IrrigationMethod::Flood,
        IrrigationMethod::Furrow,
        IrrigationMethod::Sprinkler,
        IrrigationMethod::Drip,
    ];

    /// Share of the flood-irrigation demand this method needs.
    ///
    /// Applied as the last factor of the crop demand, after the growth-stage
    /// multiplier. Overridable per method in [`AllocationConfig`].
    pub const fn efficiency_factor(&self) -> f64 {
        match self {
            IrrigationMethod::Flood => 1.0,
            IrrigationMethod::Furrow => 0.9,
            IrrigationMethod::Sprinkler => 0.8,
            IrrigationMethod::Drip => 0.6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IrrigationMethod::Flood => "flood",
            IrrigationMethod::Furrow => "furrow",
            IrrigationMethod::Sprinkler => "sprinkler",
            IrrigationMethod::Drip => "drip",
        }
    }
}

impl fmt::Display for IrrigationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IrrigationMethod {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        IrrigationMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AllocationError::UnknownIrrigationMethod(s.to_string()))
    }
}

/// Liters per cubic meter.
pub const LITERS_PER_CUBIC_METER: f64 = 1000.0;

/// Settings of the demand calculator and recommendation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Per-method replacements for [`IrrigationMethod::efficiency_factor`]
    pub efficiency: BTreeMap<IrrigationMethod, f64>,
    /// Liters in one unit of reservoir volume
    pub liters_per_reservoir_unit: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            efficiency: BTreeMap::new(),
            liters_per_reservoir_unit: LITERS_PER_CUBIC_METER,
        }
    }
}

impl AllocationConfig {
    pub fn efficiency(&self, method: IrrigationMethod) -> f64 {
        self.efficiency
            .get(&method)
            .copied()
            .unwrap_or_else(|| method.efficiency_factor())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.liters_per_reservoir_unit.is_finite() && self.liters_per_reservoir_unit > 0.0) {
            return Err(AllocationError::InvalidConfig(
                "liters_per_reservoir_unit must be positive".to_string(),
            ));
        }
        if let Some((method, factor)) = self
            .efficiency
            .iter()
            .find(|(_, f)| !(f.is_finite() && **f > 0.0))
        {
            return Err(AllocationError::InvalidConfig(format!(
                "{} efficiency must be positive, got {}",
                method, factor
            )));
        }
        Ok(())
    }
}
