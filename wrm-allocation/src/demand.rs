//! Crop water demand.

use crate::{
    crops::CropTable,
    error::CropTableError,
    irrigation::{AllocationConfig, IrrigationMethod},
};

/// Daily water requirement of a planted field, in liters.
#[derive(Debug, Clone)]
pub struct DemandCalculator {
    table: CropTable,
    config: AllocationConfig,
}

impl DemandCalculator {
    pub fn new(table: CropTable, config: AllocationConfig) -> Self {
        Self { table, config }
    }

    /// Built-in crop table with the given settings.
    pub fn builtin(config: AllocationConfig) -> Result<Self, CropTableError> {
        Ok(Self::new(CropTable::builtin()?, config))
    }

    pub fn table(&self) -> &CropTable {
        &self.table
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Base requirement (L/day/ha); the table mean for an unknown crop.
    pub fn base_requirement(&self, crop: &str) -> f64 {
        match self.table.get(crop) {
            Some(profile) => profile.base_requirement,
            None => {
                let mean = self.table.mean_base_requirement();
                log::info!("unknown crop {:?}, using mean requirement {:.0} L/day/ha", crop, mean);
                mean
            }
        }
    }

    /// `base * stage multiplier * field size * irrigation efficiency`.
    pub fn daily_requirement(
        &self,
        crop: &str,
        field_size_ha: f64,
        days_since_planting: u32,
        method: IrrigationMethod,
    ) -> f64 {
        let base = self.base_requirement(crop);
        let multiplier = self
            .table
            .get(crop)
            .map_or(1.0, |profile| profile.multiplier_at(days_since_planting));
        base * multiplier * field_size_ha * self.config.efficiency(method)
    }
}
