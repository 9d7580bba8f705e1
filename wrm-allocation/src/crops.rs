/// Crop water profiles and growth stages
use crate::error::CropTableError;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::include_str;

/// Base daily requirement per crop, liters per hectare
pub static CROPS_CSV: &str = include_str!("../../fixtures/crops.csv");
/// Ordered growth stages per crop
pub static GROWTH_STAGES_CSV: &str = include_str!("../../fixtures/growth_stages.csv");

/// A phase of a crop's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthStage {
    pub name: String,
    pub duration_days: u32,
    /// Demand relative to the crop's base requirement
    pub water_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    pub name: String,
    /// Liters per day per hectare
    pub base_requirement: f64,
    /// In lifecycle order; empty when no stage data exists
    pub stages: Vec<GrowthStage>,
}

impl CropProfile {
    /// The stage a crop planted `days_since_planting` days ago is in.
    ///
    /// Stage durations are consumed in order until the remaining day count
    /// falls inside one; a crop past its last stage stays in the last stage.
    pub fn stage_at(&self, days_since_planting: u32) -> Option<&GrowthStage> {
        let mut remaining = days_since_planting;
        for stage in &self.stages {
            if remaining < stage.duration_days {
                return Some(stage);
            }
            remaining -= stage.duration_days;
        }
        self.stages.last()
    }

    /// Growth-stage multiplier, 1 without stage data.
    pub fn multiplier_at(&self, days_since_planting: u32) -> f64 {
        self.stage_at(days_since_planting)
            .map_or(1.0, |stage| stage.water_multiplier)
    }
}

#[derive(Debug, Deserialize)]
struct CropRow {
    #[serde(rename = "Crop")]
    crop: String,
    #[serde(rename = "BaseRequirement")]
    base_requirement: f64,
}

#[derive(Debug, Deserialize)]
struct StageRow {
    #[serde(rename = "Crop")]
    crop: String,
    #[serde(rename = "Stage")]
    stage: String,
    #[serde(rename = "DurationDays")]
    duration_days: u32,
    #[serde(rename = "WaterMultiplier")]
    water_multiplier: f64,
}

/// Read-only crop reference data.
#[derive(Debug, Clone, PartialEq)]
pub struct CropTable {
    crops: Vec<CropProfile>,
}

impl CropTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<CropTable, CropTableError> {
        CropTable::parse(CROPS_CSV, GROWTH_STAGES_CSV)
    }

    /// Parse a crop table from custom CSV.
    ///
    /// `crops_csv` has the header `Crop,BaseRequirement`; `stages_csv` has
    /// `Crop,Stage,DurationDays,WaterMultiplier` with each crop's stages in
    /// lifecycle order.
    ///
    /// # Errors
    ///
    /// Returns `CropTableError::Csv` for malformed rows, and the other
    /// variants for non-positive values, duplicates, orphan stages or an
    /// empty table.
    pub fn parse(crops_csv: &str, stages_csv: &str) -> Result<CropTable, CropTableError> {
        let mut crops: Vec<CropProfile> = Vec::new();
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(crops_csv.as_bytes());
        for row in rdr.deserialize() {
            let row: CropRow = row?;
            let name = row.crop.to_lowercase();
            if !(row.base_requirement.is_finite() && row.base_requirement > 0.0) {
                return Err(CropTableError::BadValue {
                    crop: name,
                    field: "BaseRequirement",
                    value: row.base_requirement,
                });
            }
            if crops.iter().any(|c| c.name == name) {
                return Err(CropTableError::DuplicateCrop(name));
            }
            crops.push(CropProfile {
                name,
                base_requirement: row.base_requirement,
                stages: Vec::new(),
            });
        }
        if crops.is_empty() {
            return Err(CropTableError::Empty);
        }

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(stages_csv.as_bytes());
        for row in rdr.deserialize() {
            let row: StageRow = row?;
            let name = row.crop.to_lowercase();
            if !(row.water_multiplier.is_finite() && row.water_multiplier > 0.0) {
                return Err(CropTableError::BadValue {
                    crop: name,
                    field: "WaterMultiplier",
                    value: row.water_multiplier,
                });
            }
            let profile = crops.iter_mut().find(|c| c.name == name).ok_or_else(|| {
                CropTableError::StageWithoutCrop {
                    crop: name.clone(),
                    stage: row.stage.clone(),
                }
            })?;
            profile.stages.push(GrowthStage {
                name: row.stage,
                duration_days: row.duration_days,
                water_multiplier: row.water_multiplier,
            });
        }
        Ok(CropTable { crops })
    }

    /// Case-insensitive lookup.
    pub fn get(&self, crop: &str) -> Option<&CropProfile> {
        let wanted = crop.trim();
        self.crops
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(wanted))
    }

    pub fn crops(&self) -> &[CropProfile] {
        &self.crops
    }

    /// Mean base requirement over every known crop; the estimate used for
    /// crops missing from the table.
    pub fn mean_base_requirement(&self) -> f64 {
        let total: f64 = self.crops.iter().map(|c| c.base_requirement).sum();
        total / self.crops.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let table = CropTable::builtin().unwrap();
        assert_eq!(table.crops().len(), 10);
        let corn = table.get("Corn").unwrap();
        assert_eq!(corn.base_requirement, 55000.0);
        assert_eq!(corn.stages.len(), 4);
        assert_eq!(corn.stages[0].name, "initial");
        // permanent crops carry no stage data
        assert!(table.get("almonds").unwrap().stages.is_empty());
        assert!(table.get("kale").is_none());
    }

    #[test]
    fn test_mean_base_requirement() {
        let table = CropTable::parse("Crop,BaseRequirement\na,100\nb,300\n", "Crop,Stage,DurationDays,WaterMultiplier\n")
            .unwrap();
        assert_eq!(table.mean_base_requirement(), 200.0);
    }

    #[test]
    fn test_stage_walk() {
        let table = CropTable::builtin().unwrap();
        let corn = table.get("corn").unwrap();
        // initial 25, development 35, mid-season 40, late-season 30
        assert_eq!(corn.stage_at(0).unwrap().name, "initial");
        assert_eq!(corn.stage_at(24).unwrap().name, "initial");
        assert_eq!(corn.stage_at(25).unwrap().name, "development");
        assert_eq!(corn.stage_at(60).unwrap().name, "mid-season");
        assert_eq!(corn.stage_at(129).unwrap().name, "late-season");
        assert_eq!(corn.stage_at(400).unwrap().name, "late-season");
        assert_eq!(corn.multiplier_at(70), 1.2);
        assert_eq!(table.get("grapes").unwrap().multiplier_at(70), 1.0);
    }

    #[test]
    fn test_parse_errors() {
        let stages = "Crop,Stage,DurationDays,WaterMultiplier\n";
        assert!(matches!(
            CropTable::parse("Crop,BaseRequirement\n", stages),
            Err(CropTableError::Empty)
        ));
        assert!(matches!(
            CropTable::parse("Crop,BaseRequirement\nrice,-1\n", stages),
            Err(CropTableError::BadValue { .. })
        ));
        assert!(matches!(
            CropTable::parse("Crop,BaseRequirement\nrice,1\nRice,2\n", stages),
            Err(CropTableError::DuplicateCrop(_))
        ));
        assert!(matches!(
            CropTable::parse("Crop,BaseRequirement\nrice,1\n", "Crop,Stage,DurationDays,WaterMultiplier\nrye,initial,10,0.5\n"),
            Err(CropTableError::StageWithoutCrop { .. })
        ));
        assert!(matches!(
            CropTable::parse("Crop,BaseRequirement\nrice,lots\n", stages),
            Err(CropTableError::Csv(_))
        ));
    }
}
