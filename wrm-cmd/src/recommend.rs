//! Crop demand and allocation commands.

use serde::Serialize;
use wrm_allocation::{
    AllocationRecommendation, DemandCalculator, IrrigationMethod, RecommendationRequest,
    ReservoirOutlook,
};
use wrm_core::{ForecastBundle, ReservoirSnapshot};

use crate::{
    forecast::build_bundle,
    settings::{read_history, Settings},
};

/// Output of `recommend`.
#[derive(Debug, Serialize)]
pub struct Recommendation {
    pub forecast: ForecastBundle,
    pub recommendation: AllocationRecommendation,
}

/// A field as given on the command line.
#[derive(Debug, Clone)]
pub struct Field {
    pub crop: String,
    pub field_size_ha: f64,
    pub days_since_planting: u32,
    pub irrigation: IrrigationMethod,
}

/// `recommend`: forecast the reservoir and recommend an allocation.
///
/// Without `--current-level` the last recorded level of the history is the
/// live reading.
pub async fn run_recommend(
    history_csv: &str,
    models_dir: Option<&str>,
    field: Field,
    capacity: f64,
    current_level: Option<f64>,
    config: Option<&str>,
) -> anyhow::Result<()> {
    let settings = Settings::load(config)?;
    let history = read_history(history_csv)?;
    let today = history
        .last_date()
        .ok_or_else(|| anyhow::anyhow!("history in {} has no observations", history_csv))?;
    let forecast = build_bundle(
        &history,
        models_dir,
        &settings.forecast.model,
        settings.forecast.horizon_days,
    )
    .await?;

    let calculator = DemandCalculator::builtin(settings.allocation)?;
    let request = RecommendationRequest {
        crop: field.crop,
        field_size_ha: field.field_size_ha,
        days_since_planting: field.days_since_planting,
        irrigation: field.irrigation,
        today,
    };
    let snapshot = ReservoirSnapshot {
        capacity,
        current_level: current_level.or_else(|| history.level.last_value()),
    };
    let recommendation =
        calculator.recommend(&request, &ReservoirOutlook::from_bundle(&forecast), &snapshot)?;

    let output = Recommendation {
        forecast,
        recommendation,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// `demand`: print the daily requirement of a field in liters.
pub fn run_demand(field: Field, config: Option<&str>) -> anyhow::Result<()> {
    let settings = Settings::load(config)?;
    let calculator = DemandCalculator::builtin(settings.allocation)?;
    let liters = calculator.daily_requirement(
        &field.crop,
        field.field_size_ha,
        field.days_since_planting,
        field.irrigation,
    );
    println!("{:.0}", liters);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> Field {
        Field {
            crop: "corn".to_string(),
            field_size_ha: 2.0,
            days_since_planting: 40,
            irrigation: IrrigationMethod::Drip,
        }
    }

    #[tokio::test]
    async fn test_run_recommend_from_history_file() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("history.csv");
        let settings = dir.path().join("settings.json");
        let mut csv = String::from("Date,Inflow,Outflow,Level\n");
        for day in 1..=25 {
            let wave = (day % 4) as f64;
            csv.push_str(&format!(
                "2024-05-{:02},{:.1},{:.1},{:.1}\n",
                day,
                30.0 + wave,
                25.0 + wave,
                4000.0 + wave * 10.0
            ));
        }
        std::fs::write(&history, csv).unwrap();
        std::fs::write(
            &settings,
            r#"{ "forecast": { "horizon_days": 7, "model": { "window_size": 4, "hidden_sizes": [4], "epochs": 2 } } }"#,
        )
        .unwrap();

        run_recommend(
            history.to_str().unwrap(),
            None,
            field(),
            10_000.0,
            None,
            settings.to_str(),
        )
        .await
        .unwrap();

        let err = run_recommend(
            history.to_str().unwrap(),
            None,
            field(),
            0.0,
            Some(100.0),
            settings.to_str(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_run_demand() {
        assert!(run_demand(field(), None).is_ok());

        let dir = tempfile::tempdir().unwrap();
        let settings = dir.path().join("settings.json");
        std::fs::write(&settings, r#"{ "allocation": { "liters_per_reservoir_unit": 0 } }"#).unwrap();
        assert!(run_demand(field(), settings.to_str()).is_err());
    }
}
