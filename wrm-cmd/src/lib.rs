//! Command implementations for the WRM CLI.
//!
//! Provides subcommands for training reservoir forecast models, exporting
//! forecasts and recommending irrigation allocations.

use clap::Subcommand;
use wrm_allocation::IrrigationMethod;
use wrm_core::export::ExportFormat;

pub mod forecast;
pub mod recommend;
pub mod settings;
pub mod train;

use recommend::Field;

#[derive(Subcommand)]
pub enum Command {
    /// Train inflow, outflow and level models and save them as JSON
    Train {
        /// History CSV with a Date,Inflow,Outflow,Level header
        #[arg(long)]
        history: String,

        /// Directory receiving <signal>.json model files
        #[arg(short = 'o', long)]
        output_dir: String,

        /// JSON settings file
        #[arg(short = 'c', long)]
        config: Option<String>,
    },

    /// Forecast reservoir inflow, outflow and level
    Forecast {
        /// History CSV with a Date,Inflow,Outflow,Level header
        #[arg(long)]
        history: String,

        /// Directory of saved models (trains fresh models when omitted)
        #[arg(short = 'm', long)]
        models: Option<String>,

        /// Days to forecast (default from settings, 30)
        #[arg(short = 'd', long)]
        days: Option<usize>,

        /// Export format of the daily forecast: json or csv
        #[arg(short = 'f', long, default_value = "json")]
        format: ExportFormat,

        /// Write the daily forecast here instead of printing the bundle
        #[arg(long)]
        output: Option<String>,

        /// JSON settings file
        #[arg(short = 'c', long)]
        config: Option<String>,
    },

    /// Forecast the reservoir and recommend an irrigation allocation
    Recommend {
        /// History CSV with a Date,Inflow,Outflow,Level header
        #[arg(long)]
        history: String,

        /// Directory of saved models (trains fresh models when omitted)
        #[arg(short = 'm', long)]
        models: Option<String>,

        #[arg(long)]
        crop: String,

        /// Field size in hectares
        #[arg(long)]
        field_size: f64,

        #[arg(long)]
        days_since_planting: u32,

        /// flood, furrow, sprinkler or drip
        #[arg(long)]
        irrigation: IrrigationMethod,

        /// Reservoir capacity, in the units of the level column
        #[arg(long)]
        capacity: f64,

        /// Live reservoir level (defaults to the last level in the history)
        #[arg(long)]
        current_level: Option<f64>,

        /// JSON settings file
        #[arg(short = 'c', long)]
        config: Option<String>,
    },

    /// Print the daily water requirement of a field in liters
    Demand {
        #[arg(long)]
        crop: String,

        /// Field size in hectares
        #[arg(long)]
        field_size: f64,

        #[arg(long)]
        days_since_planting: u32,

        /// flood, furrow, sprinkler or drip
        #[arg(long)]
        irrigation: IrrigationMethod,

        /// JSON settings file
        #[arg(short = 'c', long)]
        config: Option<String>,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Train {
            history,
            output_dir,
            config,
        } => train::run_train(&history, &output_dir, config.as_deref()).await,
        Command::Forecast {
            history,
            models,
            days,
            format,
            output,
            config,
        } => {
            forecast::run_forecast(
                &history,
                models.as_deref(),
                days,
                format,
                output.as_deref(),
                config.as_deref(),
            )
            .await
        }
        Command::Recommend {
            history,
            models,
            crop,
            field_size,
            days_since_planting,
            irrigation,
            capacity,
            current_level,
            config,
        } => {
            let field = Field {
                crop,
                field_size_ha: field_size,
                days_since_planting,
                irrigation,
            };
            recommend::run_recommend(
                &history,
                models.as_deref(),
                field,
                capacity,
                current_level,
                config.as_deref(),
            )
            .await
        }
        Command::Demand {
            crop,
            field_size,
            days_since_planting,
            irrigation,
            config,
        } => {
            let field = Field {
                crop,
                field_size_ha: field_size,
                days_since_planting,
                irrigation,
            };
            recommend::run_demand(field, config.as_deref())
        }
    }
}
