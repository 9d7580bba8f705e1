//! WRM CLI - Command line tool for reservoir forecasting and irrigation allocation.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "wrm-cli",
    version,
    about = "Water resource forecasting toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: wrm_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("wrm-cli {}", env!("CARGO_PKG_VERSION"));
    wrm_cmd::run(cli.command).await
}
