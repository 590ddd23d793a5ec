//! Command routing

use crate::app::AppConfig;
use crate::cli::args::Commands;
use crate::cli::commands::{run_inspect, run_report};
use anyhow::Result;

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Commands, app: &AppConfig) -> Result<()> {
    let config = app.load_report_config().await?;
    match command {
        Commands::Report(args) => run_report(args, &config).await,
        Commands::Inspect(args) => run_inspect(args, &config).await,
    }
}
