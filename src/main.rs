use clap::Parser;
use std::time::Instant;
use tracing::info;
use workflow_report::app::{handle_fatal_error, init_logging, AppConfig};
use workflow_report::cli::{execute_command, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let app = AppConfig::new(cli.verbose).with_config_path(cli.config.clone());
    init_logging(&app);

    let started = Instant::now();
    let result = execute_command(cli.command, &app).await;
    info!("Execution time: {:.2?}", started.elapsed());

    if let Err(e) = result {
        handle_fatal_error(e, cli.verbose);
    }
}
