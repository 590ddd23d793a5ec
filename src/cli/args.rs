//! CLI argument structures

use crate::app::BackendKind;
use crate::publish::RunType;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Aggregate workflow execution health into reports and notifications
#[derive(Parser)]
#[command(name = "workflow-report")]
#[command(about = "workflow-report - Workflow execution health reports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Report configuration file (TOML)
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate an execution, write its artifacts and send the notification
    Report(ReportArgs),

    /// Aggregate an execution and print the documents without publishing
    Inspect(InspectArgs),
}

/// Backend selection shared by every command
#[derive(Args, Debug, Clone)]
pub struct BackendArgs {
    /// Orchestration backend
    #[arg(long, value_enum, default_value_t = BackendKind::Memory)]
    pub backend: BackendKind,

    /// Snapshot file served by the memory backend
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Execution identifier
    #[arg(short = 'e', long, value_name = "ID")]
    pub execution_id: String,

    /// Temporal range the run covers
    #[arg(short = 't', long, value_name = "RANGE")]
    pub temporal_range: Option<String>,

    /// Bucket holding the upstream run's granules
    #[arg(short = 's', long, value_name = "BUCKET")]
    pub source_bucket: Option<String>,

    /// Run type of the upstream run
    #[arg(short = 'r', long, value_enum)]
    pub run_type: Option<RunType>,

    /// Destination bucket for the report artifacts
    #[arg(short = 'b', long)]
    pub bucket: String,

    /// Key prefix for the report artifacts
    #[arg(short = 'k', long, value_name = "PREFIX")]
    pub bucket_key: String,

    /// The run is already known to have failed
    #[arg(short = 'f', long)]
    pub fail: bool,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Execution identifier
    #[arg(
        short = 'e',
        long,
        value_name = "ID",
        conflicts_with = "latest",
        required_unless_present = "latest"
    )]
    pub execution_id: Option<String>,

    /// Report on the most recent execution of this workflow
    #[arg(long, value_name = "WORKFLOW")]
    pub latest: Option<String>,

    /// Temporal range the run covers
    #[arg(short = 't', long, value_name = "RANGE")]
    pub temporal_range: Option<String>,

    /// Also print the failure document
    #[arg(long)]
    pub failures: bool,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_report_short_flags() {
        let cli = Cli::try_parse_from([
            "workflow-report",
            "report",
            "-e",
            "arn:x:execution:wf:run-1-v2",
            "-b",
            "reports",
            "-k",
            "runs/1",
            "-r",
            "unconstrained",
            "-f",
        ])
        .unwrap();

        match cli.command {
            Commands::Report(args) => {
                assert_eq!(args.bucket_key, "runs/1");
                assert_eq!(args.run_type, Some(RunType::Unconstrained));
                assert!(args.fail);
                assert_eq!(args.backend.backend, BackendKind::Memory);
            }
            Commands::Inspect(_) => panic!("expected report"),
        }
    }

    #[test]
    fn test_inspect_requires_one_target() {
        assert!(Cli::try_parse_from(["workflow-report", "inspect"]).is_err());
        assert!(Cli::try_parse_from([
            "workflow-report",
            "inspect",
            "-e",
            "exec-1",
            "--latest",
            "wf"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["workflow-report", "inspect", "--latest", "wf"]).is_ok());
    }
}
