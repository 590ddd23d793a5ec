//! `report` command

use crate::app::Services;
use crate::backend::ExecutionRef;
use crate::cli::args::ReportArgs;
use crate::config::ReportConfig;
use crate::pipeline::{ReportPipeline, ReportRequest};
use crate::publish::Destination;
use anyhow::{Context, Result};
use tracing::info;

pub async fn run_report(args: ReportArgs, config: &ReportConfig) -> Result<()> {
    let execution = ExecutionRef::parse(&args.execution_id);
    info!(
        "Execution: {}, temporal range: {}, source bucket: {}, run type: {}, destination: {}/{}",
        execution.id,
        args.temporal_range.as_deref().unwrap_or("none"),
        args.source_bucket.as_deref().unwrap_or("none"),
        args.run_type.map_or_else(|| "none".to_string(), |r| r.to_string()),
        args.bucket,
        args.bucket_key
    );

    let services =
        Services::build(args.backend.backend, args.backend.fixture.as_deref(), config).await?;
    let pipeline = ReportPipeline::new(services.backend, services.store, services.channel, config);

    let request = ReportRequest {
        execution,
        temporal_range: args.temporal_range,
        source_bucket: args.source_bucket,
        run_type: args.run_type,
        destination: Destination::new(args.bucket, args.bucket_key),
        failed: args.fail,
    };

    let outcome = pipeline
        .run_and_notify(&request)
        .await
        .with_context(|| format!("Report for {} failed", request.execution.name))?;

    println!("Report written to: {}", outcome.artifacts.module_uri);
    println!("Failures written to: {}", outcome.artifacts.failure_uri);
    Ok(())
}
