//! `inspect` command

use crate::aggregate::ReportAggregator;
use crate::app::Services;
use crate::backend::{ExecutionRef, OrchestrationBackend};
use crate::cli::args::InspectArgs;
use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::report::to_artifacts;
use anyhow::{Context, Result};
use tracing::info;

pub async fn run_inspect(args: InspectArgs, config: &ReportConfig) -> Result<()> {
    let services =
        Services::build(args.backend.backend, args.backend.fixture.as_deref(), config).await?;

    let execution_id = match (args.execution_id, args.latest) {
        (Some(id), _) => id,
        (None, Some(workflow)) => latest_execution(services.backend.as_ref(), &workflow).await?,
        (None, None) => {
            return Err(ReportError::configuration("an execution id or --latest is required").into())
        }
    };
    let execution = ExecutionRef::parse(&execution_id);

    let aggregator = ReportAggregator::new(services.backend, config);
    let (report, failures) = aggregator
        .aggregate(&execution.id, &execution.name, args.temporal_range.as_deref())
        .await
        .with_context(|| format!("Aggregation of {} failed", execution.id))?;

    let documents = to_artifacts(&report, &failures)?;
    println!("{}", documents.module_document);
    if args.failures {
        println!("{}", documents.failure_document);
    }
    Ok(())
}

async fn latest_execution(backend: &dyn OrchestrationBackend, workflow: &str) -> Result<String> {
    let latest = backend
        .list_workflow_executions(workflow, 1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ReportError::not_found(workflow))?;
    info!("Latest execution of {} is {} ({:?})", workflow, latest.id, latest.status);
    Ok(latest.id)
}
