//! AWS Step Functions backend

use super::{
    EventType, ExecutionDescription, ExecutionEvent, ExecutionStatus, ExecutionSummary,
    MapRunDescription, OrchestrationBackend, Page, PageRequest,
};
use crate::error::{ReportError, ReportResult};
use async_trait::async_trait;
use aws_sdk_sfn::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sfn::types::{self as sfn, HistoryEventType};
use aws_sdk_sfn::Client;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

/// Error codes that mean the identifier is unknown rather than the service being unavailable
const NOT_FOUND_CODES: &[&str] = &[
    "ExecutionDoesNotExist",
    "InvalidArn",
    "ResourceNotFound",
    "StateMachineDoesNotExist",
];

pub struct StepFunctionsBackend {
    client: Arc<Client>,
}

impl StepFunctionsBackend {
    /// Create a backend from the ambient AWS configuration
    pub async fn from_env() -> Self {
        info!("Initializing Step Functions backend");
        let aws_config = aws_config::load_from_env().await;
        Self::new(Client::new(&aws_config))
    }

    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

fn classify<E, R>(operation: &str, id: &str, err: SdkError<E, R>) -> ReportError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: Debug,
{
    match err.code() {
        Some(code) if NOT_FOUND_CODES.contains(&code) => ReportError::not_found(id),
        _ => ReportError::unavailable(operation, DisplayErrorContext(&err)),
    }
}

fn to_chrono(value: &aws_sdk_sfn::primitives::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos()).unwrap_or_default()
}

fn to_status(status: &sfn::ExecutionStatus) -> ExecutionStatus {
    match status {
        sfn::ExecutionStatus::Running => ExecutionStatus::Running,
        sfn::ExecutionStatus::Succeeded => ExecutionStatus::Succeeded,
        sfn::ExecutionStatus::Failed => ExecutionStatus::Failed,
        sfn::ExecutionStatus::TimedOut => ExecutionStatus::TimedOut,
        sfn::ExecutionStatus::Aborted => ExecutionStatus::Aborted,
        sfn::ExecutionStatus::PendingRedrive => ExecutionStatus::PendingRedrive,
        _ => ExecutionStatus::Unknown,
    }
}

fn page_size(page: &PageRequest) -> i32 {
    i32::try_from(page.max_results).unwrap_or(i32::MAX)
}

/// Task events carry their job document in the output on success and in
/// the cause on failure
fn to_event(event: &sfn::HistoryEvent) -> ExecutionEvent {
    let (event_type, output) = match event.r#type() {
        HistoryEventType::TaskSucceeded => (
            EventType::TaskSucceeded,
            event
                .task_succeeded_event_details()
                .and_then(|d| d.output())
                .map(str::to_string),
        ),
        HistoryEventType::TaskFailed => (
            EventType::TaskFailed,
            event
                .task_failed_event_details()
                .and_then(|d| d.cause())
                .map(str::to_string),
        ),
        _ => (EventType::Other, None),
    };

    ExecutionEvent {
        event_type,
        timestamp: to_chrono(event.timestamp()),
        output,
    }
}

#[async_trait]
impl OrchestrationBackend for StepFunctionsBackend {
    async fn describe_execution(&self, execution_id: &str) -> ReportResult<ExecutionDescription> {
        let output = self
            .client
            .describe_execution()
            .execution_arn(execution_id)
            .send()
            .await
            .map_err(|e| classify("describe_execution", execution_id, e))?;

        Ok(ExecutionDescription {
            status: to_status(output.status()),
            start_time: to_chrono(output.start_date()),
            stop_time: output.stop_date().map(to_chrono),
            input: output.input().map(str::to_string),
        })
    }

    async fn get_execution_history(
        &self,
        execution_id: &str,
        page: &PageRequest,
    ) -> ReportResult<Page<ExecutionEvent>> {
        let output = self
            .client
            .get_execution_history()
            .execution_arn(execution_id)
            .max_results(page_size(page))
            .set_next_token(page.token.clone())
            .send()
            .await
            .map_err(|e| classify("get_execution_history", execution_id, e))?;

        Ok(Page {
            items: output.events().iter().map(to_event).collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn list_map_runs(&self, execution_id: &str) -> ReportResult<Vec<String>> {
        let mut map_runs = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_map_runs()
                .execution_arn(execution_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| classify("list_map_runs", execution_id, e))?;

            map_runs.extend(
                output
                    .map_runs()
                    .iter()
                    .map(|run| run.map_run_arn().to_string()),
            );

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!("Listed {} map runs for {}", map_runs.len(), execution_id);
        Ok(map_runs)
    }

    async fn describe_map_run(&self, map_run_id: &str) -> ReportResult<MapRunDescription> {
        let output = self
            .client
            .describe_map_run()
            .map_run_arn(map_run_id)
            .send()
            .await
            .map_err(|e| classify("describe_map_run", map_run_id, e))?;

        let counts = output.execution_counts().ok_or_else(|| {
            ReportError::malformed(format!("map run {}", map_run_id), "missing execution counts")
        })?;

        Ok(MapRunDescription {
            total: u64::try_from(counts.total()).unwrap_or(0),
            succeeded: u64::try_from(counts.succeeded()).unwrap_or(0),
            failed: u64::try_from(counts.failed()).unwrap_or(0),
            start_time: to_chrono(output.start_date()),
            stop_time: output.stop_date().map(to_chrono),
        })
    }

    async fn list_child_executions(
        &self,
        map_run_id: &str,
        page: &PageRequest,
    ) -> ReportResult<Page<ExecutionSummary>> {
        let output = self
            .client
            .list_executions()
            .map_run_arn(map_run_id)
            .max_results(page_size(page))
            .set_next_token(page.token.clone())
            .send()
            .await
            .map_err(|e| classify("list_executions", map_run_id, e))?;

        Ok(Page {
            items: output
                .executions()
                .iter()
                .map(|item| ExecutionSummary {
                    id: item.execution_arn().to_string(),
                    status: to_status(item.status()),
                })
                .collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn list_workflow_executions(
        &self,
        workflow_id: &str,
        limit: usize,
    ) -> ReportResult<Vec<ExecutionSummary>> {
        let output = self
            .client
            .list_executions()
            .state_machine_arn(workflow_id)
            .max_results(i32::try_from(limit.max(1)).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|e| classify("list_executions", workflow_id, e))?;

        Ok(output
            .executions()
            .iter()
            .take(limit)
            .map(|item| ExecutionSummary {
                id: item.execution_arn().to_string(),
                status: to_status(item.status()),
            })
            .collect())
    }
}
