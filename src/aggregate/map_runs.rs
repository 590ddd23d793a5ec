//! Map-run statistics and failure extraction
//!
//! Two-level traversal: every map run under the execution yields one
//! [`ModuleStats`]; map runs with failures are then walked for their failed
//! child executions, whose inputs become [`FailureRecord`]s.
//!
//! Backend calls run concurrently, bounded by a shared semaphore. Results are
//! collected with ordered buffering, so map runs keep listing order and
//! failure records keep pagination order.

use super::history::paginate;
use super::naming::ModuleNaming;
use crate::backend::{ExecutionStatus, ExecutionSummary, MapRunDescription, OrchestrationBackend};
use crate::error::{ReportError, ReportResult};
use crate::report::{format_duration, FailureIndex, FailureRecord, ModuleStats};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Input fields of a map-run child execution
#[derive(Debug, Deserialize)]
struct ChildInput {
    context_index: Value,
    #[serde(default)]
    context_value: Value,
}

pub struct MapRunAggregator<'a> {
    backend: &'a dyn OrchestrationBackend,
    naming: &'a ModuleNaming,
    page_size: usize,
    concurrency: usize,
    limiter: Semaphore,
}

impl<'a> MapRunAggregator<'a> {
    pub fn new(
        backend: &'a dyn OrchestrationBackend,
        naming: &'a ModuleNaming,
        page_size: usize,
        concurrency: usize,
    ) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            backend,
            naming,
            page_size,
            concurrency,
            limiter: Semaphore::new(concurrency),
        }
    }

    /// One [`ModuleStats`] per map run, plus failure records for map runs with failures
    ///
    /// In-progress map runs are timed up to `now`.
    pub async fn aggregate_map_runs(
        &self,
        execution_id: &str,
        now: DateTime<Utc>,
    ) -> ReportResult<(Vec<ModuleStats>, FailureIndex)> {
        let map_run_ids = self.limited(self.backend.list_map_runs(execution_id)).await?;
        info!("Found {} map runs for {}", map_run_ids.len(), execution_id);

        let results: Vec<(ModuleStats, Option<Vec<FailureRecord>>)> = stream::iter(&map_run_ids)
            .map(|map_run_id| self.aggregate_one(map_run_id, now))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut stats = Vec::with_capacity(results.len());
        let mut failures = FailureIndex::new();
        for (module_stats, records) in results {
            if let Some(records) = records {
                failures.insert(module_stats.module.clone(), records);
            }
            stats.push(module_stats);
        }

        Ok((stats, failures))
    }

    async fn aggregate_one(
        &self,
        map_run_id: &str,
        now: DateTime<Utc>,
    ) -> ReportResult<(ModuleStats, Option<Vec<FailureRecord>>)> {
        let module = self.naming.map_run_module(map_run_id);
        let description = self.limited(self.backend.describe_map_run(map_run_id)).await?;
        let stats = map_run_stats(module, &description, now);
        debug!(
            "Map run {}: {} total, {} succeeded, {} failed",
            stats.module, stats.total, stats.succeeded, stats.failed
        );

        let records = if stats.failed > 0 {
            Some(self.failure_records(map_run_id).await?)
        } else {
            None
        };
        Ok((stats, records))
    }

    /// Failure records of a map run's failed children, in listing order
    async fn failure_records(&self, map_run_id: &str) -> ReportResult<Vec<FailureRecord>> {
        let children: Vec<ExecutionSummary> = paginate(self.page_size, |request| async move {
            self.limited(self.backend.list_child_executions(map_run_id, &request))
                .await
        })
        .await?;

        let failed: Vec<&ExecutionSummary> = children
            .iter()
            .filter(|child| child.status == ExecutionStatus::Failed)
            .collect();
        debug!(
            "Map run {} has {} failed of {} listed children",
            map_run_id,
            failed.len(),
            children.len()
        );

        let records: Vec<Option<FailureRecord>> = stream::iter(failed)
            .map(|child| self.failure_record(&child.id))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(records.into_iter().flatten().collect())
    }

    async fn failure_record(&self, child_id: &str) -> ReportResult<Option<FailureRecord>> {
        let description = self.limited(self.backend.describe_execution(child_id)).await?;
        match parse_failure_input(child_id, description.input.as_deref()) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                warn!("Skipping failed child {}: {}", child_id, err);
                Ok(None)
            }
        }
    }

    /// Run one backend call while holding a worker permit
    async fn limited<T, Fut>(&self, call: Fut) -> ReportResult<T>
    where
        Fut: Future<Output = ReportResult<T>>,
    {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| ReportError::unavailable("worker pool", e))?;
        call.await
    }
}

/// Stats for one map run from its server-side counts
pub fn map_run_stats(
    module: String,
    description: &MapRunDescription,
    now: DateTime<Utc>,
) -> ModuleStats {
    let stop = description.stop_time.unwrap_or(now);
    ModuleStats {
        module,
        total: description.total,
        succeeded: description.succeeded,
        failed: description.failed,
        execution_time: format_duration(stop - description.start_time),
    }
}

/// Decode `context_index` / `context_value` from a child execution's input
///
/// The index may be a JSON number or a numeric string.
pub fn parse_failure_input(child_id: &str, input: Option<&str>) -> ReportResult<FailureRecord> {
    let context = format!("input of {}", child_id);
    let input = input.ok_or_else(|| ReportError::malformed(&context, "missing input"))?;
    let parsed: ChildInput =
        serde_json::from_str(input).map_err(|e| ReportError::malformed(&context, e))?;

    let index = match &parsed.context_index {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        ReportError::malformed(
            &context,
            format!("context_index is not a non-negative integer: {}", parsed.context_index),
        )
    })?;

    Ok(FailureRecord {
        index,
        value: parsed.context_value,
    })
}
