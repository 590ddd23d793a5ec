//! Execution aggregation
//!
//! Walks one execution's history and map runs and reconciles them into a
//! [`RunReport`] plus its [`FailureIndex`]. Task extraction and map-run
//! aggregation run concurrently; any backend or identifier error aborts the
//! pass without a partial report.

pub mod assembler;
pub mod history;
pub mod map_runs;
pub mod naming;
pub mod tasks;

pub use assembler::RunReportAssembler;
pub use history::{fetch_history, paginate};
pub use map_runs::MapRunAggregator;
pub use naming::ModuleNaming;
pub use tasks::TaskStatsExtractor;

use crate::backend::OrchestrationBackend;
use crate::config::ReportConfig;
use crate::error::{ReportError, ReportResult};
use crate::report::{FailureIndex, ModuleStats, RunReport};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Runs the full aggregation for one execution
pub struct ReportAggregator {
    backend: Arc<dyn OrchestrationBackend>,
    naming: ModuleNaming,
    page_size: usize,
    concurrency: usize,
}

impl ReportAggregator {
    pub fn new(backend: Arc<dyn OrchestrationBackend>, config: &ReportConfig) -> Self {
        Self {
            backend,
            naming: ModuleNaming::from_config(config),
            page_size: config.page_size,
            concurrency: config.concurrency,
        }
    }

    pub async fn aggregate(
        &self,
        execution_id: &str,
        name: &str,
        temporal_range: Option<&str>,
    ) -> ReportResult<(RunReport, FailureIndex)> {
        self.aggregate_at(execution_id, name, temporal_range, Utc::now())
            .await
    }

    /// Aggregate with in-progress durations measured up to `now`
    pub async fn aggregate_at(
        &self,
        execution_id: &str,
        name: &str,
        temporal_range: Option<&str>,
        now: DateTime<Utc>,
    ) -> ReportResult<(RunReport, FailureIndex)> {
        let backend = self.backend.as_ref();
        let extractor = TaskStatsExtractor::new(self.naming.clone());
        let map_runs =
            MapRunAggregator::new(backend, &self.naming, self.page_size, self.concurrency);

        let tasks = async {
            let events = fetch_history(backend, execution_id, self.page_size).await?;
            Ok::<_, ReportError>(extractor.extract_task_stats(&events))
        };
        let (task_stats, (map_stats, map_failures)) =
            tokio::try_join!(tasks, map_runs.aggregate_map_runs(execution_id, now))?;
        let failures = index_failures(&task_stats, map_failures);

        let report = RunReportAssembler::new(backend)
            .assemble(execution_id, name, temporal_range, task_stats, map_stats, now)
            .await?;

        info!(
            "Aggregated {}: {} modules, {} jobs, {} failed, {} modules with failures",
            name,
            report.modules.len(),
            report.total_jobs(),
            report.total_failed(),
            failures.len()
        );
        Ok((report, failures))
    }
}

/// Failure index covering every module with a failed job
///
/// Failed task modules carry no item-level records, so they get an empty
/// entry ahead of the map-run entries.
pub fn index_failures(task_stats: &[ModuleStats], map_failures: FailureIndex) -> FailureIndex {
    let mut failures = FailureIndex::new();
    for stats in task_stats.iter().filter(|stats| stats.failed > 0) {
        failures.insert(stats.module.clone(), Vec::new());
    }
    for (module, records) in map_failures.iter() {
        failures.insert(module, records.to_vec());
    }
    failures
}
