//! Merge task and map-run statistics into a [`RunReport`]

use crate::backend::{ExecutionDescription, OrchestrationBackend};
use crate::error::ReportResult;
use crate::report::{format_duration, ModuleStats, RunReport};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

/// Elapsed time of an execution; runs without a stop time accrue up to `now`
pub fn elapsed(description: &ExecutionDescription, now: DateTime<Utc>) -> TimeDelta {
    let end = match description.stop_time {
        Some(stop) if !description.status.is_running() => stop,
        _ => now,
    };
    end - description.start_time
}

/// Build the report; task modules come first, then map-run modules
pub fn assemble_report(
    name: &str,
    temporal_range: Option<&str>,
    task_stats: Vec<ModuleStats>,
    map_stats: Vec<ModuleStats>,
    total_time: TimeDelta,
) -> RunReport {
    let mut modules = task_stats;
    modules.extend(map_stats);

    RunReport {
        name: name.to_string(),
        temporal_range: temporal_range.map(str::to_string),
        modules,
        total_time: format_duration(total_time),
    }
}

pub struct RunReportAssembler<'a> {
    backend: &'a dyn OrchestrationBackend,
}

impl<'a> RunReportAssembler<'a> {
    pub fn new(backend: &'a dyn OrchestrationBackend) -> Self {
        Self { backend }
    }

    /// Assemble the report, timing the execution from its description
    pub async fn assemble(
        &self,
        execution_id: &str,
        name: &str,
        temporal_range: Option<&str>,
        task_stats: Vec<ModuleStats>,
        map_stats: Vec<ModuleStats>,
        now: DateTime<Utc>,
    ) -> ReportResult<RunReport> {
        let description = self.backend.describe_execution(execution_id).await?;
        let total_time = elapsed(&description, now);
        debug!(
            "Execution {} is {:?}, elapsed {}",
            execution_id, description.status, total_time
        );

        Ok(assemble_report(
            name,
            temporal_range,
            task_stats,
            map_stats,
            total_time,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ExecutionStatus;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn module(name: &str) -> ModuleStats {
        ModuleStats::single(name, false, TimeDelta::seconds(1))
    }

    #[test]
    fn test_task_modules_precede_map_modules() {
        let report = assemble_report(
            "exec-42",
            Some("2024-01-01,2024-01-31"),
            vec![module("B Task"), module("A Task")],
            vec![module("Z Map"), module("C Map")],
            TimeDelta::minutes(3),
        );

        let names: Vec<&str> = report.modules.iter().map(|m| m.module.as_str()).collect();
        assert_eq!(names, vec!["B Task", "A Task", "Z Map", "C Map"]);
        assert_eq!(report.total_time, "0:03:00");
        assert_eq!(report.temporal_range.as_deref(), Some("2024-01-01,2024-01-31"));
    }

    #[test]
    fn test_elapsed_uses_stop_time_when_finished() {
        let description = ExecutionDescription {
            status: ExecutionStatus::Succeeded,
            start_time: start(),
            stop_time: Some(start() + TimeDelta::minutes(10)),
            input: None,
        };
        let now = start() + TimeDelta::hours(5);
        assert_eq!(elapsed(&description, now), TimeDelta::minutes(10));
    }

    #[test]
    fn test_elapsed_grows_while_running() {
        let description = ExecutionDescription {
            status: ExecutionStatus::Running,
            start_time: start(),
            stop_time: None,
            input: None,
        };
        let early = elapsed(&description, start() + TimeDelta::minutes(1));
        let later = elapsed(&description, start() + TimeDelta::minutes(2));
        assert!(later > early);
    }
}
