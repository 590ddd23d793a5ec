//! Per-task statistics from history events

use super::naming::ModuleNaming;
use crate::backend::{EventType, ExecutionEvent};
use crate::error::{ReportError, ReportResult};
use crate::report::ModuleStats;
use chrono::TimeDelta;
use serde::Deserialize;
use tracing::{debug, warn};

/// Job document embedded in a task event's output
#[derive(Debug, Deserialize)]
struct JobPayload {
    #[serde(rename = "JobName")]
    job_name: String,
    /// Millisecond epoch
    #[serde(rename = "CreatedAt")]
    created_at: i64,
    /// Millisecond epoch
    #[serde(rename = "StoppedAt")]
    stopped_at: i64,
}

/// Maps finished task events to one [`ModuleStats`] each
#[derive(Debug, Clone)]
pub struct TaskStatsExtractor {
    naming: ModuleNaming,
}

impl TaskStatsExtractor {
    pub fn new(naming: ModuleNaming) -> Self {
        Self { naming }
    }

    /// Stats for every recognized succeeded or failed task, in event order
    ///
    /// Events with a missing or undecodable payload are skipped with a warning.
    pub fn extract_task_stats(&self, events: &[ExecutionEvent]) -> Vec<ModuleStats> {
        let stats: Vec<ModuleStats> = events
            .iter()
            .enumerate()
            .filter(|(_, event)| event.is_task_outcome())
            .filter_map(|(position, event)| match self.task_stats(event) {
                Ok(stats) => stats,
                Err(err) => {
                    warn!("Skipping task event {}: {}", position, err);
                    None
                }
            })
            .collect();

        debug!("Extracted {} task modules", stats.len());
        stats
    }

    fn task_stats(&self, event: &ExecutionEvent) -> ReportResult<Option<ModuleStats>> {
        let context = format!("{:?} event at {}", event.event_type, event.timestamp);
        let output = event
            .output
            .as_deref()
            .ok_or_else(|| ReportError::malformed(&context, "missing output payload"))?;
        let payload: JobPayload =
            serde_json::from_str(output).map_err(|e| ReportError::malformed(&context, e))?;

        let Some(module) = self.naming.task_module(&payload.job_name) else {
            return Ok(None);
        };

        let elapsed = payload
            .stopped_at
            .checked_sub(payload.created_at)
            .and_then(TimeDelta::try_milliseconds)
            .ok_or_else(|| ReportError::malformed(&context, "timestamps out of range"))?;
        let failed = event.event_type == EventType::TaskFailed;
        Ok(Some(ModuleStats::single(module, failed, elapsed)))
    }
}
