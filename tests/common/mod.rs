//! Common test utilities and helpers
#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::json;
use workflow_report::backend::{
    EventType, ExecutionDescription, ExecutionEvent, ExecutionStatus, ExecutionSummary,
    MapRunDescription, Snapshot, Topic,
};

pub const EXEC_42: &str = "exec-42";
pub const COMBINE_DATA_SUBSET: &str =
    "arn:aws:states:us-west-2:123456789012:mapRun:confluence-workflow/combine_data_subset:5f2e";
pub const REPORTS_TOPIC: &str = "arn:aws:sns:us-west-2:123456789012:confluence-reports";

/// Fixed reference time for all fixtures
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

/// Builder for backend snapshots
pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::default(),
        }
    }

    pub fn execution(
        mut self,
        id: &str,
        status: ExecutionStatus,
        duration: Option<TimeDelta>,
    ) -> Self {
        self.snapshot.executions.insert(
            id.to_string(),
            ExecutionDescription {
                status,
                start_time: t0(),
                stop_time: duration.map(|d| t0() + d),
                input: None,
            },
        );
        self.snapshot.histories.entry(id.to_string()).or_default();
        self
    }

    /// Append a task event whose job ran for `millis`
    pub fn task(mut self, execution: &str, event_type: EventType, job_name: &str, millis: i64) -> Self {
        let created = t0().timestamp_millis();
        let history = self
            .snapshot
            .histories
            .entry(execution.to_string())
            .or_default();
        let timestamp = t0() + TimeDelta::seconds(history.len() as i64);
        history.push(ExecutionEvent {
            event_type,
            timestamp,
            output: Some(
                json!({
                    "JobName": job_name,
                    "CreatedAt": created,
                    "StoppedAt": created + millis,
                    "Status": "SUCCEEDED",
                })
                .to_string(),
            ),
        });
        self
    }

    /// Append a non-task event
    pub fn other_event(mut self, execution: &str) -> Self {
        let history = self
            .snapshot
            .histories
            .entry(execution.to_string())
            .or_default();
        history.push(ExecutionEvent {
            event_type: EventType::Other,
            timestamp: t0(),
            output: None,
        });
        self
    }

    pub fn map_run(
        mut self,
        execution: &str,
        map_run_id: &str,
        counts: (u64, u64, u64),
        duration: TimeDelta,
    ) -> Self {
        self.snapshot
            .map_runs
            .entry(execution.to_string())
            .or_default()
            .push(map_run_id.to_string());
        self.snapshot.map_run_details.insert(
            map_run_id.to_string(),
            MapRunDescription {
                total: counts.0,
                succeeded: counts.1,
                failed: counts.2,
                start_time: t0(),
                stop_time: Some(t0() + duration),
            },
        );
        self.snapshot
            .child_executions
            .entry(map_run_id.to_string())
            .or_default();
        self
    }

    /// Add a child execution to a map run; failed children carry their context input
    pub fn child(
        mut self,
        map_run_id: &str,
        child_id: &str,
        status: ExecutionStatus,
        index: u64,
        value: serde_json::Value,
    ) -> Self {
        self.snapshot
            .child_executions
            .entry(map_run_id.to_string())
            .or_default()
            .push(ExecutionSummary {
                id: child_id.to_string(),
                status,
            });
        self.snapshot.executions.insert(
            child_id.to_string(),
            ExecutionDescription {
                status,
                start_time: t0(),
                stop_time: Some(t0()),
                input: Some(json!({"context_index": index, "context_value": value}).to_string()),
            },
        );
        self
    }

    pub fn topic(mut self, handle: &str) -> Self {
        self.snapshot.topics.push(Topic {
            name: handle.rsplit(':').next().unwrap_or_default().to_string(),
            handle: handle.to_string(),
        });
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.snapshot.page_size = Some(size);
        self
    }

    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}

/// Two recognized task events, one unrecognized task event and one map run
/// with 2 failed children out of 10
pub fn exec42() -> SnapshotBuilder {
    scenario(EXEC_42)
}

/// The exec-42 scenario under another execution id
pub fn scenario(execution_id: &str) -> SnapshotBuilder {
    let mut builder = SnapshotBuilder::new()
        .execution(execution_id, ExecutionStatus::Succeeded, Some(TimeDelta::minutes(90)))
        .other_event(execution_id)
        .task(execution_id, EventType::TaskSucceeded, "confluence-init-workflow-subset-a1", 1_000)
        .task(execution_id, EventType::TaskSucceeded, "confluence-init-workflow-global-b2", 2_000)
        .task(execution_id, EventType::TaskSucceeded, "confluence-prediagnostics-run-now-c3", 500)
        .map_run(execution_id, COMBINE_DATA_SUBSET, (10, 8, 2), TimeDelta::minutes(45));

    for i in 0..10u64 {
        let status = if i == 3 || i == 7 {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Succeeded
        };
        builder = builder.child(
            COMBINE_DATA_SUBSET,
            &format!("child-{i}"),
            status,
            i,
            json!(format!("reach-{i}")),
        );
    }

    builder.topic(REPORTS_TOPIC)
}
