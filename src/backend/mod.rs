//! Orchestration backend abstraction
//!
//! The reporting pipeline treats the workflow orchestrator as a queried
//! service. This module defines the read operations it needs, as typed
//! responses with explicit optional fields, plus the implementations:
//!
//! - [`MemoryBackend`] serves a JSON snapshot (tests, offline replay)
//! - [`RetryingBackend`] wraps any backend with bounded exponential backoff
//! - `aws::StepFunctionsBackend` talks to AWS Step Functions (feature `aws`)

#[cfg(feature = "aws")]
pub mod aws;
pub mod memory;
pub mod retry;

pub use memory::{MemoryBackend, PublishedMessage, Snapshot};
pub use retry::RetryingBackend;

use crate::error::ReportResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest page any listing call may request
pub const MAX_PAGE_SIZE: usize = 1000;

/// Status of an execution as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
    PendingRedrive,
    #[serde(other)]
    Unknown,
}

impl ExecutionStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Kind of a history event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    TaskSucceeded,
    TaskFailed,
    #[serde(other)]
    Other,
}

/// One entry in an execution's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    /// Embedded output payload, undecoded
    #[serde(default)]
    pub output: Option<String>,
}

impl ExecutionEvent {
    /// Whether the event records a finished task
    pub fn is_task_outcome(&self) -> bool {
        matches!(
            self.event_type,
            EventType::TaskSucceeded | EventType::TaskFailed
        )
    }
}

/// Response of `DescribeExecution`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionDescription {
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub stop_time: Option<DateTime<Utc>>,
    /// Input document, undecoded
    #[serde(default)]
    pub input: Option<String>,
}

/// Response of `DescribeMapRun`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRunDescription {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub stop_time: Option<DateTime<Utc>>,
}

/// Entry of a child-execution or workflow-execution listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub id: String,
    pub status: ExecutionStatus,
}

/// A notification topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub handle: String,
}

/// Pagination parameters for listing calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub token: Option<String>,
    pub max_results: usize,
}

impl PageRequest {
    pub fn first(max_results: usize) -> Self {
        Self {
            token: None,
            max_results: max_results.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn next(&self, token: String) -> Self {
        Self {
            token: Some(token),
            max_results: self.max_results,
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

/// Read operations the report needs from the orchestration backend
///
/// All calls are independent reads and may be issued concurrently.
#[async_trait]
pub trait OrchestrationBackend: Send + Sync {
    async fn describe_execution(&self, execution_id: &str) -> ReportResult<ExecutionDescription>;

    async fn get_execution_history(
        &self,
        execution_id: &str,
        page: &PageRequest,
    ) -> ReportResult<Page<ExecutionEvent>>;

    /// Map runs spawned directly under the execution, in backend order
    async fn list_map_runs(&self, execution_id: &str) -> ReportResult<Vec<String>>;

    async fn describe_map_run(&self, map_run_id: &str) -> ReportResult<MapRunDescription>;

    async fn list_child_executions(
        &self,
        map_run_id: &str,
        page: &PageRequest,
    ) -> ReportResult<Page<ExecutionSummary>>;

    /// Most recent executions of a workflow, newest first
    async fn list_workflow_executions(
        &self,
        workflow_id: &str,
        limit: usize,
    ) -> ReportResult<Vec<ExecutionSummary>>;
}

/// Parsed execution identifier
///
/// Identifiers are `:`-separated; the workflow label is the second-to-last
/// segment and the execution name the last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRef {
    pub id: String,
    pub workflow: String,
    pub name: String,
}

impl ExecutionRef {
    pub fn parse(id: &str) -> Self {
        let segments: Vec<&str> = id.split(':').collect();
        let (workflow, name) = match segments.as_slice() {
            [.., workflow, name] => (workflow.to_string(), name.to_string()),
            _ => (id.to_string(), id.to_string()),
        };

        Self {
            id: id.to_string(),
            workflow,
            name,
        }
    }

    /// Third hyphen-separated segment of the execution name
    pub fn version(&self) -> Option<&str> {
        self.name.split('-').nth(2).filter(|v| !v.is_empty())
    }
}
