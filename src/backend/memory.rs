//! In-memory orchestration backend
//!
//! Serves a recorded [`Snapshot`] of an execution tree. Listings are paged
//! with offset tokens so callers exercise the same continuation logic they
//! use against a live backend. Notifications published through it are kept
//! in memory. Used by tests and for offline replay of saved snapshots.

use super::{
    ExecutionDescription, ExecutionEvent, ExecutionStatus, ExecutionSummary, MapRunDescription,
    OrchestrationBackend, Page, PageRequest, Topic,
};
use crate::error::{ReportError, ReportResult};
use crate::publish::NotificationChannel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

/// Recorded state of an orchestration backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub executions: HashMap<String, ExecutionDescription>,
    #[serde(default)]
    pub histories: HashMap<String, Vec<ExecutionEvent>>,
    /// Execution id to the map runs it spawned, in listing order
    #[serde(default)]
    pub map_runs: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub map_run_details: HashMap<String, MapRunDescription>,
    #[serde(default)]
    pub child_executions: HashMap<String, Vec<ExecutionSummary>>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    /// Workflow id to execution ids, newest first
    #[serde(default)]
    pub workflow_executions: HashMap<String, Vec<String>>,
    /// Upper bound on page size, to force multi-page listings
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl Snapshot {
    /// Load a snapshot from a JSON file
    pub async fn load(path: &Path) -> ReportResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let snapshot = serde_json::from_str(&content)?;
        Ok(snapshot)
    }
}

/// A notification recorded by [`MemoryBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic_handle: String,
    pub subject: String,
    pub body: String,
}

/// Snapshot-backed orchestration backend and notification channel
pub struct MemoryBackend {
    snapshot: Snapshot,
    published: RwLock<Vec<PublishedMessage>>,
    calls: RwLock<HashMap<&'static str, usize>>,
    faults: RwLock<HashMap<&'static str, u32>>,
}

impl MemoryBackend {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            published: RwLock::new(Vec::new()),
            calls: RwLock::new(HashMap::new()),
            faults: RwLock::new(HashMap::new()),
        }
    }

    /// Make the next `count` calls of `operation` fail as unavailable
    pub async fn inject_failures(&self, operation: &'static str, count: u32) {
        self.faults.write().await.insert(operation, count);
    }

    /// Number of calls made to `operation`, including failed ones
    pub async fn call_count(&self, operation: &str) -> usize {
        self.calls.read().await.get(operation).copied().unwrap_or(0)
    }

    /// Notifications published so far
    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.published.read().await.clone()
    }

    async fn enter(&self, operation: &'static str) -> ReportResult<()> {
        *self.calls.write().await.entry(operation).or_insert(0) += 1;

        let mut faults = self.faults.write().await;
        if let Some(remaining) = faults.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ReportError::unavailable(operation, "injected failure"));
            }
        }
        Ok(())
    }

    fn page_of<T: Clone>(&self, items: &[T], page: &PageRequest) -> ReportResult<Page<T>> {
        let offset = match &page.token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|e| ReportError::malformed(format!("page token '{}'", token), e))?,
            None => 0,
        };
        let size = self
            .snapshot
            .page_size
            .map_or(page.max_results, |limit| limit.min(page.max_results))
            .max(1);

        let end = (offset + size).min(items.len());
        let slice = items.get(offset..end).unwrap_or_default().to_vec();
        let next_token = (end < items.len()).then(|| end.to_string());

        Ok(Page {
            items: slice,
            next_token,
        })
    }

    fn execution(&self, execution_id: &str) -> ReportResult<&ExecutionDescription> {
        self.snapshot
            .executions
            .get(execution_id)
            .ok_or_else(|| ReportError::not_found(execution_id))
    }
}

#[async_trait]
impl OrchestrationBackend for MemoryBackend {
    async fn describe_execution(&self, execution_id: &str) -> ReportResult<ExecutionDescription> {
        self.enter("describe_execution").await?;
        self.execution(execution_id).cloned()
    }

    async fn get_execution_history(
        &self,
        execution_id: &str,
        page: &PageRequest,
    ) -> ReportResult<Page<ExecutionEvent>> {
        self.enter("get_execution_history").await?;
        self.execution(execution_id)?;

        let events = self
            .snapshot
            .histories
            .get(execution_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        debug!(
            "Serving history page for {} at {:?}",
            execution_id, page.token
        );
        self.page_of(events, page)
    }

    async fn list_map_runs(&self, execution_id: &str) -> ReportResult<Vec<String>> {
        self.enter("list_map_runs").await?;
        self.execution(execution_id)?;

        Ok(self
            .snapshot
            .map_runs
            .get(execution_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn describe_map_run(&self, map_run_id: &str) -> ReportResult<MapRunDescription> {
        self.enter("describe_map_run").await?;
        self.snapshot
            .map_run_details
            .get(map_run_id)
            .cloned()
            .ok_or_else(|| ReportError::not_found(map_run_id))
    }

    async fn list_child_executions(
        &self,
        map_run_id: &str,
        page: &PageRequest,
    ) -> ReportResult<Page<ExecutionSummary>> {
        self.enter("list_child_executions").await?;
        if !self.snapshot.map_run_details.contains_key(map_run_id) {
            return Err(ReportError::not_found(map_run_id));
        }

        let children = self
            .snapshot
            .child_executions
            .get(map_run_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        self.page_of(children, page)
    }

    async fn list_workflow_executions(
        &self,
        workflow_id: &str,
        limit: usize,
    ) -> ReportResult<Vec<ExecutionSummary>> {
        self.enter("list_workflow_executions").await?;

        let ids = self
            .snapshot
            .workflow_executions
            .get(workflow_id)
            .ok_or_else(|| ReportError::not_found(workflow_id))?;

        Ok(ids
            .iter()
            .take(limit)
            .map(|id| ExecutionSummary {
                id: id.clone(),
                status: self
                    .snapshot
                    .executions
                    .get(id)
                    .map_or(ExecutionStatus::Unknown, |e| e.status),
            })
            .collect())
    }
}

#[async_trait]
impl NotificationChannel for MemoryBackend {
    async fn list_topics(&self) -> ReportResult<Vec<Topic>> {
        self.enter("list_topics").await?;
        Ok(self.snapshot.topics.clone())
    }

    async fn publish(&self, topic_handle: &str, subject: &str, body: &str) -> ReportResult<()> {
        self.enter("publish").await?;
        self.published.write().await.push(PublishedMessage {
            topic_handle: topic_handle.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn backend_with_children(count: usize, page_size: usize) -> MemoryBackend {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut snapshot = Snapshot {
            page_size: Some(page_size),
            ..Snapshot::default()
        };
        snapshot.map_run_details.insert(
            "map-1".to_string(),
            MapRunDescription {
                total: count as u64,
                succeeded: count as u64,
                failed: 0,
                start_time: start,
                stop_time: None,
            },
        );
        snapshot.child_executions.insert(
            "map-1".to_string(),
            (0..count)
                .map(|i| ExecutionSummary {
                    id: format!("child-{i}"),
                    status: ExecutionStatus::Succeeded,
                })
                .collect(),
        );
        MemoryBackend::new(snapshot)
    }

    #[tokio::test]
    async fn test_listing_is_paged_with_offset_tokens() {
        let backend = backend_with_children(5, 2);
        let first = backend
            .list_child_executions("map-1", &PageRequest::first(1000))
            .await
            .unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_token.as_deref(), Some("2"));

        let last = backend
            .list_child_executions("map-1", &PageRequest::first(1000).next("4".to_string()))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id, "child-4");
        assert!(last.next_token.is_none());
    }

    #[tokio::test]
    async fn test_unknown_identifiers_are_not_found() {
        let backend = backend_with_children(1, 10);
        let err = backend.describe_execution("missing").await.unwrap_err();
        assert!(err.is_not_found());
        let err = backend.describe_map_run("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let backend = backend_with_children(1, 10);
        backend.inject_failures("describe_map_run", 1).await;

        let err = backend.describe_map_run("map-1").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(backend.describe_map_run("map-1").await.is_ok());
        assert_eq!(backend.call_count("describe_map_run").await, 2);
    }

    #[tokio::test]
    async fn test_publish_is_recorded() {
        let backend = backend_with_children(0, 10);
        backend.publish("topic-1", "subject", "body").await.unwrap();

        let published = backend.published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic_handle, "topic-1");
    }
}
