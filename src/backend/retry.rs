//! Retry with bounded exponential backoff
//!
//! [`RetryingBackend`] wraps any [`OrchestrationBackend`] and retries calls
//! that fail with a retryable error. Retries are invisible to callers: the
//! wrapped backend has the same contract as the inner one.

use super::{
    ExecutionDescription, ExecutionEvent, ExecutionSummary, MapRunDescription,
    OrchestrationBackend, Page, PageRequest,
};
use crate::config::RetryPolicy;
use crate::error::ReportResult;
use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Run `operation`, retrying retryable failures according to `policy`
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    context: &str,
    operation: F,
) -> ReportResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ReportResult<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = apply_jitter(policy, policy.delay_for(attempt));
                warn!(
                    "Retrying {} (attempt {}/{}) after {:?}: {}",
                    context, attempt, policy.max_retries, delay, err
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                if attempt > 0 {
                    debug!("{} failed after {} retries", context, attempt);
                }
                return Err(err);
            }
        }
    }
}

fn apply_jitter(policy: &RetryPolicy, delay: Duration) -> Duration {
    if !policy.jitter || delay.is_zero() {
        return delay;
    }

    let mut rng = rand::rng();
    let jitter_range = delay.as_secs_f64() * 0.5;
    let jitter = rng.random_range(-jitter_range / 2.0..=jitter_range / 2.0);
    Duration::from_secs_f64((delay.as_secs_f64() + jitter).max(0.0))
}

/// Backend decorator adding retries to every call
pub struct RetryingBackend<B: ?Sized> {
    inner: Arc<B>,
    policy: RetryPolicy,
}

impl<B: OrchestrationBackend + ?Sized> RetryingBackend<B> {
    pub fn new(inner: Arc<B>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: OrchestrationBackend + ?Sized> OrchestrationBackend for RetryingBackend<B> {
    async fn describe_execution(&self, execution_id: &str) -> ReportResult<ExecutionDescription> {
        with_retry(&self.policy, "describe_execution", || {
            self.inner.describe_execution(execution_id)
        })
        .await
    }

    async fn get_execution_history(
        &self,
        execution_id: &str,
        page: &PageRequest,
    ) -> ReportResult<Page<ExecutionEvent>> {
        with_retry(&self.policy, "get_execution_history", || {
            self.inner.get_execution_history(execution_id, page)
        })
        .await
    }

    async fn list_map_runs(&self, execution_id: &str) -> ReportResult<Vec<String>> {
        with_retry(&self.policy, "list_map_runs", || {
            self.inner.list_map_runs(execution_id)
        })
        .await
    }

    async fn describe_map_run(&self, map_run_id: &str) -> ReportResult<MapRunDescription> {
        with_retry(&self.policy, "describe_map_run", || {
            self.inner.describe_map_run(map_run_id)
        })
        .await
    }

    async fn list_child_executions(
        &self,
        map_run_id: &str,
        page: &PageRequest,
    ) -> ReportResult<Page<ExecutionSummary>> {
        with_retry(&self.policy, "list_child_executions", || {
            self.inner.list_child_executions(map_run_id, page)
        })
        .await
    }

    async fn list_workflow_executions(
        &self,
        workflow_id: &str,
        limit: usize,
    ) -> ReportResult<Vec<ExecutionSummary>> {
        with_retry(&self.policy, "list_workflow_executions", || {
            self.inner.list_workflow_executions(workflow_id, limit)
        })
        .await
    }
}
