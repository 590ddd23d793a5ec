//! End-to-end report run: aggregate, render, publish, notify

use crate::aggregate::ReportAggregator;
use crate::backend::{ExecutionRef, OrchestrationBackend};
use crate::config::ReportConfig;
use crate::error::{ReportError, ReportResult};
use crate::publish::{
    Destination, NotificationChannel, Notice, ObjectStore, PublishedArtifacts, Publisher, RunType,
    UpstreamSource,
};
use crate::report::{to_artifacts, FailureIndex, RunReport};
use std::sync::Arc;
use tracing::{info, warn};

/// Inputs of one report run
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub execution: ExecutionRef,
    pub temporal_range: Option<String>,
    pub source_bucket: Option<String>,
    pub run_type: Option<RunType>,
    pub destination: Destination,
    /// Caller already knows the run failed; only changes the notification
    pub failed: bool,
}

/// Result of a completed report run
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub report: RunReport,
    pub failures: FailureIndex,
    pub artifacts: PublishedArtifacts,
    pub delivered: bool,
}

pub struct ReportPipeline {
    aggregator: ReportAggregator,
    publisher: Publisher,
    topic_substring: String,
}

impl ReportPipeline {
    pub fn new(
        backend: Arc<dyn OrchestrationBackend>,
        store: Arc<dyn ObjectStore>,
        channel: Arc<dyn NotificationChannel>,
        config: &ReportConfig,
    ) -> Self {
        Self {
            aggregator: ReportAggregator::new(backend, config),
            publisher: Publisher::new(store, channel, config.topic_substring.clone())
                .with_troubleshooting_url(config.troubleshooting_url.clone())
                .with_retry_policy(config.retry.clone()),
            topic_substring: config.topic_substring.clone(),
        }
    }

    /// Run the whole pipeline
    ///
    /// Aggregation and storage errors abort the run. A missing notification
    /// channel does not; it is reported through [`ReportOutcome::delivered`].
    pub async fn run(&self, request: &ReportRequest) -> ReportResult<ReportOutcome> {
        let execution = &request.execution;
        info!(
            "Reporting on {} execution '{}' (temporal range: {})",
            execution.workflow,
            execution.name,
            request.temporal_range.as_deref().unwrap_or("none")
        );

        let (report, failures) = self
            .aggregator
            .aggregate(
                &execution.id,
                &execution.name,
                request.temporal_range.as_deref(),
            )
            .await?;

        let documents = to_artifacts(&report, &failures)?;
        let artifacts = self
            .publisher
            .publish(&documents, &request.destination)
            .await?;

        let source = UpstreamSource::resolve(
            request.source_bucket.as_deref(),
            request.run_type,
            execution,
        );
        let upstream = self.publisher.upstream_listing(source.as_ref()).await;

        let notice = Notice {
            report: &report,
            execution,
            run_type: request.run_type,
            artifacts: &artifacts,
            upstream: upstream.as_deref(),
            success: !request.failed,
        };
        let delivered = self.publisher.notify(&notice).await?;

        Ok(ReportOutcome {
            report,
            failures,
            artifacts,
            delivered,
        })
    }

    /// Run the pipeline and fail when no notification was delivered
    pub async fn run_and_notify(&self, request: &ReportRequest) -> ReportResult<ReportOutcome> {
        let outcome = self.run(request).await?;
        if !outcome.delivered {
            warn!(
                "Artifacts written to {} and {} but no notification was sent",
                outcome.artifacts.module_uri, outcome.artifacts.failure_uri
            );
            return Err(ReportError::NoNotificationChannel(
                self.topic_substring.clone(),
            ));
        }
        Ok(outcome)
    }
}
