//! Service construction for the selected backend

use crate::backend::{MemoryBackend, OrchestrationBackend, RetryingBackend, Snapshot};
use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::publish::{LocalObjectStore, NotificationChannel, ObjectStore};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Which orchestration backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BackendKind {
    /// Replay a JSON snapshot; artifacts go to the local output directory
    #[default]
    Memory,
    /// AWS Step Functions, S3 and SNS
    Aws,
}

/// Backend, object store and notification channel for one invocation
pub struct Services {
    pub backend: Arc<dyn OrchestrationBackend>,
    pub store: Arc<dyn ObjectStore>,
    pub channel: Arc<dyn NotificationChannel>,
}

impl Services {
    pub async fn build(
        kind: BackendKind,
        fixture: Option<&Path>,
        config: &ReportConfig,
    ) -> Result<Self> {
        match kind {
            BackendKind::Memory => Self::memory(fixture, config).await,
            BackendKind::Aws => Self::aws(config).await,
        }
    }

    async fn memory(fixture: Option<&Path>, config: &ReportConfig) -> Result<Self> {
        let fixture = fixture.ok_or_else(|| {
            ReportError::configuration("--fixture is required with the memory backend")
        })?;
        let snapshot = Snapshot::load(fixture)
            .await
            .with_context(|| format!("Failed to load fixture {}", fixture.display()))?;
        debug!(
            "Loaded fixture {} with {} executions",
            fixture.display(),
            snapshot.executions.len()
        );

        let memory = Arc::new(MemoryBackend::new(snapshot));
        info!("Writing artifacts under {}", config.output_dir.display());
        Ok(Self {
            backend: Arc::new(RetryingBackend::new(memory.clone(), config.retry.clone())),
            store: Arc::new(LocalObjectStore::new(config.output_dir.clone())),
            channel: memory,
        })
    }

    #[cfg(feature = "aws")]
    async fn aws(config: &ReportConfig) -> Result<Self> {
        use crate::backend::aws::StepFunctionsBackend;
        use crate::publish::{s3::S3ObjectStore, sns::SnsChannel};

        let backend = Arc::new(StepFunctionsBackend::from_env().await);
        Ok(Self {
            backend: Arc::new(RetryingBackend::new(backend, config.retry.clone())),
            store: Arc::new(S3ObjectStore::from_env().await),
            channel: Arc::new(SnsChannel::from_env().await),
        })
    }

    #[cfg(not(feature = "aws"))]
    async fn aws(_config: &ReportConfig) -> Result<Self> {
        Err(ReportError::configuration(
            "the aws backend requires building with the `aws` feature",
        )
        .into())
    }
}
