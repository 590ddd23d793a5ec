//! Report configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `WORKFLOW_REPORT_*` environment variables.

use crate::backend::MAX_PAGE_SIZE;
use crate::error::{ReportError, ReportResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Main report configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Substring identifying the notification topic
    pub topic_substring: String,

    /// Job identifiers whose task events are reported
    pub recognized_modules: Vec<String>,

    /// Hyphen-separated segments of a job name forming its identifier
    pub job_name_segments: SegmentRange,

    /// Page size for history and child-execution listings
    pub page_size: usize,

    /// Maximum backend calls in flight
    pub concurrency: usize,

    /// Retry policy for transient backend failures
    pub retry: RetryPolicy,

    /// Link appended to failure notifications
    pub troubleshooting_url: Option<String>,

    /// Root directory of the local object store
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            topic_substring: "confluence-reports".to_string(),
            recognized_modules: [
                "init-workflow-subset",
                "init-workflow-global",
                "combine-data-subset",
                "combine-data-global",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            job_name_segments: SegmentRange::default(),
            page_size: MAX_PAGE_SIZE,
            concurrency: 4,
            retry: RetryPolicy::default(),
            troubleshooting_url: None,
            output_dir: PathBuf::from("reports"),
        }
    }
}

/// Half-open range of job-name segments, `start..end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRange {
    pub start: usize,
    pub end: usize,
}

impl Default for SegmentRange {
    fn default() -> Self {
        Self { start: 1, end: 4 }
    }
}

impl SegmentRange {
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Retry policy for backend calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the first call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry delay
    #[serde(with = "humantime_serde", default = "default_retry_delay")]
    pub initial_delay: Duration,

    /// Maximum retry delay
    #[serde(with = "humantime_serde", default = "default_max_retry_delay")]
    pub max_delay: Duration,

    /// Exponential backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Enable jitter
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_retry_delay(),
            max_delay: default_max_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based), before jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_retry_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

impl ReportConfig {
    /// Load configuration from an optional TOML file, then apply the environment
    pub async fn load(path: Option<&Path>) -> ReportResult<Self> {
        let mut config = match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    ReportError::configuration(format!("{}: {}", path.display(), e))
                })?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };

        config.merge_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> ReportResult<Self> {
        toml::from_str(content).map_err(ReportError::configuration)
    }

    /// Apply `WORKFLOW_REPORT_*` overrides read through `lookup`
    pub fn merge_env<F>(&mut self, lookup: F) -> ReportResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(topic) = lookup("WORKFLOW_REPORT_TOPIC") {
            self.topic_substring = topic;
        }
        if let Some(value) = lookup("WORKFLOW_REPORT_CONCURRENCY") {
            self.concurrency = parse_env("WORKFLOW_REPORT_CONCURRENCY", &value)?;
        }
        if let Some(value) = lookup("WORKFLOW_REPORT_PAGE_SIZE") {
            self.page_size = parse_env("WORKFLOW_REPORT_PAGE_SIZE", &value)?;
        }
        if let Some(value) = lookup("WORKFLOW_REPORT_MAX_RETRIES") {
            self.retry.max_retries = parse_env("WORKFLOW_REPORT_MAX_RETRIES", &value)?;
        }
        if let Some(dir) = lookup("WORKFLOW_REPORT_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Check values and clamp the page size to what backends accept
    pub fn validate(&mut self) -> ReportResult<()> {
        if self.job_name_segments.start >= self.job_name_segments.end {
            return Err(ReportError::configuration(format!(
                "job_name_segments must be a non-empty range, got {}..{}",
                self.job_name_segments.start, self.job_name_segments.end
            )));
        }
        if self.topic_substring.is_empty() {
            return Err(ReportError::configuration("topic_substring must not be empty"));
        }
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self.concurrency = self.concurrency.max(1);
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> ReportResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ReportError::configuration(format!("{key}={value}: {e}")))
}
