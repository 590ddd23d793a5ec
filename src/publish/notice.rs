//! Notification subject and body composition

use super::PublishedArtifacts;
use crate::backend::ExecutionRef;
use crate::report::{format_summary, RunReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing mode of the upstream run, which selects the granule prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Constrained,
    Unconstrained,
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constrained => write!(f, "constrained"),
            Self::Unconstrained => write!(f, "unconstrained"),
        }
    }
}

/// Bucket area holding the upstream run's granules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamSource {
    pub bucket: String,
    pub run_type: RunType,
    pub version: String,
}

impl UpstreamSource {
    pub fn new(bucket: impl Into<String>, run_type: RunType, version: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            run_type,
            version: version.into(),
        }
    }

    /// Build a source when every part is known; the version comes from the execution name
    pub fn resolve(
        bucket: Option<&str>,
        run_type: Option<RunType>,
        execution: &ExecutionRef,
    ) -> Option<Self> {
        Some(Self::new(bucket?, run_type?, execution.version()?))
    }

    pub fn prefix(&self) -> String {
        format!("{}/{}", self.run_type, self.version)
    }

    /// Listing text for the notification body; keys are shown by base name
    pub fn render(&self, keys: &[String]) -> String {
        if keys.is_empty() {
            return format!(
                "No SOS granules stored in s3://{}/{}.\n",
                self.bucket,
                self.prefix()
            );
        }

        let mut out = format!(
            "SOS granules stored in s3://{}/{}\n\n",
            self.bucket,
            self.prefix()
        );
        for key in keys {
            let name = key.rsplit('/').next().unwrap_or(key);
            out.push_str(&format!("- {}\n", name));
        }
        out
    }
}

/// Everything a run notification reports on
#[derive(Debug, Clone)]
pub struct Notice<'a> {
    pub report: &'a RunReport,
    pub execution: &'a ExecutionRef,
    pub run_type: Option<RunType>,
    pub artifacts: &'a PublishedArtifacts,
    /// Rendered upstream listing, if one was produced
    pub upstream: Option<&'a str>,
    pub success: bool,
}

pub fn compose_subject(success: bool, at: DateTime<Utc>) -> String {
    let stamp = at.format("%a %b %d %H:%M:%S %Y");
    if success {
        format!("Confluence workflow report {} UTC", stamp)
    } else {
        format!("!FAILURE! Confluence workflow report {} UTC", stamp)
    }
}

pub fn compose_body(notice: &Notice<'_>, troubleshooting_url: Option<&str>) -> String {
    let workflow = &notice.execution.workflow;
    let mut body = if notice.success {
        "CONFLUENCE WORKFLOW SUCCESSFULLY COMPLETED.\n\n".to_string()
    } else {
        let mut text = format!(
            "CONFLUENCE WORKFLOW FAILURE.\n\nTo locate failures: See workflow: {} with execution: {}.\n\n",
            workflow, notice.execution.name
        );
        match troubleshooting_url {
            Some(url) => text.push_str(&format!(
                "Please visit the following link for documentation on how to troubleshoot: [{}].\n\n",
                url
            )),
            None => text.push_str(&format!(
                "Failed inputs per module are listed in: {}.\n\n",
                notice.artifacts.failure_uri
            )),
        }
        text
    };

    let run_type = notice.run_type.map(|r| r.to_string());
    body.push_str(&format_summary(notice.report, workflow, run_type.as_deref()));
    if let Some(upstream) = notice.upstream {
        body.push_str(upstream);
        body.push('\n');
    }
    body.push_str(&format!(
        "Report written to: {}.\nFailures written to: {}.\n",
        notice.artifacts.module_uri, notice.artifacts.failure_uri
    ));
    body
}
