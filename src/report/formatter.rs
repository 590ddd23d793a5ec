//! Text summary and JSON artifacts for a [`RunReport`]

use super::{FailureIndex, RunReport};
use crate::error::ReportResult;

/// File name of the module document
pub const MODULE_DOCUMENT_NAME: &str = "module_data_report.json";
/// File name of the failure document
pub const FAILURE_DOCUMENT_NAME: &str = "module_data_failures.json";

/// The two machine-readable documents produced for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocuments {
    pub module_document: String,
    pub failure_document: String,
}

impl ReportDocuments {
    /// Parse the documents back into a report and failure index
    pub fn parse(&self) -> ReportResult<(RunReport, FailureIndex)> {
        let report = serde_json::from_str(&self.module_document)?;
        let failures = serde_json::from_str(&self.failure_document)?;
        Ok((report, failures))
    }
}

/// Render both documents as pretty-printed JSON
pub fn to_artifacts(report: &RunReport, failures: &FailureIndex) -> ReportResult<ReportDocuments> {
    Ok(ReportDocuments {
        module_document: serde_json::to_string_pretty(report)?,
        failure_document: serde_json::to_string_pretty(failures)?,
    })
}

/// Render the human readable totals block
///
/// `workflow` labels the execution; `run_type` is shown when known.
pub fn format_summary(report: &RunReport, workflow: &str, run_type: Option<&str>) -> String {
    let mut out = format!("{} execution: '{}'\n", workflow, report.name);
    if let Some(run_type) = run_type {
        out.push_str(&format!("Run type: {}\n", run_type));
    }
    if let Some(range) = &report.temporal_range {
        out.push_str(&format!("Temporal range: {}\n", range));
    }
    out.push('\n');

    out.push_str(&format!(
        "- Total Jobs: {}\n",
        group_thousands(report.total_jobs())
    ));
    out.push_str(&format!(
        "- Total Succeeded: {}\n",
        group_thousands(report.total_succeeded())
    ));
    out.push_str(&format!(
        "- Total Failed: {}\n",
        group_thousands(report.total_failed())
    ));
    out.push_str(&format!(
        "- Total Failed Percentage: {}\n",
        format_percentage(report.failed_percentage())
    ));
    out.push_str(&format!("- Total Execution Time: {}\n\n", report.total_time));
    out
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Two decimals with a grouped integer part, `1234.5` -> `1,234.50`
pub fn format_percentage(value: f64) -> String {
    let fixed = format!("{:.2}", value.max(0.0));
    match fixed.split_once('.') {
        Some((whole, fraction)) => match whole.parse::<u64>() {
            Ok(whole) => format!("{}.{}", group_thousands(whole), fraction),
            Err(_) => fixed,
        },
        None => fixed,
    }
}
