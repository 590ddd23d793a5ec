//! Report data model
//!
//! Every value here is built fresh by one aggregation pass and never mutated
//! after assembly. Serialized field names follow the published document
//! layout (`Module`, `Total Jobs`, ...), so the types double as the artifact
//! schema.

pub mod formatter;

pub use formatter::{format_summary, to_artifacts, ReportDocuments};

use chrono::TimeDelta;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Aggregated outcome for one named module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ModuleRecord", from = "ModuleRecord")]
pub struct ModuleStats {
    /// Human readable module name
    pub module: String,
    /// Total job count
    pub total: u64,
    /// Jobs that succeeded
    pub succeeded: u64,
    /// Jobs that failed
    pub failed: u64,
    /// Elapsed wall time, already formatted
    pub execution_time: String,
}

impl ModuleStats {
    /// Stats for a single task event
    pub fn single(module: impl Into<String>, failed: bool, execution_time: TimeDelta) -> Self {
        Self {
            module: module.into(),
            total: 1,
            succeeded: u64::from(!failed),
            failed: u64::from(failed),
            execution_time: format_duration(execution_time),
        }
    }

    /// Percentage of failed jobs, computed from the current counts
    pub fn failed_percentage(&self) -> f64 {
        failed_percentage(self.failed, self.total)
    }
}

/// `failed / total * 100`, defined as 0 when there are no jobs
pub fn failed_percentage(failed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (failed as f64 / total as f64) * 100.0
    }
}

/// Wire layout of a [`ModuleStats`] entry in the module document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModuleRecord {
    #[serde(rename = "Module")]
    module: String,
    #[serde(rename = "Total Jobs")]
    total: u64,
    #[serde(rename = "Succeeded")]
    succeeded: u64,
    #[serde(rename = "Failed")]
    failed: u64,
    #[serde(rename = "Percentage Failed", default)]
    percentage_failed: f64,
    #[serde(rename = "Execution Time")]
    execution_time: String,
}

impl From<ModuleStats> for ModuleRecord {
    fn from(stats: ModuleStats) -> Self {
        let percentage_failed = stats.failed_percentage();
        Self {
            module: stats.module,
            total: stats.total,
            succeeded: stats.succeeded,
            failed: stats.failed,
            percentage_failed,
            execution_time: stats.execution_time,
        }
    }
}

impl From<ModuleRecord> for ModuleStats {
    // The stored percentage is derived data and is recomputed on demand.
    fn from(record: ModuleRecord) -> Self {
        Self {
            module: record.module,
            total: record.total,
            succeeded: record.succeeded,
            failed: record.failed,
            execution_time: record.execution_time,
        }
    }
}

/// One failed item within a module's map run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Position within the map run's input collection
    #[serde(rename = "Index")]
    pub index: u64,
    /// The input value that failed
    #[serde(rename = "Value")]
    pub value: serde_json::Value,
}

/// Failure records keyed by module name, in discovery order
///
/// Only modules with at least one failed job have an entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailureIndex {
    entries: Vec<(String, Vec<FailureRecord>)>,
}

impl FailureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the records for a module, appending to any existing entry
    pub fn insert(&mut self, module: impl Into<String>, records: Vec<FailureRecord>) {
        let module = module.into();
        match self.entries.iter_mut().find(|(name, _)| *name == module) {
            Some((_, existing)) => existing.extend(records),
            None => self.entries.push((module, records)),
        }
    }

    pub fn get(&self, module: &str) -> Option<&[FailureRecord]> {
        self.entries
            .iter()
            .find(|(name, _)| name == module)
            .map(|(_, records)| records.as_slice())
    }

    pub fn contains(&self, module: &str) -> bool {
        self.get(module).is_some()
    }

    /// Module names in discovery order
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FailureRecord])> {
        self.entries
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of failure records across all modules
    pub fn record_count(&self) -> usize {
        self.entries.iter().map(|(_, records)| records.len()).sum()
    }
}

impl Serialize for FailureIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (module, records) in &self.entries {
            map.serialize_entry(module, records)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FailureIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FailureIndexVisitor;

        impl<'de> Visitor<'de> for FailureIndexVisitor {
            type Value = FailureIndex;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of module name to failure records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut index = FailureIndex::new();
                while let Some((module, records)) =
                    access.next_entry::<String, Vec<FailureRecord>>()?
                {
                    index.insert(module, records);
                }
                Ok(index)
            }
        }

        deserializer.deserialize_map(FailureIndexVisitor)
    }
}

/// Top-level aggregate for one execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Execution name
    pub name: String,
    /// Caller supplied temporal range, if any
    pub temporal_range: Option<String>,
    /// Task-derived modules first, then map-run modules
    pub modules: Vec<ModuleStats>,
    /// Total elapsed time of the execution
    pub total_time: String,
}

impl RunReport {
    pub fn total_jobs(&self) -> u64 {
        self.modules.iter().map(|m| m.total).sum()
    }

    pub fn total_succeeded(&self) -> u64 {
        self.modules.iter().map(|m| m.succeeded).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.modules.iter().map(|m| m.failed).sum()
    }

    pub fn failed_percentage(&self) -> f64 {
        failed_percentage(self.total_failed(), self.total_jobs())
    }
}

/// Format an elapsed time as `H:MM:SS[.ffffff]`, prefixed by `N day(s), `
///
/// Negative spans are clamped to zero.
pub fn format_duration(delta: TimeDelta) -> String {
    let delta = delta.max(TimeDelta::zero());
    let total_secs = delta.num_seconds();
    let micros = (delta - TimeDelta::seconds(total_secs))
        .num_microseconds()
        .unwrap_or(0);

    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    let mut out = String::new();
    if days > 0 {
        let plural = if days == 1 { "" } else { "s" };
        out.push_str(&format!("{days} day{plural}, "));
    }
    out.push_str(&format!("{hours}:{minutes:02}:{seconds:02}"));
    if micros > 0 {
        out.push_str(&format!(".{micros:06}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stats(module: &str, total: u64, succeeded: u64, failed: u64) -> ModuleStats {
        ModuleStats {
            module: module.to_string(),
            total,
            succeeded,
            failed,
            execution_time: "0:00:01".to_string(),
        }
    }

    #[test]
    fn test_percentage_guards_zero_total() {
        assert_eq!(stats("Empty", 0, 0, 0).failed_percentage(), 0.0);
        assert_eq!(stats("Half", 10, 5, 5).failed_percentage(), 50.0);
        assert_eq!(stats("Some", 10, 8, 2).failed_percentage(), 20.0);
    }

    #[test]
    fn test_single_task_stats() {
        let ok = ModuleStats::single("Init Workflow Subset", false, TimeDelta::seconds(1));
        assert_eq!((ok.total, ok.succeeded, ok.failed), (1, 1, 0));
        assert_eq!(ok.failed_percentage(), 0.0);
        assert_eq!(ok.execution_time, "0:00:01");

        let failed = ModuleStats::single("Init Workflow Global", true, TimeDelta::seconds(2));
        assert_eq!((failed.total, failed.succeeded, failed.failed), (1, 0, 1));
        assert_eq!(failed.failed_percentage(), 100.0);
    }

    #[test]
    fn test_module_stats_field_order() {
        let value = serde_json::to_string(&stats("Combine Data Subset", 10, 8, 2)).unwrap();
        assert_eq!(
            value,
            r#"{"Module":"Combine Data Subset","Total Jobs":10,"Succeeded":8,"Failed":2,"Percentage Failed":20.0,"Execution Time":"0:00:01"}"#
        );
    }

    #[test]
    fn test_failure_index_preserves_insertion_order() {
        let mut index = FailureIndex::new();
        index.insert(
            "Zeta",
            vec![FailureRecord {
                index: 3,
                value: json!("reach-3"),
            }],
        );
        index.insert("Alpha", Vec::new());
        index.insert(
            "Zeta",
            vec![FailureRecord {
                index: 7,
                value: json!("reach-7"),
            }],
        );

        assert_eq!(index.modules().collect::<Vec<_>>(), vec!["Zeta", "Alpha"]);
        assert_eq!(index.get("Zeta").unwrap().len(), 2);
        assert_eq!(index.record_count(), 2);

        let text = serde_json::to_string(&index).unwrap();
        assert!(text.find("Zeta").unwrap() < text.find("Alpha").unwrap());

        let parsed: FailureIndex = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, index);
    }

    #[test]
    fn test_report_totals() {
        let report = RunReport {
            name: "exec-42".to_string(),
            temporal_range: None,
            modules: vec![stats("A", 1, 1, 0), stats("B", 10, 8, 2)],
            total_time: "0:10:00".to_string(),
        };
        assert_eq!(report.total_jobs(), 11);
        assert_eq!(report.total_succeeded(), 9);
        assert_eq!(report.total_failed(), 2);
        assert!((report.failed_percentage() - 18.181818).abs() < 1e-4);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(TimeDelta::zero()), "0:00:00");
        assert_eq!(format_duration(TimeDelta::seconds(3_661)), "1:01:01");
        assert_eq!(format_duration(TimeDelta::milliseconds(1_500)), "0:00:01.500000");
        assert_eq!(
            format_duration(TimeDelta::seconds(86_400 + 59)),
            "1 day, 0:00:59"
        );
        assert_eq!(format_duration(TimeDelta::days(3)), "3 days, 0:00:00");
        assert_eq!(format_duration(TimeDelta::seconds(-5)), "0:00:00");
    }
}
