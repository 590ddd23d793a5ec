//! # workflow-report
//!
//! Health reports for branching workflow executions: a top-level run that
//! fans out into parallel map runs, one per processing module.
//!
//! ## Usage
//!
//! ```bash
//! workflow-report report -e <execution-id> -b <bucket> -k <prefix> [-t range] [-s bucket -r constrained] [--fail]
//! workflow-report inspect --latest <workflow-id> --fixture snapshot.json
//! ```
//!
//! ## Modules
//!
//! - `backend` - Orchestration backend trait, snapshot replay, retries, Step Functions
//! - `aggregate` - History pagination, task and map-run statistics, report assembly
//! - `report` - Report data model, text summary and JSON artifacts
//! - `publish` - Artifact storage and notification dispatch
//! - `pipeline` - End-to-end report run
//! - `config` - Layered report configuration
//! - `app` / `cli` - Process setup and command-line interface
pub mod aggregate;
pub mod app;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod publish;
pub mod report;

pub use aggregate::ReportAggregator;
pub use config::ReportConfig;
pub use error::{ReportError, ReportResult};
pub use pipeline::{ReportOutcome, ReportPipeline, ReportRequest};
pub use report::{FailureIndex, FailureRecord, ModuleStats, RunReport};
