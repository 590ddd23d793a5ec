//! Command implementations

pub mod inspect;
pub mod report;

pub use inspect::run_inspect;
pub use report::run_report;
