//! Error types for report aggregation and publishing
//!
//! Errors fall into two groups. Fatal errors (backend connectivity, unknown
//! execution identifiers, storage writes) abort the whole pass with no partial
//! report. Recoverable errors (malformed event payloads) are logged and the
//! offending record is skipped by the caller.

use std::fmt;
use thiserror::Error;

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Exit codes reported by the CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const CONFIGURATION_ERROR: i32 = 2;
    pub const EXECUTION_NOT_FOUND: i32 = 3;
    pub const BACKEND_UNAVAILABLE: i32 = 4;
    pub const STORAGE_WRITE_FAILURE: i32 = 5;
    pub const NO_NOTIFICATION_CHANNEL: i32 = 6;
}

/// Report error types
#[derive(Error, Debug)]
pub enum ReportError {
    /// Orchestration backend unreachable, throttled or timed out
    #[error("Backend unavailable during {operation}: {message}")]
    BackendUnavailable { operation: String, message: String },

    /// Execution (or map run) identifier not known to the backend
    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),

    /// An event or record payload could not be decoded
    #[error("Malformed payload in {context}: {message}")]
    MalformedEventPayload { context: String, message: String },

    /// No notification topic matched the configured substring
    #[error("No notification channel matching '{0}'")]
    NoNotificationChannel(String),

    /// Writing an artifact failed
    #[error("Failed to write {location}: {message}{}", written_suffix(.written))]
    StorageWriteFailure {
        location: String,
        written: Vec<String>,
        message: String,
    },

    /// Invalid configuration or arguments
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn written_suffix(written: &[String]) -> String {
    if written.is_empty() {
        String::new()
    } else {
        format!(" (already written: {})", written.join(", "))
    }
}

impl ReportError {
    /// Create a backend unavailable error
    pub fn unavailable<O: fmt::Display, E: fmt::Display>(operation: O, err: E) -> Self {
        Self::BackendUnavailable {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// Create an execution not found error
    pub fn not_found<E: fmt::Display>(id: E) -> Self {
        Self::ExecutionNotFound(id.to_string())
    }

    /// Create a malformed payload error
    pub fn malformed<C: fmt::Display, E: fmt::Display>(context: C, err: E) -> Self {
        Self::MalformedEventPayload {
            context: context.to_string(),
            message: err.to_string(),
        }
    }

    /// Create a storage write error, recording artifacts written before the failure
    pub fn storage_write<L: fmt::Display, E: fmt::Display>(
        location: L,
        err: E,
        written: Vec<String>,
    ) -> Self {
        Self::StorageWriteFailure {
            location: location.to_string(),
            written,
            message: err.to_string(),
        }
    }

    /// Create a configuration error
    pub fn configuration<E: fmt::Display>(msg: E) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ExecutionNotFound(_))
    }

    /// Check if the error only affects a single record
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedEventPayload { .. })
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BackendUnavailable { .. } => exit_codes::BACKEND_UNAVAILABLE,
            Self::ExecutionNotFound(_) => exit_codes::EXECUTION_NOT_FOUND,
            Self::NoNotificationChannel(_) => exit_codes::NO_NOTIFICATION_CHANNEL,
            Self::StorageWriteFailure { .. } => exit_codes::STORAGE_WRITE_FAILURE,
            Self::Configuration(_) => exit_codes::CONFIGURATION_ERROR,
            Self::MalformedEventPayload { .. } | Self::Serialization(_) | Self::Io(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}
