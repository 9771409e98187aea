//! Error types for the TESTstat pipeline.
//!
//! Data-shape problems inside a single response field never surface here;
//! they become entries in a `DiscrepancyReport`. These variants cover the
//! unrecoverable cases: registry authoring bugs, malformed configuration,
//! and malformed test-case text.

use thiserror::Error;

use crate::rule::RuleListError;

/// The unified error type for the TESTstat crates.
#[derive(Debug, Error)]
pub enum TestStatError {
    /// The data call identifier is not present in the schema registry.
    #[error("unknown data call '{data_call}'")]
    UnknownDataCall { data_call: String },

    /// An expected-output path does not exist in the registry's output schema,
    /// or resolves to the wrong kind of node.
    ///
    /// This indicates a test-suite or registry authoring bug, not a runtime
    /// data issue.
    #[error("schema path '{path}' is invalid for data call '{data_call}': {reason}")]
    SchemaPath {
        data_call: String,
        path: String,
        reason: String,
    },

    /// A registry, suite, or runner configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A persisted test case could not be parsed.
    #[error("invalid test case: {reason}")]
    InvalidTestCase { reason: String },

    /// The transport could not be constructed.
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// A batch worker thread panicked while running a case.
    #[error("worker running data call '{data_call}' panicked")]
    WorkerPanicked { data_call: String },
}

impl From<RuleListError> for TestStatError {
    fn from(err: RuleListError) -> Self {
        TestStatError::ConfigError {
            reason: err.to_string(),
        }
    }
}

/// Convenience alias used throughout the TESTstat crates.
pub type TestStatResult<T> = Result<T, TestStatError>;
