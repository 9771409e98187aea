//! Core trait definitions for the TESTstat pipeline.
//!
//! These three traits are the seams between the runner and its collaborators:
//!
//! - `SchemaRegistry` holds the declared output schema of every data call
//! - `Transport` issues one request and classifies what came back
//! - `Evaluator` compares an actual response against expectations
//!
//! The runner only ever hands a decoded `ActualResponse` to the evaluator.
//! Transport sentinels (timeout, connection error, bad gateway, invalid
//! body) are recorded as case outcomes without evaluation.

use std::collections::HashSet;

use serde_json::Value;

use teststat_contracts::{
    case::{ExpectedOutput, TestInput},
    error::{TestStatError, TestStatResult},
    execution::TransportOutcome,
    report::DiscrepancyReport,
    response::ActualResponse,
    schema::DataCallSpec,
};

/// Immutable catalogue of data calls, loaded once at startup.
pub trait SchemaRegistry: Send + Sync {
    /// Look up a data call by its slug, or `None` when it is not declared.
    fn get(&self, data_call: &str) -> Option<&DataCallSpec>;

    /// Field names whose values are lists of records matched existentially.
    fn nested_fields(&self) -> &HashSet<String>;

    /// Identifiers of every declared data call, sorted.
    fn data_call_ids(&self) -> Vec<&str>;

    /// Like `get`, but an unknown identifier is an error.
    fn data_call(&self, data_call: &str) -> TestStatResult<&DataCallSpec> {
        self.get(data_call).ok_or_else(|| TestStatError::UnknownDataCall {
            data_call: data_call.to_string(),
        })
    }

    fn is_nested(&self, field: &str) -> bool {
        self.nested_fields().contains(field)
    }
}

/// Issues one data call request against a fixed host.
///
/// Implementations own their timeout. A failure must be reported as a
/// `TransportOutcome` sentinel, never as a panic.
pub trait Transport: Send + Sync {
    fn fetch(&self, data_call: &str, input: &TestInput) -> TransportOutcome;

    /// The host requests are sent to, for run summaries.
    fn host(&self) -> &str;
}

/// Compares an actual response against a case's expectations.
///
/// Implementations must be pure: the same inputs always yield the same
/// report, and no field's failure may prevent the others from being checked.
pub trait Evaluator: Send + Sync {
    /// Return the discrepancy report; an empty report means the case passed.
    ///
    /// Errors only for authoring bugs, such as an expected path that the
    /// data call's schema does not declare.
    fn evaluate(
        &self,
        spec: &DataCallSpec,
        nested_fields: &HashSet<String>,
        actual: &ActualResponse,
        expected: &ExpectedOutput,
    ) -> TestStatResult<DiscrepancyReport>;

    /// The payload of `actual` in the form expectations are compared
    /// against.
    fn canonical_payload(&self, actual: &ActualResponse) -> Value;

    /// The value at an arrow-joined `path` of a canonical payload.
    fn field_value<'p>(&self, payload: &'p Value, path: &str) -> Option<&'p Value>;
}
