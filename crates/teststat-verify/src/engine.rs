//! The expectation evaluator.
//!
//! `ExpectationEvaluator` implements the `Evaluator` trait from
//! `teststat-core`. Evaluation of one response runs in phases:
//!
//! 1. **Status**: the expected status code is compared as a string. On a
//!    mismatch the report holds the actual status and the first server
//!    message (first line only), and nothing else is checked.
//! 2. **Payload**: `data.results` is hoisted to the top level when it is a
//!    mapping, then the payload is normalized.
//! 3. **Flat fields**: each expectation whose first segment is not a nested
//!    block is resolved with first-element semantics and checked against the
//!    rule list declared at the same path.
//! 4. **Nested blocks**: deferred expectations are regrouped per block and
//!    reconciled against the block's records.
//!
//! Failures are collected, never short-circuited, so the report lists every
//! failing expectation in one pass.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use teststat_contracts::{
    case::{ExpectedOutput, STATUS_CODE_KEY},
    error::TestStatResult,
    report::{Discrepancy, DiscrepancyReport},
    response::ActualResponse,
    schema::{DataCallSpec, PATH_DELIMITER},
};
use teststat_core::traits::Evaluator;

use crate::{
    normalize::normalize,
    path::resolve_first,
    reconcile::reconcile,
    reshape::reshape,
    rules,
};

/// Key under which some data calls wrap their payload.
const RESULTS_KEY: &str = "results";

/// The TESTstat expectation evaluator. Stateless and safe to share.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectationEvaluator;

impl ExpectationEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Merge `data.results` into `data` when it is a mapping.
    fn hoist_results(data: &Value) -> Value {
        let Value::Object(fields) = data else {
            return data.clone();
        };
        let Some(Value::Object(results)) = fields.get(RESULTS_KEY) else {
            return data.clone();
        };

        let mut hoisted: Map<String, Value> = fields
            .iter()
            .filter(|(key, _)| key.as_str() != RESULTS_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for (key, value) in results {
            hoisted.insert(key.clone(), value.clone());
        }
        Value::Object(hoisted)
    }

    /// Phase 1. Returns the short-circuit report on mismatch.
    fn check_status(actual: &ActualResponse, expected: &ExpectedOutput) -> Option<DiscrepancyReport> {
        let actual_status = actual.status_code.to_string();
        if actual_status == expected.status_code {
            return None;
        }

        let mut report = DiscrepancyReport::new();
        report.record(STATUS_CODE_KEY, Discrepancy::Actual(Value::String(actual_status)));
        if let Some(message) = actual.messages.first() {
            report.record(
                message.kind(),
                Discrepancy::ServerMessage(message.first_line().to_string()),
            );
        }
        Some(report)
    }
}

impl Evaluator for ExpectationEvaluator {
    fn evaluate(
        &self,
        spec: &DataCallSpec,
        nested_fields: &HashSet<String>,
        actual: &ActualResponse,
        expected: &ExpectedOutput,
    ) -> TestStatResult<DiscrepancyReport> {
        // ── Phase 1: status code ─────────────────────────────────────────────
        if let Some(report) = Self::check_status(actual, expected) {
            debug!(
                data_call = %spec.id,
                expected = %expected.status_code,
                actual = actual.status_code,
                "status code mismatch"
            );
            return Ok(report);
        }

        // ── Phase 2: hoist and normalize ─────────────────────────────────────
        let data = self.canonical_payload(actual);

        let mut report = DiscrepancyReport::new();
        let mut deferred: Vec<(String, String)> = Vec::new();

        // ── Phase 3: flat fields ─────────────────────────────────────────────
        for (path, expected_value) in &expected.fields {
            let segments: Vec<&str> = path.split(PATH_DELIMITER).collect();
            let first = segments[0];

            if data.get(first).is_none() {
                debug!(data_call = %spec.id, path = %path, "expected key absent from response");
                report.record(path.clone(), Discrepancy::MissingKey);
                continue;
            }

            if nested_fields.contains(first) {
                spec.check_expected_path(path, expected_value, nested_fields)?;
                deferred.push((path.clone(), expected_value.clone()));
                continue;
            }

            let rule_list = spec.rules_at(path)?;
            let actual_value = match resolve_first(path, &data) {
                Ok(value) => value,
                Err(err) => {
                    debug!(data_call = %spec.id, %err, "expected path unresolvable");
                    report.record(path.clone(), Discrepancy::MissingKey);
                    continue;
                }
            };

            if !rules::evaluate(rule_list, expected_value, actual_value) {
                debug!(
                    data_call = %spec.id,
                    path = %path,
                    expected = %expected_value,
                    actual = %actual_value,
                    "field failed its rule list"
                );
                report.record(path.clone(), Discrepancy::Actual(actual_value.clone()));
            }
        }

        // ── Phase 4: nested blocks ───────────────────────────────────────────
        for (block, group) in reshape(&deferred) {
            if let Some(discrepancy) = reconcile(spec, &block, &group, &data)? {
                debug!(data_call = %spec.id, block = %block, %discrepancy, "nested block failed");
                report.record(block, discrepancy);
            }
        }

        if !report.passed() {
            warn!(
                data_call = %spec.id,
                failures = report.len(),
                paths = ?report.keys().collect::<Vec<_>>(),
                "response did not meet expectations"
            );
        }

        Ok(report)
    }

    fn canonical_payload(&self, actual: &ActualResponse) -> Value {
        normalize(&Self::hoist_results(&actual.data))
    }

    fn field_value<'p>(&self, payload: &'p Value, path: &str) -> Option<&'p Value> {
        resolve_first(path, payload).ok()
    }
}
