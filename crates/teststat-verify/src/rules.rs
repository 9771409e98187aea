//! Per-field rule application.
//!
//! `apply` runs one rule against one expected string and one normalized
//! actual value. Pre-filter rules yield a rewritten expected value instead of
//! a verdict; nothing is ever mutated in place.
//!
//! `evaluate` runs a whole `RuleList`: pre-filters in order (their verdicts
//! discarded, their rewrites kept), then every comparison rule combined by
//! the list's aggregator.

use serde_json::Value;
use tracing::debug;

use teststat_contracts::{
    case::NOT_EMPTY,
    rule::{Rule, RuleList},
};

/// Operators recognised by `Rule::Compare`, in the order they are tried.
const COMPARE_OPERATORS: [&str; 4] = [">=", ">", "<=", "<"];

/// What applying one rule produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleEffect {
    /// The rule held (`true`) or did not (`false`).
    Verdict(bool),
    /// The rule is a pre-filter; this is the rewritten expected value.
    Rewrite(String),
}

/// Apply `rule` to `expected` and the normalized `actual` value.
pub fn apply(rule: Rule, expected: &str, actual: &Value) -> RuleEffect {
    match rule {
        Rule::TrimAs => RuleEffect::Rewrite(trim_as(expected).to_string()),
        Rule::NotEmpty => RuleEffect::Verdict(expected == NOT_EMPTY && is_truthy(actual)),
        Rule::Include => RuleEffect::Verdict(include(expected, actual)),
        Rule::IncludeKeys => RuleEffect::Verdict(include_keys(expected, actual)),
        Rule::Match => RuleEffect::Verdict(matches!(actual, Value::String(s) if s == expected)),
        Rule::Compare => RuleEffect::Verdict(compare(expected, actual)),
    }
}

/// Evaluate a whole rule list for one field.
pub fn evaluate(rules: &RuleList, expected: &str, actual: &Value) -> bool {
    let mut expected = expected.to_string();
    for rule in rules.prefilters() {
        if let RuleEffect::Rewrite(rewritten) = apply(*rule, &expected, actual) {
            expected = rewritten;
        }
    }

    // A pre-filter placed after the aggregator has no verdict; it never holds.
    let verdicts = rules
        .comparisons()
        .iter()
        .map(|rule| matches!(apply(*rule, &expected, actual), RuleEffect::Verdict(true)));
    rules.aggregator().combine(verdicts)
}

fn trim_as(expected: &str) -> &str {
    expected.strip_prefix("as").unwrap_or(expected)
}

/// Truthiness of a normalized value: empty strings, sequences, and mappings
/// are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null => false,
    }
}

/// Membership of one token: substring of a string, element of a sequence,
/// key of a mapping.
fn contains(actual: &Value, token: &str) -> bool {
    match actual {
        Value::String(s) => s.contains(token),
        Value::Array(items) => items.iter().any(|item| matches!(item, Value::String(s) if s == token)),
        Value::Object(fields) => fields.contains_key(token),
        _ => false,
    }
}

fn include(expected: &str, actual: &Value) -> bool {
    expected.split(',').all(|token| contains(actual, token))
}

fn include_keys(expected: &str, actual: &Value) -> bool {
    match actual {
        Value::Object(fields) => expected.split(',').all(|token| fields.contains_key(token)),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn compare(expected: &str, actual: &Value) -> bool {
    let Some(op) = COMPARE_OPERATORS.into_iter().find(|op| expected.contains(op)) else {
        debug!(expected = %expected, "compare expectation has no operator");
        return false;
    };

    // The threshold is the text between the first and second occurrence.
    let threshold = expected.split(op).nth(1).and_then(|t| t.parse::<f64>().ok());
    let (Some(threshold), Some(actual)) = (threshold, as_number(actual)) else {
        debug!(expected = %expected, actual = %actual, "compare operands are not numeric");
        return false;
    };

    match op {
        ">=" => actual >= threshold,
        ">" => actual > threshold,
        "<=" => actual <= threshold,
        _ => actual < threshold,
    }
}
