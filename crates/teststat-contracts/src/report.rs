//! Discrepancy reports produced by the expectation evaluator.
//!
//! A report maps a failed path (or a synthetic key such as `status_code` or
//! a server message kind) to what went wrong. An empty report is the only
//! success signal.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Explanation recorded when an expected path's first segment is absent.
pub const MISSING_KEY_MESSAGE: &str = "The output does not include this key!";

/// Explanation recorded when no record of a nested block satisfies every leaf.
pub const NO_MATCHING_ITEM_MESSAGE: &str = "No item matching all the expected inputs found!";

/// One entry of a `DiscrepancyReport`.
#[derive(Debug, Clone, PartialEq)]
pub enum Discrepancy {
    /// A comparison failed; carries the normalized actual value verbatim.
    Actual(Value),
    /// The response does not contain the expected key.
    MissingKey,
    /// A nested block has no record satisfying every expected leaf.
    NoMatchingItem,
    /// A nested block expected to be non-empty was empty.
    EmptyBlock,
    /// First line of a server message reported alongside a status mismatch.
    ServerMessage(String),
}

impl Discrepancy {
    /// The literal value rendered in reports and results files.
    pub fn to_value(&self) -> Value {
        match self {
            Discrepancy::Actual(value) => value.clone(),
            Discrepancy::MissingKey => Value::String(MISSING_KEY_MESSAGE.to_string()),
            Discrepancy::NoMatchingItem => Value::String(NO_MATCHING_ITEM_MESSAGE.to_string()),
            Discrepancy::EmptyBlock => Value::Array(Vec::new()),
            Discrepancy::ServerMessage(text) => Value::String(text.clone()),
        }
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_value() {
            Value::String(s) => f.write_str(&s),
            other => write!(f, "{other}"),
        }
    }
}

impl Serialize for Discrepancy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// The evaluator's output for one test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DiscrepancyReport {
    entries: BTreeMap<String, Discrepancy>,
}

impl DiscrepancyReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a discrepancy under `key`, replacing any earlier entry.
    pub fn record(&mut self, key: impl Into<String>, discrepancy: Discrepancy) {
        self.entries.insert(key.into(), discrepancy);
    }

    pub fn get(&self, key: &str) -> Option<&Discrepancy> {
        self.entries.get(key)
    }

    /// True when no expectation failed.
    pub fn passed(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Discrepancy)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for DiscrepancyReport {
    /// One `path = value` line per entry, the format the suite table shows.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, discrepancy) in &self.entries {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{key} = {discrepancy}")?;
            first = false;
        }
        Ok(())
    }
}
