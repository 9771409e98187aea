//! Test cases and their persisted textual grammar.
//!
//! ```text
//! test_input      = "resource=193.0.0.0/21&lod=1"
//! expected_output = "status_code = 200; exact->inetnum = 193.0.0.0-193.0.7.255"
//! ```
//!
//! Expected values are canonicalized when parsed (spaces removed, lower-cased,
//! `&` read as the list separator `,`) so they compare directly against a
//! normalized response.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TestStatError, TestStatResult};

/// Sentinel expected value asserting that a field is present and non-empty.
pub const NOT_EMPTY: &str = "notempty";

/// The key of the mandatory status-code expectation.
pub const STATUS_CODE_KEY: &str = "status_code";

/// Query parameters of one data call request, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestInput {
    pub params: Vec<(String, String)>,
}

impl TestInput {
    /// Parse `&`-, `;`-, or newline-joined `key=value` pairs.
    pub fn parse(text: &str) -> TestStatResult<Self> {
        let mut params = Vec::new();
        for pair in text.split(['&', ';', '\n']) {
            let pair = strip_spaces(pair);
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').ok_or_else(|| TestStatError::InvalidTestCase {
                reason: format!("test input pair '{}' has no '='", pair),
            })?;
            if key.is_empty() {
                return Err(TestStatError::InvalidTestCase {
                    reason: format!("test input pair '{}' has an empty key", pair),
                });
            }
            params.push((key.to_string(), value.to_string()));
        }
        Ok(Self { params })
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl fmt::Display for TestInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        f.write_str(&rendered.join("&"))
    }
}

/// The user's expectations for one response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedOutput {
    /// Expected status code, compared as a string.
    pub status_code: String,
    /// `(path, expected)` pairs in declaration order, excluding `status_code`.
    pub fields: Vec<(String, String)>,
}

impl ExpectedOutput {
    pub fn new(status_code: impl Into<String>) -> Self {
        Self {
            status_code: status_code.into(),
            fields: Vec::new(),
        }
    }

    /// Add an expectation. The value is taken as already canonical.
    pub fn with_field(mut self, path: impl Into<String>, expected: impl Into<String>) -> Self {
        self.fields.push((path.into(), expected.into()));
        self
    }

    /// Parse the `;`-joined `path = value` grammar.
    ///
    /// Fails when a pair lacks `=` or when no `status_code` entry is present.
    pub fn parse(text: &str) -> TestStatResult<Self> {
        let mut status_code = None;
        let mut fields = Vec::new();

        for pair in text.split([';', '\n']) {
            if pair.trim().is_empty() {
                continue;
            }
            let (path, value) = pair.split_once('=').ok_or_else(|| TestStatError::InvalidTestCase {
                reason: format!("expected output pair '{}' has no '='", pair.trim()),
            })?;
            let path = canonical(path);
            let value = canonical(value).replace('&', ",");
            if path.is_empty() {
                return Err(TestStatError::InvalidTestCase {
                    reason: format!("expected output pair '{}' has an empty path", pair.trim()),
                });
            }
            if path == STATUS_CODE_KEY {
                status_code = Some(value);
            } else {
                fields.push((path, value));
            }
        }

        let status_code = status_code.ok_or_else(|| TestStatError::InvalidTestCase {
            reason: "expected output has no status_code entry".to_string(),
        })?;

        Ok(Self {
            status_code,
            fields,
        })
    }
}

impl fmt::Display for ExpectedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", STATUS_CODE_KEY, self.status_code)?;
        for (path, value) in &self.fields {
            write!(f, "; {path} = {value}")?;
        }
        Ok(())
    }
}

/// One persisted test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub data_call: String,
    pub test_input: TestInput,
    pub expected_output: ExpectedOutput,
}

impl TestCase {
    /// Build a test case from its three textual columns.
    pub fn parse(data_call: &str, test_input: &str, expected_output: &str) -> TestStatResult<Self> {
        let data_call = data_call.trim();
        if data_call.is_empty() {
            return Err(TestStatError::InvalidTestCase {
                reason: "data call is empty".to_string(),
            });
        }
        Ok(Self {
            data_call: data_call.to_string(),
            test_input: TestInput::parse(test_input)?,
            expected_output: ExpectedOutput::parse(expected_output)?,
        })
    }
}

fn strip_spaces(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn canonical(s: &str) -> String {
    strip_spaces(s).to_lowercase()
}
