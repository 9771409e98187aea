//! Test suite files.
//!
//! ```toml
//! [[cases]]
//! data_call = "abuse-contact-finder"
//! test_input = "resource=193.0.0.0/21"
//! expected_output = "status_code = 200; authoritative_rir = ripe"
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use teststat_contracts::{
    case::TestCase,
    error::{TestStatError, TestStatResult},
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuiteFile {
    #[serde(default)]
    cases: Vec<RawCase>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCase {
    data_call: String,
    #[serde(default)]
    test_input: String,
    expected_output: String,
}

/// Parse a suite from TOML text.
pub fn parse_suite(text: &str) -> TestStatResult<Vec<TestCase>> {
    let file: SuiteFile = toml::from_str(text).map_err(|e| TestStatError::ConfigError {
        reason: format!("failed to parse suite TOML: {}", e),
    })?;

    file.cases
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            TestCase::parse(&raw.data_call, &raw.test_input, &raw.expected_output).map_err(|e| {
                TestStatError::ConfigError {
                    reason: format!("suite case {} ({}): {}", index, raw.data_call, e),
                }
            })
        })
        .collect()
}

/// Load a suite file from disk.
pub fn load_suite(path: &Path) -> TestStatResult<Vec<TestCase>> {
    let text = std::fs::read_to_string(path).map_err(|e| TestStatError::ConfigError {
        reason: format!("failed to read suite file '{}': {}", path.display(), e),
    })?;
    let cases = parse_suite(&text)?;
    debug!(path = %path.display(), cases = cases.len(), "suite loaded");
    Ok(cases)
}

/// Keep only cases whose data call is in `data_calls`. An empty filter keeps
/// everything.
pub fn filter_cases(cases: Vec<TestCase>, data_calls: &[String]) -> Vec<TestCase> {
    if data_calls.is_empty() {
        return cases;
    }
    cases
        .into_iter()
        .filter(|case| data_calls.iter().any(|dc| dc == &case.data_call))
        .collect()
}

/// Which lines of a resource list to use: the first `n`, or `start-end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLimit {
    First(usize),
    Range(usize, usize),
}

impl std::str::FromStr for ResourceLimit {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let number = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|e| format!("invalid limit '{}': {}", text, e))
        };
        match text.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (number(start)?, number(end)?);
                if start > end {
                    return Err(format!("invalid limit '{}': start is after end", text));
                }
                Ok(ResourceLimit::Range(start, end))
            }
            None => number(text).map(ResourceLimit::First),
        }
    }
}

/// Load a resource list: one resource per line. Quotes and commas are
/// stripped so JSON-ish lists can be pasted in as-is; blank lines are
/// dropped after `limit` has picked the lines.
pub fn load_resources(path: &Path, limit: Option<ResourceLimit>) -> TestStatResult<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| TestStatError::ConfigError {
        reason: format!("failed to read resource file '{}': {}", path.display(), e),
    })?;

    let lines: Vec<&str> = text.lines().collect();
    let selected = match limit {
        None => &lines[..],
        Some(ResourceLimit::First(n)) => &lines[..n.min(lines.len())],
        Some(ResourceLimit::Range(start, end)) => {
            &lines[start.min(lines.len())..end.min(lines.len())]
        }
    };

    let resources: Vec<String> = selected
        .iter()
        .map(|line| line.replace(['"', ','], "").trim().to_string())
        .filter(|resource| !resource.is_empty())
        .collect();
    debug!(path = %path.display(), resources = resources.len(), "resources loaded");
    Ok(resources)
}
