//! Per-case outcomes and run summaries.
//!
//! `TransportOutcome` is what the transport hands back for one request.
//! `CaseOutcome` is what the runner records for one test case after the
//! evaluator has (or has not) run. `RunSummary` collects a whole run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{report::DiscrepancyReport, response::ActualResponse};

/// The result of issuing one data call request.
///
/// Only `Response` is ever handed to the evaluator; the other variants are
/// sentinels recorded directly as the case outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportOutcome {
    Response(ActualResponse),
    /// The request did not complete within the configured timeout.
    Timeout,
    /// The host could not be reached.
    ConnectionError(String),
    /// The server answered 502.
    BadGateway,
    /// The body was not JSON or did not match the response envelope.
    InvalidResponse(String),
}

/// The recorded outcome of one test case.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum CaseOutcome {
    Passed,
    Failed(DiscrepancyReport),
    Timeout,
    ConnectionError(String),
    BadGateway,
    InvalidResponse(String),
    /// Not executed because the run was stopped first.
    Skipped,
}

impl CaseOutcome {
    /// Fold an evaluator report into an outcome.
    pub fn from_report(report: DiscrepancyReport) -> Self {
        if report.passed() {
            CaseOutcome::Passed
        } else {
            CaseOutcome::Failed(report)
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, CaseOutcome::Passed)
    }

    /// True for transport-level outcomes where no evaluation took place.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            CaseOutcome::Timeout
                | CaseOutcome::ConnectionError(_)
                | CaseOutcome::BadGateway
                | CaseOutcome::InvalidResponse(_)
        )
    }

    /// Short label used in per-case output lines.
    pub fn label(&self) -> &'static str {
        match self {
            CaseOutcome::Passed => "PASSED",
            CaseOutcome::Failed(_) => "FAILED",
            CaseOutcome::Timeout => "TIMEOUT",
            CaseOutcome::ConnectionError(_) => "CONNECTION_ERROR",
            CaseOutcome::BadGateway => "BAD_GATEWAY",
            CaseOutcome::InvalidResponse(_) => "INVALID_RESPONSE",
            CaseOutcome::Skipped => "SKIPPED",
        }
    }
}

impl TransportOutcome {
    /// Split a transport result into the response to evaluate or the
    /// sentinel outcome to record in its place.
    pub fn into_response(self) -> Result<ActualResponse, CaseOutcome> {
        match self {
            TransportOutcome::Response(response) => Ok(response),
            TransportOutcome::Timeout => Err(CaseOutcome::Timeout),
            TransportOutcome::ConnectionError(reason) => Err(CaseOutcome::ConnectionError(reason)),
            TransportOutcome::BadGateway => Err(CaseOutcome::BadGateway),
            TransportOutcome::InvalidResponse(reason) => Err(CaseOutcome::InvalidResponse(reason)),
        }
    }
}

/// One test case's position in the run and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    /// Index of the case in the input order.
    pub index: usize,
    pub data_call: String,
    pub outcome: CaseOutcome,
}

/// Unique identifier for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub uuid::Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything recorded about one run against one host.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub host: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per input case, in input order.
    pub results: Vec<CaseResult>,
}

impl RunSummary {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, CaseOutcome::Failed(_)))
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_error()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, CaseOutcome::Skipped))
            .count()
    }

    /// True when every case passed.
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_passed())
    }
}
