//! The TESTstat runner: fetch, evaluate, record.
//!
//! Every case goes through the same pipeline:
//!
//!   Registry lookup → Transport::fetch → [Evaluator::evaluate] → CaseOutcome
//!
//! The evaluator is only reached when the transport produced a decoded
//! response. Sentinels are recorded as the case outcome directly.
//!
//! Three modes share that pipeline:
//!
//! - `run_batched` splits the cases into fixed-size batches and runs every
//!   request of a batch concurrently on scoped threads. The batch is joined
//!   before the next one starts. A timeout or connection failure of one case
//!   never affects its siblings.
//! - `run_sequential` runs one case at a time, checks a `StopSignal` between
//!   cases, and ends the run when the host is unreachable. Cases not reached
//!   are recorded as `Skipped`.
//! - `compare_hosts` runs the same cases against two hosts and lists the
//!   cases that fail on only one of them.
//!
//! `compare_versions` sits beside them: it asks one host for the same
//! resources under several `preferred_version` values and compares the
//! canonical payloads field by field instead of evaluating expectations.
//!
//! Results always preserve input order.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use teststat_contracts::{
    case::{TestCase, TestInput, NOT_EMPTY, STATUS_CODE_KEY},
    error::{TestStatError, TestStatResult},
    execution::{CaseOutcome, CaseResult, RunId, RunSummary, TransportOutcome},
};

use crate::traits::{Evaluator, SchemaRegistry, Transport};

/// Cooperative cancellation flag for sequential runs.
///
/// Cloning shares the flag, so one clone can be handed to whatever decides
/// to stop (a signal handler, a UI button) while the runner polls another.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop before its next case.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of running the same cases against two hosts.
#[derive(Debug, Clone, Serialize)]
pub struct HostComparison {
    pub primary: RunSummary,
    pub secondary: RunSummary,
    /// Indexes of cases that failed on the primary host but not the secondary.
    pub failed_only_on_primary: Vec<usize>,
    /// Indexes of cases that failed on the secondary host but not the primary.
    pub failed_only_on_secondary: Vec<usize>,
}

impl HostComparison {
    /// True when both hosts agree on every case.
    pub fn consistent(&self) -> bool {
        self.failed_only_on_primary.is_empty() && self.failed_only_on_secondary.is_empty()
    }
}

/// Query parameter selecting the data call version to answer with.
pub const PREFERRED_VERSION_PARAM: &str = "preferred_version";

/// What one version answered for one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VersionOutput {
    /// A decoded response; `data` is the canonical payload.
    Response { status_code: u16, data: Value },
    /// No response was decoded.
    Failed { error: CaseOutcome },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionResult {
    pub version: String,
    #[serde(flatten)]
    pub output: VersionOutput,
}

/// All versions' answers for one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceComparison {
    pub resource: String,
    /// One entry per version, in the order the versions were given.
    pub results: Vec<VersionResult>,
    /// Compared fields (and `status_code`) whose values differ between versions.
    pub mismatched_fields: Vec<String>,
}

impl ResourceComparison {
    /// True when every version answered and they agree on every compared field.
    pub fn consistent(&self) -> bool {
        self.mismatched_fields.is_empty()
            && self
                .results
                .iter()
                .all(|r| matches!(r.output, VersionOutput::Response { .. }))
    }
}

/// Outcome of asking one host for the same resources under several versions.
#[derive(Debug, Clone, Serialize)]
pub struct VersionComparison {
    pub run_id: RunId,
    pub host: String,
    pub data_call: String,
    pub versions: Vec<String>,
    pub fields: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per resource, in input order.
    pub resources: Vec<ResourceComparison>,
}

impl VersionComparison {
    /// Resources whose versions disagree or did not all answer.
    pub fn mismatched_resources(&self) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|r| !r.consistent())
            .map(|r| r.resource.as_str())
            .collect()
    }

    pub fn consistent(&self) -> bool {
        self.resources.iter().all(ResourceComparison::consistent)
    }
}

/// Drives test cases through the transport and evaluator.
///
/// The runner owns the registry and evaluator; transports are passed per
/// run so the same runner can target several hosts.
pub struct Runner {
    registry: Box<dyn SchemaRegistry>,
    evaluator: Box<dyn Evaluator>,
}

impl Runner {
    pub fn new(registry: Box<dyn SchemaRegistry>, evaluator: Box<dyn Evaluator>) -> Self {
        Self {
            registry,
            evaluator,
        }
    }

    pub fn registry(&self) -> &dyn SchemaRegistry {
        self.registry.as_ref()
    }

    /// Reject cases naming a data call the registry does not declare, or an
    /// expected path its output schema cannot evaluate.
    ///
    /// Called before any request is issued, so a typo in one case does not
    /// surface only after the rest of the suite has already hit the network.
    pub fn check_cases(&self, cases: &[TestCase]) -> TestStatResult<()> {
        let nested_fields = self.registry.nested_fields();
        for case in cases {
            let spec = self.registry.data_call(&case.data_call)?;
            for (path, expected) in &case.expected_output.fields {
                spec.check_expected_path(path, expected, nested_fields)?;
            }
        }
        Ok(())
    }

    /// Run `cases` in batches of `batch_size` concurrent requests.
    ///
    /// # Errors
    ///
    /// Returns `Err` for an unknown data call, for evaluator errors (an
    /// expected path the schema does not declare), and when a worker thread
    /// panics. Transport failures are NOT errors; they are case outcomes.
    pub fn run_batched(
        &self,
        transport: &dyn Transport,
        cases: &[TestCase],
        batch_size: usize,
    ) -> TestStatResult<RunSummary> {
        self.check_cases(cases)?;

        let batch_size = batch_size.max(1);
        let run_id = RunId::new();
        let started_at = Utc::now();

        info!(
            run_id = %run_id,
            host = %transport.host(),
            cases = cases.len(),
            batch_size,
            "batched run starting"
        );

        let mut results = Vec::with_capacity(cases.len());
        for (batch_index, batch) in cases.chunks(batch_size).enumerate() {
            let offset = batch_index * batch_size;
            debug!(run_id = %run_id, batch = batch_index, size = batch.len(), "batch starting");

            let batch_results: Vec<TestStatResult<CaseResult>> = thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .enumerate()
                    .map(|(i, case)| {
                        let handle = scope.spawn(move || self.run_case(transport, offset + i, case));
                        (case, handle)
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|(case, handle)| {
                        handle.join().unwrap_or_else(|_| {
                            Err(TestStatError::WorkerPanicked {
                                data_call: case.data_call.clone(),
                            })
                        })
                    })
                    .collect()
            });

            for result in batch_results {
                results.push(result?);
            }
        }

        let summary = RunSummary {
            run_id,
            host: transport.host().to_string(),
            started_at,
            finished_at: Utc::now(),
            results,
        };
        log_summary(&summary);
        Ok(summary)
    }

    /// Run `cases` one at a time, honouring `stop` between cases.
    ///
    /// A connection error means the host is unreachable: the run ends and
    /// every remaining case is recorded as `Skipped`. Timeouts and other
    /// sentinels do not end the run.
    pub fn run_sequential(
        &self,
        transport: &dyn Transport,
        cases: &[TestCase],
        stop: &StopSignal,
    ) -> TestStatResult<RunSummary> {
        self.check_cases(cases)?;

        let run_id = RunId::new();
        let started_at = Utc::now();

        info!(
            run_id = %run_id,
            host = %transport.host(),
            cases = cases.len(),
            "sequential run starting"
        );

        let mut results = Vec::with_capacity(cases.len());
        let mut halted = false;
        for (index, case) in cases.iter().enumerate() {
            if halted || stop.is_stopped() {
                results.push(CaseResult {
                    index,
                    data_call: case.data_call.clone(),
                    outcome: CaseOutcome::Skipped,
                });
                continue;
            }

            let result = self.run_case(transport, index, case)?;
            if matches!(result.outcome, CaseOutcome::ConnectionError(_)) {
                warn!(
                    run_id = %run_id,
                    host = %transport.host(),
                    index,
                    "host unreachable, skipping remaining cases"
                );
                halted = true;
            }
            results.push(result);
        }

        let summary = RunSummary {
            run_id,
            host: transport.host().to_string(),
            started_at,
            finished_at: Utc::now(),
            results,
        };
        log_summary(&summary);
        Ok(summary)
    }

    /// Run `cases` against both hosts and report one-sided failures.
    pub fn compare_hosts(
        &self,
        primary: &dyn Transport,
        secondary: &dyn Transport,
        cases: &[TestCase],
        batch_size: usize,
    ) -> TestStatResult<HostComparison> {
        let primary_summary = self.run_batched(primary, cases, batch_size)?;
        let secondary_summary = self.run_batched(secondary, cases, batch_size)?;

        let mut failed_only_on_primary = Vec::new();
        let mut failed_only_on_secondary = Vec::new();
        for (p, s) in primary_summary.results.iter().zip(&secondary_summary.results) {
            match (counts_as_failure(&p.outcome), counts_as_failure(&s.outcome)) {
                (true, false) => failed_only_on_primary.push(p.index),
                (false, true) => failed_only_on_secondary.push(s.index),
                _ => {}
            }
        }

        info!(
            primary = %primary.host(),
            secondary = %secondary.host(),
            only_primary = failed_only_on_primary.len(),
            only_secondary = failed_only_on_secondary.len(),
            "host comparison finished"
        );

        Ok(HostComparison {
            primary: primary_summary,
            secondary: secondary_summary,
            failed_only_on_primary,
            failed_only_on_secondary,
        })
    }

    /// Fetch `resources` from `transport` under every version in `versions`
    /// and compare the canonical payloads on `fields`.
    ///
    /// Requests go out in batches of `batch_size`, like `run_batched`. A
    /// resource is consistent when every version answered with the same
    /// status code and the same value (or absence) at every field.
    ///
    /// # Errors
    ///
    /// `UnknownDataCall`, `SchemaPath` for an undeclared field, and
    /// `ConfigError` for fewer than two versions, all before any request.
    /// `WorkerPanicked` when a worker thread panics.
    pub fn compare_versions(
        &self,
        transport: &dyn Transport,
        data_call: &str,
        resources: &[String],
        versions: &[String],
        fields: &[String],
        batch_size: usize,
    ) -> TestStatResult<VersionComparison> {
        let spec = self.registry.data_call(data_call)?;
        for field in fields {
            spec.check_expected_path(field, NOT_EMPTY, self.registry.nested_fields())?;
        }
        if versions.len() < 2 {
            return Err(TestStatError::ConfigError {
                reason: format!("comparing versions needs at least two, got {}", versions.len()),
            });
        }

        let run_id = RunId::new();
        let started_at = Utc::now();
        info!(
            run_id = %run_id,
            host = %transport.host(),
            data_call = %data_call,
            resources = resources.len(),
            versions = ?versions,
            "version comparison starting"
        );

        let inputs: Vec<TestInput> = resources
            .iter()
            .flat_map(|resource| {
                versions.iter().map(move |version| TestInput {
                    params: vec![
                        ("resource".to_string(), resource.clone()),
                        (PREFERRED_VERSION_PARAM.to_string(), version.clone()),
                    ],
                })
            })
            .collect();

        let mut outcomes = fetch_in_batches(transport, data_call, &inputs, batch_size)?.into_iter();
        let mut compared = Vec::with_capacity(resources.len());
        for resource in resources {
            let results: Vec<VersionResult> = versions
                .iter()
                .zip(outcomes.by_ref())
                .map(|(version, outcome)| VersionResult {
                    version: version.clone(),
                    output: match outcome.into_response() {
                        Ok(actual) => VersionOutput::Response {
                            status_code: actual.status_code,
                            data: self.evaluator.canonical_payload(&actual),
                        },
                        Err(error) => VersionOutput::Failed { error },
                    },
                })
                .collect();

            let comparison = ResourceComparison {
                resource: resource.clone(),
                mismatched_fields: self.mismatched_fields(&results, fields),
                results,
            };
            if !comparison.consistent() {
                warn!(
                    data_call = %data_call,
                    resource = %resource,
                    fields = ?comparison.mismatched_fields,
                    "versions disagree"
                );
            }
            compared.push(comparison);
        }

        let comparison = VersionComparison {
            run_id,
            host: transport.host().to_string(),
            data_call: data_call.to_string(),
            versions: versions.to_vec(),
            fields: fields.to_vec(),
            started_at,
            finished_at: Utc::now(),
            resources: compared,
        };
        info!(
            run_id = %run_id,
            mismatched = comparison.mismatched_resources().len(),
            "version comparison finished"
        );
        Ok(comparison)
    }

    /// Fields on which the versions that answered disagree.
    fn mismatched_fields(&self, results: &[VersionResult], fields: &[String]) -> Vec<String> {
        let answered: Vec<(u16, &Value)> = results
            .iter()
            .filter_map(|r| match &r.output {
                VersionOutput::Response { status_code, data } => Some((*status_code, data)),
                VersionOutput::Failed { .. } => None,
            })
            .collect();

        let mut mismatched = Vec::new();
        if answered.windows(2).any(|w| w[0].0 != w[1].0) {
            mismatched.push(STATUS_CODE_KEY.to_string());
        }
        for field in fields {
            let values: Vec<Option<&Value>> = answered
                .iter()
                .map(|(_, data)| self.evaluator.field_value(data, field))
                .collect();
            if values.windows(2).any(|w| w[0] != w[1]) {
                mismatched.push(field.clone());
            }
        }
        mismatched
    }

    /// Fetch and evaluate one case.
    fn run_case(&self, transport: &dyn Transport, index: usize, case: &TestCase) -> TestStatResult<CaseResult> {
        let spec = self.registry.data_call(&case.data_call)?;

        debug!(
            data_call = %case.data_call,
            index,
            input = %case.test_input,
            "fetching data call"
        );

        let outcome = match transport.fetch(&case.data_call, &case.test_input).into_response() {
            Ok(actual) => {
                let report = self.evaluator.evaluate(
                    spec,
                    self.registry.nested_fields(),
                    &actual,
                    &case.expected_output,
                )?;
                CaseOutcome::from_report(report)
            }
            Err(sentinel) => {
                warn!(
                    data_call = %case.data_call,
                    index,
                    outcome = sentinel.label(),
                    "request did not produce a response"
                );
                sentinel
            }
        };

        debug!(data_call = %case.data_call, index, outcome = outcome.label(), "case finished");

        Ok(CaseResult {
            index,
            data_call: case.data_call.clone(),
            outcome,
        })
    }
}

/// Fetch every input, `batch_size` requests at a time. Outcomes keep input order.
fn fetch_in_batches(
    transport: &dyn Transport,
    data_call: &str,
    inputs: &[TestInput],
    batch_size: usize,
) -> TestStatResult<Vec<TransportOutcome>> {
    let mut outcomes = Vec::with_capacity(inputs.len());
    for batch in inputs.chunks(batch_size.max(1)) {
        let fetched: Vec<thread::Result<TransportOutcome>> = thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|input| scope.spawn(move || transport.fetch(data_call, input)))
                .collect();
            handles.into_iter().map(|handle| handle.join()).collect()
        });

        for outcome in fetched {
            outcomes.push(outcome.map_err(|_| TestStatError::WorkerPanicked {
                data_call: data_call.to_string(),
            })?);
        }
    }
    Ok(outcomes)
}

fn counts_as_failure(outcome: &CaseOutcome) -> bool {
    !matches!(outcome, CaseOutcome::Passed | CaseOutcome::Skipped)
}

fn log_summary(summary: &RunSummary) {
    info!(
        run_id = %summary.run_id,
        host = %summary.host,
        passed = summary.passed_count(),
        failed = summary.failed_count(),
        errors = summary.error_count(),
        skipped = summary.skipped_count(),
        "run finished"
    );
}
