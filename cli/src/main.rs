//! TESTstat: command-line suite runner.
//!
//! Loads a TOML suite, sends every case to a RIPEstat host, checks each
//! response against its expectations, and prints one line per case.
//!
//! Usage:
//!   teststat --suite cli/suites/smoke.toml
//!   teststat --suite suite.toml --host localhost --port 8000 --scheme http
//!   teststat --suite suite.toml --compare-host stat-dev.example.net
//!   teststat --suite suite.toml --data-call dns-chain --output results.json
//!   teststat --compare-versions 1.0,2.0 --data-call as-overview \
//!            --resources asns.txt --fields holder,announced
//!
//! Exit code 0 when every case passes (or every resource answers the same
//! under each version), 1 when any case fails or errors, 2 on a
//! configuration or usage error.
//!
//! With `--sequential`, Ctrl-C stops the run before its next case; cases
//! not reached are reported as skipped.

mod suite;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use teststat_contracts::{
    case::TestCase,
    config::{RunnerConfig, DEFAULT_BATCH_SIZE, DEFAULT_HOST, DEFAULT_SCHEME, DEFAULT_TIMEOUT_SECS},
    error::{TestStatError, TestStatResult},
    execution::{CaseOutcome, RunSummary},
};
use teststat_core::{HostComparison, Runner, StopSignal, VersionComparison, VersionOutput};
use teststat_http::HttpTransport;
use teststat_registry::TomlSchemaRegistry;
use teststat_verify::ExpectationEvaluator;

use crate::suite::ResourceLimit;

// ── CLI definition ────────────────────────────────────────────────────────────

/// TESTstat: check RIPEstat data call responses against expectations.
#[derive(Parser)]
#[command(name = "teststat", about = "Validate RIPEstat data call responses against a test suite")]
struct Cli {
    /// Suite file (TOML, one `[[cases]]` table per test case).
    #[arg(long, required_unless_present = "compare_versions")]
    suite: Option<PathBuf>,

    /// Host to test.
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long)]
    port: Option<u16>,

    /// `http` or `https`.
    #[arg(long, default_value = DEFAULT_SCHEME)]
    scheme: String,

    /// Requests issued concurrently per batch.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Only run cases for this data call. Repeatable.
    #[arg(long = "data-call")]
    data_call: Vec<String>,

    /// Registry file replacing the embedded one.
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Write the results as JSON to this file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also run the suite against this host and report cases failing on
    /// only one of the two.
    #[arg(long)]
    compare_host: Option<String>,

    /// Run cases one at a time and stop once the host is unreachable.
    #[arg(long, conflicts_with = "compare_host")]
    sequential: bool,

    /// Instead of a suite, compare the `--data-call` output of these
    /// preferred versions (comma-separated) for every `--resources` entry.
    #[arg(
        long,
        value_delimiter = ',',
        requires = "resources",
        conflicts_with_all = ["suite", "compare_host", "sequential"]
    )]
    compare_versions: Vec<String>,

    /// Resource list for `--compare-versions`, one resource per line.
    #[arg(long)]
    resources: Option<PathBuf>,

    /// Only use the first N resources, or lines START-END.
    #[arg(long, requires = "resources")]
    limit: Option<ResourceLimit>,

    /// Output fields compared between versions (comma-separated).
    #[arg(long, value_delimiter = ',', requires = "compare_versions")]
    fields: Vec<String>,
}

impl Cli {
    fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            port: self.port,
            timeout_secs: self.timeout_secs,
            batch_size: self.batch_size,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // Set RUST_LOG=debug for per-field evaluation detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("teststat: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Run the selected mode. `Ok(true)` means every case passed (or, when
/// comparing, both hosts agree).
fn run(cli: &Cli) -> TestStatResult<bool> {
    let config = cli.runner_config();
    config.validate()?;

    let registry = match &cli.registry {
        Some(path) => TomlSchemaRegistry::from_file(path)?,
        None => TomlSchemaRegistry::embedded()?,
    };

    let runner = Runner::new(Box::new(registry), Box::new(ExpectationEvaluator::new()));
    if !cli.compare_versions.is_empty() {
        return run_version_comparison(cli, &config, &runner);
    }

    let suite_path = cli.suite.as_deref().ok_or_else(|| TestStatError::ConfigError {
        reason: "--suite is required unless --compare-versions is given".to_string(),
    })?;
    let cases = suite::filter_cases(suite::load_suite(suite_path)?, &cli.data_call);
    if cases.is_empty() {
        warn!(suite = %suite_path.display(), "no test cases selected");
        println!("No test cases selected.");
        return Ok(true);
    }

    runner.check_cases(&cases)?;
    let transport = HttpTransport::new(&config)?;

    if let Some(secondary_host) = &cli.compare_host {
        let secondary = HttpTransport::new(&config.with_host(secondary_host.as_str()))?;
        let comparison = runner.compare_hosts(&transport, &secondary, &cases, config.batch_size)?;
        print_comparison(&comparison, &cases);
        if let Some(path) = &cli.output {
            write_results(path, &comparison)?;
        }
        return Ok(comparison.consistent());
    }

    let summary = if cli.sequential {
        let stop = StopSignal::new();
        let handler_stop = stop.clone();
        if let Err(err) = ctrlc::set_handler(move || handler_stop.stop()) {
            warn!(error = %err, "failed to install Ctrl-C handler, the run cannot be interrupted");
        }
        runner.run_sequential(&transport, &cases, &stop)?
    } else {
        runner.run_batched(&transport, &cases, config.batch_size)?
    };
    print_summary(&summary, &cases);
    if let Some(path) = &cli.output {
        write_results(path, &summary)?;
    }
    Ok(summary.all_passed())
}

/// Compare one data call's output across preferred versions.
/// `Ok(true)` means every resource answered the same under each version.
fn run_version_comparison(cli: &Cli, config: &RunnerConfig, runner: &Runner) -> TestStatResult<bool> {
    let [data_call] = cli.data_call.as_slice() else {
        return Err(TestStatError::ConfigError {
            reason: "--compare-versions needs exactly one --data-call".to_string(),
        });
    };
    let resources_path = cli.resources.as_deref().ok_or_else(|| TestStatError::ConfigError {
        reason: "--compare-versions needs --resources".to_string(),
    })?;

    let resources = suite::load_resources(resources_path, cli.limit)?;
    if resources.is_empty() {
        warn!(path = %resources_path.display(), "no resources selected");
        println!("No resources selected.");
        return Ok(true);
    }

    let transport = HttpTransport::new(config)?;
    let comparison = runner.compare_versions(
        &transport,
        data_call,
        &resources,
        &cli.compare_versions,
        &cli.fields,
        config.batch_size,
    )?;
    print_version_comparison(&comparison);
    if let Some(path) = &cli.output {
        write_results(path, &comparison)?;
    }
    Ok(comparison.consistent())
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_summary(summary: &RunSummary, cases: &[TestCase]) {
    println!("Run {} against {}", summary.run_id, summary.host);
    println!();

    for result in &summary.results {
        let input = cases
            .get(result.index)
            .map(|case| case.test_input.to_string())
            .unwrap_or_default();
        println!(
            "  [{:<16}] #{:<3} {} {}",
            result.outcome.label(),
            result.index,
            result.data_call,
            input
        );
        match &result.outcome {
            CaseOutcome::Failed(report) => {
                for line in report.to_string().lines() {
                    println!("        {}", line);
                }
            }
            CaseOutcome::ConnectionError(reason) | CaseOutcome::InvalidResponse(reason) => {
                println!("        {}", reason);
            }
            _ => {}
        }
    }

    println!();
    println!(
        "{} passed, {} failed, {} errors, {} skipped",
        summary.passed_count(),
        summary.failed_count(),
        summary.error_count(),
        summary.skipped_count()
    );
}

fn print_comparison(comparison: &HostComparison, cases: &[TestCase]) {
    print_summary(&comparison.primary, cases);
    println!();
    print_summary(&comparison.secondary, cases);
    println!();

    if comparison.consistent() {
        println!(
            "{} and {} agree on every case.",
            comparison.primary.host, comparison.secondary.host
        );
        return;
    }
    for (host, indexes) in [
        (&comparison.primary.host, &comparison.failed_only_on_primary),
        (&comparison.secondary.host, &comparison.failed_only_on_secondary),
    ] {
        for index in indexes {
            if let Some(case) = cases.get(*index) {
                println!("  only fails on {}: #{} {} {}", host, index, case.data_call, case.test_input);
            }
        }
    }
}

fn print_version_comparison(comparison: &VersionComparison) {
    println!(
        "Run {} against {}: {} in versions {}",
        comparison.run_id,
        comparison.host,
        comparison.data_call,
        comparison.versions.join(", ")
    );
    println!();

    for resource in comparison.resources.iter().filter(|r| !r.consistent()) {
        println!("  [MISMATCH] {}", resource.resource);
        if !resource.mismatched_fields.is_empty() {
            println!("        differs on: {}", resource.mismatched_fields.join(", "));
        }
        for result in &resource.results {
            if let VersionOutput::Failed { error } = &result.output {
                println!("        {}: {}", result.version, error.label());
            }
        }
    }

    let mismatched = comparison.mismatched_resources().len();
    if mismatched == 0 {
        println!(
            "All {} resources answer the same for [{}] in versions {}.",
            comparison.resources.len(),
            comparison.fields.join(", "),
            comparison.versions.join(", ")
        );
    } else {
        println!();
        println!("{} of {} resources differ between versions.", mismatched, comparison.resources.len());
    }
}

fn write_results<T: Serialize>(path: &Path, results: &T) -> TestStatResult<()> {
    let json = serde_json::to_string_pretty(results).map_err(|e| TestStatError::ConfigError {
        reason: format!("failed to serialize results: {}", e),
    })?;
    std::fs::write(path, json).map_err(|e| TestStatError::ConfigError {
        reason: format!("failed to write results file '{}': {}", path.display(), e),
    })?;
    info!(path = %path.display(), "results written");
    Ok(())
}
