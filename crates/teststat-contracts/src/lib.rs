//! # teststat-contracts
//!
//! Shared types, schemas, and contracts for the TESTstat response checker.
//!
//! All crates in the workspace import from here. No evaluation logic lives in
//! this crate, only data definitions, the test-case grammar, and error types.

pub mod case;
pub mod config;
pub mod error;
pub mod execution;
pub mod report;
pub mod response;
pub mod rule;
pub mod schema;

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use serde_json::json;

    use super::*;
    use case::{ExpectedOutput, TestCase, TestInput};
    use config::RunnerConfig;
    use error::TestStatError;
    use execution::{CaseOutcome, CaseResult, RunId, RunSummary, TransportOutcome};
    use report::{Discrepancy, DiscrepancyReport};
    use response::{ActualResponse, Message};
    use rule::{Aggregator, Rule, RuleList, RuleListError, RuleToken};
    use schema::{DataCallSpec, SchemaNode};

    fn tokens(raw: &[&str]) -> Vec<RuleToken> {
        raw.iter()
            .map(|t| serde_json::from_value(json!(t)).unwrap())
            .collect()
    }

    // ── RuleList ─────────────────────────────────────────────────────────────

    #[test]
    fn rule_list_splits_prefilters_and_comparisons() {
        let list = RuleList::from_tokens(&tokens(&["trim_as", "any", "not_empty", "match"])).unwrap();

        assert_eq!(list.prefilters(), &[Rule::TrimAs]);
        assert_eq!(list.aggregator(), Aggregator::Any);
        assert_eq!(list.comparisons(), &[Rule::NotEmpty, Rule::Match]);
    }

    #[test]
    fn rule_list_without_aggregator_is_rejected() {
        let err = RuleList::from_tokens(&tokens(&["not_empty", "match"])).unwrap_err();
        assert!(
            matches!(err, RuleListError::MissingAggregator { .. }),
            "expected MissingAggregator, got {:?}",
            err
        );
    }

    #[test]
    fn rule_list_with_two_aggregators_is_rejected() {
        let err = RuleList::from_tokens(&tokens(&["all", "match", "any"])).unwrap_err();
        assert!(matches!(err, RuleListError::MultipleAggregators { .. }));
    }

    #[test]
    fn rule_list_error_converts_to_config_error() {
        let err: TestStatError = RuleList::from_tokens(&[]).unwrap_err().into();
        assert!(err.to_string().contains("configuration error"));
        assert!(err.to_string().contains("no aggregator"));
    }

    #[test]
    fn unknown_rule_token_is_rejected() {
        let parsed: Result<RuleToken, _> = serde_json::from_value(json!("regex"));
        assert!(parsed.is_err());

        let err = "regex".parse::<RuleToken>().unwrap_err();
        assert_eq!(err, RuleListError::UnknownToken { token: "regex".to_string() });
        assert_eq!("include_keys".parse::<RuleToken>().unwrap(), RuleToken::IncludeKeys);
    }

    // ── Aggregator ───────────────────────────────────────────────────────────

    #[test]
    fn aggregator_all_and_any() {
        assert!(Aggregator::All.combine([true, true]));
        assert!(!Aggregator::All.combine([true, false]));
        assert!(Aggregator::Any.combine([false, true]));
        assert!(!Aggregator::Any.combine([false, false]));
        // Empty comparisons: vacuous truth for ALL, nothing satisfied for ANY.
        assert!(Aggregator::All.combine(std::iter::empty()));
        assert!(!Aggregator::Any.combine(std::iter::empty()));
    }

    #[test]
    fn aggregator_any_short_circuits() {
        let mut evaluated = 0;
        let verdict = Aggregator::Any.combine([true, false, false].into_iter().inspect(|_| evaluated += 1));
        assert!(verdict);
        assert_eq!(evaluated, 1, "ANY must stop at the first true verdict");
    }

    // ── DataCallSpec ─────────────────────────────────────────────────────────

    fn sample_spec() -> DataCallSpec {
        let leaf = SchemaNode::Rules(RuleList::from_tokens(&tokens(&["any", "match"])).unwrap());
        let mut stripped = BTreeMap::new();
        stripped.insert("avg".to_string(), leaf.clone());
        let mut stats = BTreeMap::new();
        stats.insert("stripped".to_string(), SchemaNode::Mapping(stripped));
        let mut output = BTreeMap::new();
        output.insert("stats".to_string(), SchemaNode::Mapping(stats));
        output.insert("resource".to_string(), leaf);

        DataCallSpec {
            id: "as-path-length".to_string(),
            name: "AS Path Length".to_string(),
            required_params: vec!["resource".to_string()],
            optional_params: vec![],
            output,
        }
    }

    #[test]
    fn rules_at_finds_nested_leaf() {
        let spec = sample_spec();
        let rules = spec.rules_at("stats->stripped->avg").unwrap();
        assert_eq!(rules.comparisons(), &[Rule::Match]);
    }

    #[test]
    fn rules_at_rejects_mapping_and_unknown_paths() {
        let spec = sample_spec();

        let err = spec.rules_at("stats->stripped").unwrap_err();
        assert!(err.to_string().contains("names a mapping"), "got: {}", err);

        let err = spec.rules_at("stats->unknown").unwrap_err();
        assert!(
            matches!(err, TestStatError::SchemaPath { ref path, .. } if path == "stats->unknown"),
            "expected SchemaPath, got {:?}",
            err
        );
    }

    #[test]
    fn check_expected_path_follows_block_membership() {
        let spec = sample_spec();
        let flat = HashSet::new();
        let nested: HashSet<String> = ["stats".to_string()].into_iter().collect();

        assert!(spec.check_expected_path("stats->stripped->avg", ">=10", &flat).is_ok());
        assert!(spec.check_expected_path("stats", "notempty", &flat).is_err());
        assert!(spec.check_expected_path("resource->x", "3333", &flat).is_err());

        assert!(spec.check_expected_path("stats", "notempty", &nested).is_ok());
        assert!(spec.check_expected_path("stats->stripped", "notempty", &nested).is_ok());
        assert!(spec.check_expected_path("stats->stripped", "5", &nested).is_err());
        let err = spec.check_expected_path("stats->unknown", "5", &nested).unwrap_err();
        assert!(
            matches!(err, TestStatError::SchemaPath { ref path, .. } if path == "stats->unknown"),
            "got {:?}",
            err
        );
    }

    // ── ExpectedOutput / TestInput grammar ───────────────────────────────────

    #[test]
    fn expected_output_parse_canonicalizes_values() {
        let parsed = ExpectedOutput::parse(
            "status_code = 200; exact->netname = RIPE NCC; more_specific = not empty",
        )
        .unwrap();

        assert_eq!(parsed.status_code, "200");
        assert_eq!(
            parsed.fields,
            vec![
                ("exact->netname".to_string(), "ripencc".to_string()),
                ("more_specific".to_string(), "notempty".to_string()),
            ]
        );
    }

    #[test]
    fn expected_output_parse_reads_ampersand_as_list_separator() {
        let parsed = ExpectedOutput::parse("status_code=200\nsources=whois&rir").unwrap();
        assert_eq!(parsed.fields, vec![("sources".to_string(), "whois,rir".to_string())]);
    }

    #[test]
    fn expected_output_parse_keeps_value_after_first_equals() {
        let parsed = ExpectedOutput::parse("status_code=200; stats->avg = >=10").unwrap();
        assert_eq!(parsed.fields[0].1, ">=10");
    }

    #[test]
    fn expected_output_requires_status_code() {
        let err = ExpectedOutput::parse("resource = 3333").unwrap_err();
        assert!(
            matches!(err, TestStatError::InvalidTestCase { .. }),
            "expected InvalidTestCase, got {:?}",
            err
        );
    }

    #[test]
    fn expected_output_rejects_pair_without_equals() {
        assert!(ExpectedOutput::parse("status_code = 200; resource").is_err());
    }

    #[test]
    fn expected_output_display_renders_grammar() {
        let expected = ExpectedOutput::new("200").with_field("resource", "3333");
        assert_eq!(expected.to_string(), "status_code = 200; resource = 3333");
    }

    #[test]
    fn test_input_parse_and_display() {
        let input = TestInput::parse("resource=193.0.0.0/21 & lod=1").unwrap();
        assert_eq!(
            input.params,
            vec![
                ("resource".to_string(), "193.0.0.0/21".to_string()),
                ("lod".to_string(), "1".to_string()),
            ]
        );
        assert_eq!(input.to_string(), "resource=193.0.0.0/21&lod=1");
    }

    #[test]
    fn test_case_parse_rejects_empty_data_call() {
        assert!(TestCase::parse("  ", "resource=1", "status_code=200").is_err());
    }

    // ── Discrepancy / DiscrepancyReport ──────────────────────────────────────

    #[test]
    fn discrepancy_serializes_to_literal_forms() {
        let mut report = DiscrepancyReport::new();
        report.record("status_code", Discrepancy::Actual(json!("400")));
        report.record("error", Discrepancy::ServerMessage("bad resource".to_string()));
        report.record("exact", Discrepancy::NoMatchingItem);
        report.record("more_specific", Discrepancy::EmptyBlock);
        report.record("asn", Discrepancy::MissingKey);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!({
                "status_code": "400",
                "error": "bad resource",
                "exact": "No item matching all the expected inputs found!",
                "more_specific": [],
                "asn": "The output does not include this key!",
            })
        );
        assert!(!report.passed());
    }

    #[test]
    fn empty_report_is_passed() {
        let report = DiscrepancyReport::new();
        assert!(report.passed());
        assert_eq!(serde_json::to_value(&report).unwrap(), json!({}));
    }

    #[test]
    fn report_display_lists_one_line_per_entry() {
        let mut report = DiscrepancyReport::new();
        report.record("b", Discrepancy::Actual(json!("5")));
        report.record("a", Discrepancy::MissingKey);
        assert_eq!(
            report.to_string(),
            "a = The output does not include this key!\nb = 5"
        );
    }

    // ── ActualResponse ───────────────────────────────────────────────────────

    #[test]
    fn actual_response_decodes_message_pairs() {
        let response: ActualResponse = serde_json::from_value(json!({
            "status_code": 400,
            "data": {},
            "messages": [["error", "Invalid resource\nsee docs"]],
        }))
        .unwrap();

        assert_eq!(response.messages[0], Message::new("error", "Invalid resource\nsee docs"));
        assert_eq!(response.messages[0].first_line(), "Invalid resource");
    }

    #[test]
    fn actual_response_defaults_missing_data_and_messages() {
        let response: ActualResponse = serde_json::from_value(json!({"status_code": 200})).unwrap();
        assert!(response.data.is_null());
        assert!(response.messages.is_empty());
    }

    // ── Outcomes and summaries ───────────────────────────────────────────────

    #[test]
    fn transport_sentinels_map_to_case_outcomes() {
        let response = ActualResponse::new(200, json!({}));
        assert_eq!(
            TransportOutcome::Response(response.clone()).into_response(),
            Ok(response)
        );
        assert_eq!(
            TransportOutcome::Timeout.into_response(),
            Err(CaseOutcome::Timeout)
        );
        assert!(CaseOutcome::BadGateway.is_error());
        assert!(!CaseOutcome::Skipped.is_error());
    }

    #[test]
    fn run_summary_counts_outcomes() {
        let mut failed = DiscrepancyReport::new();
        failed.record("asn", Discrepancy::MissingKey);
        let outcomes = [
            CaseOutcome::Passed,
            CaseOutcome::from_report(failed),
            CaseOutcome::Timeout,
            CaseOutcome::Skipped,
            CaseOutcome::from_report(DiscrepancyReport::new()),
        ];
        let now = chrono::Utc::now();
        let summary = RunSummary {
            run_id: RunId::new(),
            host: "stat.ripe.net".to_string(),
            started_at: now,
            finished_at: now,
            results: outcomes
                .into_iter()
                .enumerate()
                .map(|(index, outcome)| CaseResult {
                    index,
                    data_call: "as-overview".to_string(),
                    outcome,
                })
                .collect(),
        };

        assert_eq!(summary.passed_count(), 2);
        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.error_count(), 1);
        assert_eq!(summary.skipped_count(), 1);
        assert!(!summary.all_passed());
    }

    #[test]
    fn case_outcome_serializes_tagged() {
        let value = serde_json::to_value(CaseOutcome::ConnectionError("refused".to_string())).unwrap();
        assert_eq!(value, json!({"outcome": "connection_error", "detail": "refused"}));
    }

    #[test]
    fn run_id_new_produces_unique_values() {
        let ids: HashSet<String> =
            (0..100).map(|_| RunId::new().to_string()).collect();
        assert_eq!(ids.len(), 100);
    }

    // ── RunnerConfig ─────────────────────────────────────────────────────────

    #[test]
    fn runner_config_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.base_url(), "https://stat.ripe.net");
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn runner_config_validation() {
        let config = RunnerConfig {
            port: Some(8080),
            scheme: "http".to_string(),
            ..RunnerConfig::default()
        };
        assert_eq!(config.base_url(), "http://stat.ripe.net:8080");

        let zero_batch = RunnerConfig {
            batch_size: 0,
            ..RunnerConfig::default()
        };
        assert!(zero_batch.validate().is_err());

        let ftp = RunnerConfig {
            scheme: "ftp".to_string(),
            ..RunnerConfig::default()
        };
        assert!(ftp.validate().is_err());
    }
}
