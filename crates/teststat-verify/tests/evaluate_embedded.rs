//! End-to-end evaluation against the embedded data call registry.

use serde_json::{json, Value};

use teststat_contracts::{
    case::ExpectedOutput,
    report::{Discrepancy, DiscrepancyReport},
    response::ActualResponse,
    rule::{RuleList, RuleToken},
};
use teststat_core::traits::{Evaluator, SchemaRegistry};
use teststat_registry::TomlSchemaRegistry;
use teststat_verify::{normalize::normalize, rules, ExpectationEvaluator};

fn evaluate(data_call: &str, actual: &ActualResponse, expected: &str) -> DiscrepancyReport {
    let registry = TomlSchemaRegistry::embedded().unwrap();
    let spec = registry.data_call(data_call).unwrap();
    let expected = ExpectedOutput::parse(expected).unwrap();
    ExpectationEvaluator::new()
        .evaluate(spec, registry.nested_fields(), actual, &expected)
        .unwrap()
}

fn ok(data: Value) -> ActualResponse {
    ActualResponse::new(200, data)
}

// ── Normalization ────────────────────────────────────────────────────────────

#[test]
fn normalization_is_idempotent() {
    let samples = [
        json!("RIPE NCC"),
        json!(null),
        json!([true, 1.5, "A B", {"Key One": [null, "X"]}]),
        json!({"Stats": {"Avg": 15, "Location": "Amsterdam NL"}}),
    ];
    for sample in samples {
        let once = normalize(&sample);
        assert_eq!(normalize(&once), once, "not idempotent for {}", sample);
    }
}

// ── Status handling ──────────────────────────────────────────────────────────

#[test]
fn abuse_contact_finder_passes_after_normalization() {
    let report = evaluate(
        "abuse-contact-finder",
        &ok(json!({
            "abuse_contacts": ["Abuse@Example.com"],
            "authoritative_rir": "RIPE",
        })),
        "status_code = 200; abuse_contacts = abuse@example.com; authoritative_rir = ripe",
    );
    assert!(report.passed(), "unexpected failures: {}", report);
}

#[test]
fn status_mismatch_reports_status_and_first_message_line_only() {
    let actual = ActualResponse::new(400, json!({}))
        .with_message("error", "The given resource is not valid\nSee the documentation");
    let report = evaluate(
        "abuse-contact-finder",
        &actual,
        "status_code = 200; abuse_contacts = abuse@example.com; authoritative_rir = ripe",
    );

    let keys: Vec<&str> = report.keys().collect();
    assert_eq!(keys, vec!["error", "status_code"]);
    assert_eq!(report.get("status_code"), Some(&Discrepancy::Actual(json!("400"))));
    assert_eq!(
        report.get("error"),
        Some(&Discrepancy::ServerMessage("The given resource is not valid".to_string()))
    );
}

// ── Rule lists ───────────────────────────────────────────────────────────────

#[test]
fn all_requires_every_comparison_while_any_needs_one() {
    use RuleToken::*;

    let all = RuleList::from_tokens(&[All, Match, Compare]).unwrap();
    let any = RuleList::from_tokens(&[Any, Match, Compare]).unwrap();

    // MATCH holds, COMPARE does not: "5" carries no operator.
    assert!(!rules::evaluate(&all, "5", &json!("5")));
    assert!(rules::evaluate(&any, "5", &json!("5")));
}

#[test]
fn trim_as_accepts_prefixed_expectation() {
    let report = evaluate(
        "as-overview",
        &ok(json!({"resource": "3333", "holder": "RIPE-NCC-AS - Reseaux IP Europeens"})),
        "status_code = 200; resource = AS3333",
    );
    assert!(report.passed(), "unexpected failures: {}", report);
}

#[test]
fn compare_through_nested_path_reports_normalized_actual() {
    let response = |avg: i64| {
        ok(json!({
            "stats": [{
                "count": 3,
                "location": "Amsterdam",
                "stripped": {"avg": avg, "max": 9, "min": 1, "sum": 42},
            }],
        }))
    };
    let expected = "status_code = 200; stats->stripped->avg = >=10";

    let pass = evaluate("as-path-length", &response(15), expected);
    assert!(pass.passed(), "unexpected failures: {}", pass);

    let fail = evaluate("as-path-length", &response(5), expected);
    assert_eq!(fail.len(), 1);
    assert_eq!(fail.get("stats->stripped->avg"), Some(&Discrepancy::Actual(json!("5"))));
}

// ── Nested blocks ────────────────────────────────────────────────────────────

#[test]
fn exact_block_needs_one_record_matching_every_leaf() {
    let data = json!({"exact": [
        {"inetnum": "a", "netname": "x"},
        {"inetnum": "b", "netname": "y"},
    ]});

    let pass = evaluate(
        "address-space-hierarchy",
        &ok(data.clone()),
        "status_code = 200; exact->inetnum = b; exact->netname = y",
    );
    assert!(pass.passed(), "unexpected failures: {}", pass);

    let fail = evaluate(
        "address-space-hierarchy",
        &ok(data),
        "status_code = 200; exact->inetnum = b; exact->netname = z",
    );
    assert_eq!(fail.get("exact"), Some(&Discrepancy::NoMatchingItem));
    assert_eq!(
        fail.get("exact").map(Discrepancy::to_value),
        Some(json!("No item matching all the expected inputs found!"))
    );
}

#[test]
fn not_empty_block_checks_presence_only() {
    let expected = "status_code = 200; more_specific = not empty";

    let empty = evaluate("address-space-hierarchy", &ok(json!({"more_specific": []})), expected);
    assert_eq!(empty.get("more_specific").map(Discrepancy::to_value), Some(json!([])));

    let filled = evaluate(
        "address-space-hierarchy",
        &ok(json!({"more_specific": [{"netname": "anything"}]})),
        expected,
    );
    assert!(filled.passed(), "unexpected failures: {}", filled);
}

#[test]
fn not_empty_wins_over_leaf_expectations_on_same_block() {
    let report = evaluate(
        "address-space-hierarchy",
        &ok(json!({"exact": [{"inetnum": "a", "netname": "x"}]})),
        "status_code = 200; exact->netname = nomatch; exact = notempty",
    );
    assert!(report.passed(), "unexpected failures: {}", report);
}

#[test]
fn nested_timelines_are_matched_inside_one_record() {
    let data = json!({"prefixes": [
        {"prefix": "193.0.0.0/21", "timelines": [{"starttime": "2020", "endtime": "2021"}]},
        {"prefix": "193.0.10.0/23", "timelines": [{"starttime": "2022", "endtime": "2023"}]},
    ]});

    let pass = evaluate(
        "announced-prefixes",
        &ok(data.clone()),
        "status_code = 200; prefixes->prefix = 193.0.10.0/23; prefixes->timelines->starttime = 2022",
    );
    assert!(pass.passed(), "unexpected failures: {}", pass);

    let cross_record = evaluate(
        "announced-prefixes",
        &ok(data),
        "status_code = 200; prefixes->prefix = 193.0.10.0/23; prefixes->timelines->starttime = 2020",
    );
    assert_eq!(cross_record.get("prefixes"), Some(&Discrepancy::NoMatchingItem));
}

// ── Payload wrapping ─────────────────────────────────────────────────────────

#[test]
fn results_wrapper_is_equivalent_to_flat_payload() {
    let expected = "status_code = 200; authoritative_rir = ripe; earliest_time = 2020";

    let wrapped = evaluate(
        "abuse-contact-finder",
        &ok(json!({"results": {"authoritative_rir": "RIPE", "earliest_time": "2021"}})),
        expected,
    );
    let flat = evaluate(
        "abuse-contact-finder",
        &ok(json!({"authoritative_rir": "RIPE", "earliest_time": "2021"})),
        expected,
    );
    assert_eq!(wrapped, flat);
    assert_eq!(flat.get("earliest_time"), Some(&Discrepancy::Actual(json!("2021"))));
}

#[test]
fn missing_top_level_key_is_reported_per_path() {
    let report = evaluate(
        "dns-chain",
        &ok(json!({"resource": "ripe.net"})),
        "status_code = 200; resource = ripe.net; nameservers = ns.ripe.net",
    );
    assert_eq!(report.len(), 1);
    assert_eq!(
        report.get("nameservers").map(Discrepancy::to_value),
        Some(json!("The output does not include this key!"))
    );
}
