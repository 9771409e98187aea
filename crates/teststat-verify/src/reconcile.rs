//! Existential matching of expectations against nested blocks.
//!
//! A nested block is a response field holding a list of similar records.
//! The user's expectations for the block pass when at least one record
//! satisfies every expected leaf at once; leaves are never satisfied by
//! different records.
//!
//! Records missing any top-level key of the expectation group are skipped
//! without evaluating rules. Sub-groups are checked against the same record,
//! using the schema declared at the corresponding nested path; a sub-list
//! inside the record is searched the same way, one element at a time.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use teststat_contracts::{
    case::NOT_EMPTY,
    error::{TestStatError, TestStatResult},
    report::Discrepancy,
    schema::{DataCallSpec, SchemaNode, PATH_DELIMITER},
};

use crate::{
    path::resolve_all,
    reshape::ExpectedNode,
    rules::{self, is_truthy},
};

/// Check one reshaped block against the normalized payload.
///
/// Returns `Ok(None)` when the block passes, or the discrepancy to record
/// under the block name. Errors only when the schema does not declare a
/// leaf the expectations reference.
pub fn reconcile(
    spec: &DataCallSpec,
    block: &str,
    expected: &ExpectedNode,
    data: &Value,
) -> TestStatResult<Option<Discrepancy>> {
    let fields = match expected {
        ExpectedNode::Group(fields) => fields,
        marker if marker.is_not_empty_marker() => {
            let present = data.get(block).is_some_and(is_truthy);
            return Ok((!present).then_some(Discrepancy::EmptyBlock));
        }
        ExpectedNode::Value(other) => {
            debug!(
                data_call = %spec.id,
                block = %block,
                expected = %other,
                "nested block compared against a bare value"
            );
            return Ok(Some(Discrepancy::NoMatchingItem));
        }
    };

    for (position, record) in resolve_all(block, data).into_iter().enumerate() {
        let Value::Object(record_fields) = record else {
            continue;
        };
        if !fields.keys().all(|key| record_fields.contains_key(key)) {
            continue;
        }
        if group_matches(spec, block, &[], fields, record)? {
            debug!(data_call = %spec.id, block = %block, record = position, "nested block matched");
            return Ok(None);
        }
    }

    Ok(Some(Discrepancy::NoMatchingItem))
}

/// True when `record` satisfies every leaf of `group`.
///
/// `relative` is the path of `group` inside the block; the schema path of a
/// leaf is `block->relative->leaf`. A sub-group holds when one element of
/// the record's matching sub-list satisfies all of its leaves.
fn group_matches(
    spec: &DataCallSpec,
    block: &str,
    relative: &[&str],
    group: &BTreeMap<String, ExpectedNode>,
    record: &Value,
) -> TestStatResult<bool> {
    for (key, node) in group {
        let mut leaf_path = relative.to_vec();
        leaf_path.push(key.as_str());

        let holds = match node {
            ExpectedNode::Group(children) => {
                let mut any = false;
                for candidate in resolve_all(key, record) {
                    if group_matches(spec, block, &leaf_path, children, candidate)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            ExpectedNode::Value(expected) => leaf_matches(spec, block, &leaf_path, expected, record)?,
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Check the leaf named by the last segment of `relative` directly inside
/// `record`.
fn leaf_matches(
    spec: &DataCallSpec,
    block: &str,
    relative: &[&str],
    expected: &str,
    record: &Value,
) -> TestStatResult<bool> {
    let relative_path = relative.join(PATH_DELIMITER);
    let actual = match (record, relative.last()) {
        (Value::Object(fields), Some(key)) => fields.get(*key),
        _ => None,
    };
    let Some(actual) = actual else {
        debug!(data_call = %spec.id, block = %block, path = %relative_path, "record lacks expected leaf");
        return Ok(false);
    };

    let schema_path = format!("{}{}{}", block, PATH_DELIMITER, relative_path);
    let segments: Vec<&str> = schema_path.split(PATH_DELIMITER).collect();
    match spec.node_at(&segments) {
        Some(SchemaNode::Rules(list)) => Ok(rules::evaluate(list, expected, actual)),
        Some(SchemaNode::Mapping(_)) if expected == NOT_EMPTY => Ok(is_truthy(actual)),
        Some(SchemaNode::Mapping(_)) => Err(TestStatError::SchemaPath {
            data_call: spec.id.clone(),
            path: schema_path,
            reason: "path names a mapping, not a rule list".to_string(),
        }),
        None => Err(TestStatError::SchemaPath {
            data_call: spec.id.clone(),
            path: schema_path,
            reason: "path is not declared in the output schema".to_string(),
        }),
    }
}
