//! Arrow-delimited path lookups against normalized payloads.
//!
//! Two lookups exist because flat and nested expectations need different
//! semantics:
//!
//! - `resolve_first` follows one path and, whenever a non-first segment
//!   meets a sequence, descends into its first element.
//! - `resolve_all` fans out across every sequence it meets and returns every
//!   value reachable under the path. The reconciler uses it to enumerate the
//!   candidate records of a nested block.

use serde_json::Value;
use thiserror::Error;

use teststat_contracts::schema::PATH_DELIMITER;

/// Why `resolve_first` could not reach the end of a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("key '{segment}' not found while resolving '{path}'")]
    MissingKey { path: String, segment: String },

    #[error("value before '{segment}' in '{path}' is not a mapping")]
    NotAMapping { path: String, segment: String },

    #[error("sequence before '{segment}' in '{path}' is empty")]
    EmptySequence { path: String, segment: String },
}

/// Follow `path` from `root`, taking the first element of any sequence met
/// at a non-first segment.
pub fn resolve_first<'v>(path: &str, root: &'v Value) -> Result<&'v Value, PathError> {
    let mut current = root;
    for (index, segment) in path.split(PATH_DELIMITER).enumerate() {
        if index > 0 {
            if let Value::Array(items) = current {
                current = items.first().ok_or_else(|| PathError::EmptySequence {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })?;
            }
        }
        current = match current {
            Value::Object(fields) => fields.get(segment).ok_or_else(|| PathError::MissingKey {
                path: path.to_string(),
                segment: segment.to_string(),
            })?,
            _ => {
                return Err(PathError::NotAMapping {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })
            }
        };
    }
    Ok(current)
}

/// Every value reachable under `path`, fanning out across sequences met
/// along the way and at the end.
///
/// Branches missing a key contribute nothing. An empty result means no
/// candidate exists.
pub fn resolve_all<'v>(path: &str, root: &'v Value) -> Vec<&'v Value> {
    let mut frontier = vec![root];
    for segment in path.split(PATH_DELIMITER) {
        let mut next = Vec::new();
        for value in frontier {
            collect_children(value, segment, &mut next);
        }
        frontier = next;
    }
    frontier.into_iter().flat_map(flatten_sequence).collect()
}

fn collect_children<'v>(value: &'v Value, segment: &str, out: &mut Vec<&'v Value>) {
    match value {
        Value::Object(fields) => {
            if let Some(child) = fields.get(segment) {
                out.push(child);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_children(item, segment, out);
            }
        }
        _ => {}
    }
}

fn flatten_sequence(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(flatten_sequence).collect(),
        other => vec![other],
    }
}
