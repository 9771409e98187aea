//! Output schema trees declared per data call.
//!
//! A data call's output schema maps field names either to a validated
//! `RuleList` (a leaf) or to a nested mapping. Whether a mapping describes a
//! plain sub-object or one record of a repeated block is decided by the
//! registry's nested-field set, not by the node itself.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::{
    case::NOT_EMPTY,
    error::{TestStatError, TestStatResult},
    rule::RuleList,
};

/// Delimiter joining field names in expected-output paths.
pub const PATH_DELIMITER: &str = "->";

/// One node of an output schema tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SchemaNode {
    /// A leaf field compared with a rule list.
    Rules(RuleList),
    /// A structured sub-object (or one record of a nested block).
    Mapping(BTreeMap<String, SchemaNode>),
}

/// Everything the registry knows about one data call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataCallSpec {
    /// Slug identifier, e.g. `"abuse-contact-finder"`.
    pub id: String,
    /// Display name, e.g. `"Abuse Contact Finder"`.
    pub name: String,
    pub required_params: Vec<String>,
    pub optional_params: Vec<String>,
    /// Root mapping of the output schema.
    pub output: BTreeMap<String, SchemaNode>,
}

impl DataCallSpec {
    /// Walk `segments` from the output root.
    pub fn node_at<S: AsRef<str>>(&self, segments: &[S]) -> Option<&SchemaNode> {
        let (first, rest) = segments.split_first()?;
        let mut current = self.output.get(first.as_ref())?;
        for segment in rest {
            match current {
                SchemaNode::Mapping(children) => current = children.get(segment.as_ref())?,
                SchemaNode::Rules(_) => return None,
            }
        }
        Some(current)
    }

    /// The rule list declared at an arrow-joined `path`.
    ///
    /// Returns `TestStatError::SchemaPath` when the path is absent or names
    /// a mapping rather than a leaf.
    pub fn rules_at(&self, path: &str) -> TestStatResult<&RuleList> {
        let segments: Vec<&str> = path.split(PATH_DELIMITER).collect();
        match self.node_at(&segments) {
            Some(SchemaNode::Rules(rules)) => Ok(rules),
            Some(SchemaNode::Mapping(_)) => Err(self.path_error(path, "path names a mapping, not a rule list")),
            None => Err(self.path_error(path, "path is not declared in the output schema")),
        }
    }

    /// Check that an expected-output entry can be evaluated.
    ///
    /// Paths into a nested block may name the block itself, any leaf, or a
    /// sub-mapping expected to be `notempty`. Every other path must name a
    /// rule list. Returns `TestStatError::SchemaPath` otherwise.
    pub fn check_expected_path(
        &self,
        path: &str,
        expected: &str,
        nested_fields: &HashSet<String>,
    ) -> TestStatResult<()> {
        let segments: Vec<&str> = path.split(PATH_DELIMITER).collect();
        if !nested_fields.contains(segments[0]) {
            return self.rules_at(path).map(|_| ());
        }
        match self.node_at(&segments) {
            None => Err(self.path_error(path, "path is not declared in the output schema")),
            Some(SchemaNode::Mapping(_)) if segments.len() > 1 && expected != NOT_EMPTY => {
                Err(self.path_error(path, "path names a mapping, not a rule list"))
            }
            Some(_) => Ok(()),
        }
    }

    fn path_error(&self, path: &str, reason: &str) -> TestStatError {
        TestStatError::SchemaPath {
            data_call: self.id.clone(),
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}
