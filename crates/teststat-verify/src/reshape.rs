//! Regrouping of flat nested-block expectations into per-block trees.
//!
//! ```text
//! exact->inetnum = a          exact:         {inetnum: a, netname: b}
//! exact->netname = b    ==>   more_specific: notempty
//! more_specific  = notempty
//! ```
//!
//! A block marked `notempty` stays `notempty`: dotted entries for it are
//! dropped whether they come before or after the marker.

use std::collections::BTreeMap;

use teststat_contracts::{case::NOT_EMPTY, schema::PATH_DELIMITER};

/// Expectations for one field of a nested block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedNode {
    Value(String),
    Group(BTreeMap<String, ExpectedNode>),
}

impl ExpectedNode {
    pub fn is_not_empty_marker(&self) -> bool {
        matches!(self, ExpectedNode::Value(v) if v == NOT_EMPTY)
    }
}

/// Group `(path, expected)` pairs by their first segment.
pub fn reshape(entries: &[(String, String)]) -> BTreeMap<String, ExpectedNode> {
    let mut blocks: BTreeMap<String, ExpectedNode> = BTreeMap::new();

    for (path, value) in entries {
        let segments: Vec<&str> = path.split(PATH_DELIMITER).collect();
        let Some((block, rest)) = segments.split_first() else {
            continue;
        };

        let existing = blocks.get(*block);
        if existing.is_some_and(ExpectedNode::is_not_empty_marker) {
            continue;
        }

        if rest.is_empty() {
            blocks.insert(block.to_string(), ExpectedNode::Value(value.clone()));
            continue;
        }

        let node = blocks
            .entry(block.to_string())
            .or_insert_with(|| ExpectedNode::Group(BTreeMap::new()));
        insert_at(node, rest, value);
    }

    blocks
}

fn insert_at(node: &mut ExpectedNode, segments: &[&str], value: &str) {
    if !matches!(node, ExpectedNode::Group(_)) {
        *node = ExpectedNode::Group(BTreeMap::new());
    }
    let ExpectedNode::Group(children) = node else {
        return;
    };
    match segments {
        [] => {}
        [last] => {
            children.insert(last.to_string(), ExpectedNode::Value(value.to_string()));
        }
        [head, tail @ ..] => {
            let child = children
                .entry(head.to_string())
                .or_insert_with(|| ExpectedNode::Group(BTreeMap::new()));
            insert_at(child, tail, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(p, v)| (p.to_string(), v.to_string())).collect()
    }

    fn value(v: &str) -> ExpectedNode {
        ExpectedNode::Value(v.to_string())
    }

    fn group(children: &[(&str, ExpectedNode)]) -> ExpectedNode {
        ExpectedNode::Group(children.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn dotted_entries_group_by_block() {
        let blocks = reshape(&pairs(&[
            ("exact->inetnum", "a"),
            ("exact->netname", "b"),
            ("more_specific", "notempty"),
            ("stats->stripped->avg", "c"),
            ("stats->unstripped->avg", "e"),
        ]));

        assert_eq!(blocks["exact"], group(&[("inetnum", value("a")), ("netname", value("b"))]));
        assert_eq!(blocks["more_specific"], value("notempty"));
        assert_eq!(
            blocks["stats"],
            group(&[
                ("stripped", group(&[("avg", value("c"))])),
                ("unstripped", group(&[("avg", value("e"))])),
            ])
        );
    }

    #[test]
    fn not_empty_marker_wins_when_first() {
        let blocks = reshape(&pairs(&[("exact", "notempty"), ("exact->inetnum", "a")]));
        assert_eq!(blocks["exact"], value("notempty"));
    }

    #[test]
    fn not_empty_marker_wins_when_last() {
        let blocks = reshape(&pairs(&[("exact->inetnum", "a"), ("exact", "notempty")]));
        assert_eq!(blocks["exact"], value("notempty"));
    }

    #[test]
    fn empty_input_yields_no_blocks() {
        assert!(reshape(&[]).is_empty());
    }
}
