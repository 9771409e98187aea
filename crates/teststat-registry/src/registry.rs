//! TOML-driven schema registry.
//!
//! `TomlSchemaRegistry` loads the output schema of every data call from a
//! TOML document and implements the `SchemaRegistry` trait from
//! teststat-core.
//!
//! Loading runs in two passes:
//!
//! 1. Deserialize the document into raw nodes. A raw node is a token list,
//!    a template name, or a table of raw nodes.
//! 2. Resolve every node into a `SchemaNode`: token lists become validated
//!    `RuleList`s and template names are replaced by the template's table.
//!    Unknown templates, template cycles, unknown tokens, and token lists
//!    without exactly one aggregator are configuration errors.
//!
//! The resolved registry is immutable.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use teststat_contracts::{
    error::{TestStatError, TestStatResult},
    rule::{RuleList, RuleToken},
    schema::{DataCallSpec, SchemaNode, PATH_DELIMITER},
};
use teststat_core::traits::SchemaRegistry;

/// The registry shipped with TESTstat.
const DEFAULT_REGISTRY: &str = include_str!("../registry/datacalls.toml");

/// Top level of a registry document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default)]
    nested_fields: Vec<String>,
    #[serde(default)]
    templates: BTreeMap<String, BTreeMap<String, RawNode>>,
    #[serde(default)]
    data_calls: BTreeMap<String, RawDataCall>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDataCall {
    name: String,
    #[serde(default)]
    required_params: Vec<String>,
    #[serde(default)]
    optional_params: Vec<String>,
    #[serde(default)]
    output: BTreeMap<String, RawNode>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNode {
    Tokens(Vec<String>),
    Template(String),
    Table(BTreeMap<String, RawNode>),
}

/// A `SchemaRegistry` backed by a TOML document.
///
/// ```rust,ignore
/// use teststat_registry::registry::TomlSchemaRegistry;
///
/// let registry = TomlSchemaRegistry::embedded()?;
/// let spec = registry.data_call("abuse-contact-finder")?;
/// ```
#[derive(Debug, Clone)]
pub struct TomlSchemaRegistry {
    data_calls: HashMap<String, DataCallSpec>,
    nested_fields: HashSet<String>,
}

impl TomlSchemaRegistry {
    /// Load the registry embedded in the binary.
    pub fn embedded() -> TestStatResult<Self> {
        Self::from_toml_str(DEFAULT_REGISTRY)
    }

    /// Parse `s` as a registry document and resolve every schema.
    ///
    /// Returns `TestStatError::ConfigError` if the TOML is malformed or any
    /// schema fails to resolve.
    pub fn from_toml_str(s: &str) -> TestStatResult<Self> {
        let file: RegistryFile = toml::from_str(s).map_err(|e| TestStatError::ConfigError {
            reason: format!("failed to parse registry TOML: {}", e),
        })?;

        let resolver = Resolver {
            templates: &file.templates,
        };

        let mut data_calls = HashMap::with_capacity(file.data_calls.len());
        for (id, raw) in &file.data_calls {
            let output = resolver.resolve_table(&raw.output, id, "", &mut Vec::new())?;
            debug!(data_call = %id, fields = output.len(), "data call schema resolved");
            data_calls.insert(
                id.clone(),
                DataCallSpec {
                    id: id.clone(),
                    name: raw.name.clone(),
                    required_params: raw.required_params.clone(),
                    optional_params: raw.optional_params.clone(),
                    output,
                },
            );
        }

        info!(
            data_calls = data_calls.len(),
            nested_fields = file.nested_fields.len(),
            "schema registry loaded"
        );

        Ok(Self {
            data_calls,
            nested_fields: file.nested_fields.into_iter().collect(),
        })
    }

    /// Read the file at `path` and parse it as a registry document.
    pub fn from_file(path: &Path) -> TestStatResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| TestStatError::ConfigError {
            reason: format!("failed to read registry file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn len(&self) -> usize {
        self.data_calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_calls.is_empty()
    }
}

impl SchemaRegistry for TomlSchemaRegistry {
    fn get(&self, data_call: &str) -> Option<&DataCallSpec> {
        self.data_calls.get(data_call)
    }

    fn nested_fields(&self) -> &HashSet<String> {
        &self.nested_fields
    }

    fn data_call_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.data_calls.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// Turns raw nodes into schema nodes, expanding template references.
struct Resolver<'a> {
    templates: &'a BTreeMap<String, BTreeMap<String, RawNode>>,
}

impl Resolver<'_> {
    /// `stack` holds the templates currently being expanded, innermost last.
    fn resolve_table(
        &self,
        table: &BTreeMap<String, RawNode>,
        data_call: &str,
        prefix: &str,
        stack: &mut Vec<String>,
    ) -> TestStatResult<BTreeMap<String, SchemaNode>> {
        let mut resolved = BTreeMap::new();
        for (field, raw) in table {
            let path = if prefix.is_empty() {
                field.clone()
            } else {
                format!("{}{}{}", prefix, PATH_DELIMITER, field)
            };
            let node = self.resolve_node(raw, data_call, &path, stack)?;
            resolved.insert(field.clone(), node);
        }
        Ok(resolved)
    }

    fn resolve_node(
        &self,
        raw: &RawNode,
        data_call: &str,
        path: &str,
        stack: &mut Vec<String>,
    ) -> TestStatResult<SchemaNode> {
        match raw {
            RawNode::Tokens(tokens) => {
                let tokens = tokens
                    .iter()
                    .map(|t| t.parse::<RuleToken>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| config_error(data_call, path, e))?;
                let rules = RuleList::from_tokens(&tokens).map_err(|e| config_error(data_call, path, e))?;
                Ok(SchemaNode::Rules(rules))
            }
            RawNode::Table(table) => Ok(SchemaNode::Mapping(self.resolve_table(table, data_call, path, stack)?)),
            RawNode::Template(name) => {
                if stack.contains(name) {
                    return Err(config_error(
                        data_call,
                        path,
                        format!("template cycle through '{}'", name),
                    ));
                }
                let template = self
                    .templates
                    .get(name)
                    .ok_or_else(|| config_error(data_call, path, format!("unknown template '{}'", name)))?;

                stack.push(name.clone());
                let resolved = self.resolve_table(template, data_call, path, stack);
                stack.pop();
                Ok(SchemaNode::Mapping(resolved?))
            }
        }
    }
}

fn config_error(data_call: &str, path: &str, reason: impl std::fmt::Display) -> TestStatError {
    TestStatError::ConfigError {
        reason: format!("data call '{}', field '{}': {}", data_call, path, reason),
    }
}
