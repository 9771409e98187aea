//! Schema-driven form model for composing test cases.
//!
//! `FormModel::for_data_call` derives, from one data call's registry entry,
//! every input a test-case editor needs:
//!
//! - one text input per query parameter (required first, then optional)
//! - a `status_code` text output
//! - a "not empty" checkbox per nested-block field
//! - one text output per rule-list leaf, keyed by its arrow-joined path
//!
//! The model carries the current value of each field. `to_test_case`
//! renders the values through the persisted test-case grammar, so a case
//! built here is identical to one typed by hand.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use teststat_contracts::{
    case::{ExpectedOutput, TestCase, TestInput, STATUS_CODE_KEY},
    error::{TestStatError, TestStatResult},
    schema::{DataCallSpec, SchemaNode, PATH_DELIMITER},
};

/// Status code assumed when the user leaves the field blank.
pub const DEFAULT_STATUS_CODE: &str = "200";

/// How a field is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    /// Marks a nested block as expected to be non-empty.
    NotEmptyCheckbox,
}

/// Current value of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Checked(bool),
}

/// One editable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub label: String,
    pub kind: InputKind,
    pub required: bool,
    pub value: FieldValue,
}

impl FormField {
    fn text(label: String, required: bool) -> Self {
        Self {
            label,
            kind: InputKind::Text,
            required,
            value: FieldValue::Text(String::new()),
        }
    }

    fn checkbox(label: String) -> Self {
        Self {
            label,
            kind: InputKind::NotEmptyCheckbox,
            required: false,
            value: FieldValue::Checked(false),
        }
    }

    fn text_value(&self) -> &str {
        match &self.value {
            FieldValue::Text(text) => text.trim(),
            FieldValue::Checked(_) => "",
        }
    }
}

/// The editable form for one data call.
#[derive(Debug, Clone, Serialize)]
pub struct FormModel {
    pub data_call: String,
    /// Query parameters in display order.
    input_order: Vec<String>,
    inputs: BTreeMap<String, FormField>,
    /// Output paths in display order.
    output_order: Vec<String>,
    outputs: BTreeMap<String, FormField>,
}

impl FormModel {
    /// Build the form for `spec`.
    pub fn for_data_call(spec: &DataCallSpec, nested_fields: &HashSet<String>) -> Self {
        let mut model = Self {
            data_call: spec.id.clone(),
            input_order: Vec::new(),
            inputs: BTreeMap::new(),
            output_order: Vec::new(),
            outputs: BTreeMap::new(),
        };

        for param in &spec.required_params {
            model.push_input(param, true);
        }
        for param in &spec.optional_params {
            model.push_input(param, false);
        }

        model.push_output(STATUS_CODE_KEY.to_string(), FormField::text("status code".to_string(), false));
        for (field, node) in &spec.output {
            if nested_fields.contains(field) {
                model.push_output(field.clone(), FormField::checkbox(format!("{} (not empty)", field)));
            }
            model.push_leaves(field.clone(), node);
        }

        model
    }

    fn push_input(&mut self, name: &str, required: bool) {
        if self.inputs.contains_key(name) {
            return;
        }
        self.input_order.push(name.to_string());
        self.inputs.insert(name.to_string(), FormField::text(name.to_string(), required));
    }

    fn push_output(&mut self, path: String, field: FormField) {
        self.output_order.push(path.clone());
        self.outputs.insert(path, field);
    }

    fn push_leaves(&mut self, path: String, node: &SchemaNode) {
        match node {
            SchemaNode::Rules(_) => {
                let label = path.replace(PATH_DELIMITER, " > ");
                self.push_output(path, FormField::text(label, false));
            }
            SchemaNode::Mapping(children) => {
                for (child, child_node) in children {
                    self.push_leaves(format!("{}{}{}", path, PATH_DELIMITER, child), child_node);
                }
            }
        }
    }

    /// Query parameter fields in display order.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, &FormField)> {
        self.input_order
            .iter()
            .filter_map(|name| self.inputs.get(name).map(|f| (name.as_str(), f)))
    }

    /// Output fields in display order.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &FormField)> {
        self.output_order
            .iter()
            .filter_map(|path| self.outputs.get(path).map(|f| (path.as_str(), f)))
    }

    pub fn output(&self, path: &str) -> Option<&FormField> {
        self.outputs.get(path)
    }

    /// Set the value of query parameter `name`.
    pub fn set_input(&mut self, name: &str, value: impl Into<String>) -> TestStatResult<()> {
        let field = self.inputs.get_mut(name).ok_or_else(|| TestStatError::InvalidTestCase {
            reason: format!("data call '{}' has no parameter '{}'", self.data_call, name),
        })?;
        field.value = FieldValue::Text(value.into());
        Ok(())
    }

    /// Set the expected value at output `path`.
    pub fn set_output(&mut self, path: &str, value: impl Into<String>) -> TestStatResult<()> {
        let field = self.output_field(path, InputKind::Text)?;
        field.value = FieldValue::Text(value.into());
        Ok(())
    }

    /// Tick or clear the not-empty checkbox of nested block `block`.
    pub fn set_not_empty(&mut self, block: &str, checked: bool) -> TestStatResult<()> {
        let field = self.output_field(block, InputKind::NotEmptyCheckbox)?;
        field.value = FieldValue::Checked(checked);
        Ok(())
    }

    fn output_field(&mut self, path: &str, kind: InputKind) -> TestStatResult<&mut FormField> {
        let data_call = &self.data_call;
        match self.outputs.get_mut(path) {
            Some(field) if field.kind == kind => Ok(field),
            _ => Err(TestStatError::InvalidTestCase {
                reason: format!("data call '{}' has no {:?} output '{}'", data_call, kind, path),
            }),
        }
    }

    /// Names of required parameters that are still blank.
    pub fn missing_required(&self) -> Vec<&str> {
        self.inputs()
            .filter(|(_, field)| field.required && field.text_value().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    /// Build a test case from the current values.
    ///
    /// Fails when a required parameter is blank. A blank status code
    /// defaults to `200`; blank outputs are not part of the case.
    pub fn to_test_case(&self) -> TestStatResult<TestCase> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(TestStatError::InvalidTestCase {
                reason: format!("Missing required parameters! ({})", missing.join(", ")),
            });
        }

        let input: Vec<String> = self
            .inputs()
            .filter(|(_, field)| !field.text_value().is_empty())
            .map(|(name, field)| format!("{}={}", name, field.text_value()))
            .collect();

        let mut expected = Vec::new();
        for (path, field) in self.outputs() {
            match (&field.value, path) {
                (FieldValue::Checked(true), _) => expected.push(format!("{} = not empty", path)),
                (FieldValue::Text(_), STATUS_CODE_KEY) => {
                    let status = match field.text_value() {
                        "" => DEFAULT_STATUS_CODE,
                        other => other,
                    };
                    expected.insert(0, format!("{} = {}", STATUS_CODE_KEY, status));
                }
                (FieldValue::Text(_), _) if !field.text_value().is_empty() => {
                    expected.push(format!("{} = {}", path, field.text_value()));
                }
                _ => {}
            }
        }

        Ok(TestCase {
            data_call: self.data_call.clone(),
            test_input: TestInput::parse(&input.join("&"))?,
            expected_output: ExpectedOutput::parse(&expected.join("; "))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use teststat_core::traits::SchemaRegistry;

    use super::*;
    use crate::registry::TomlSchemaRegistry;

    fn form(data_call: &str) -> FormModel {
        let registry = TomlSchemaRegistry::embedded().unwrap();
        let spec = registry.data_call(data_call).unwrap();
        FormModel::for_data_call(spec, registry.nested_fields())
    }

    // ── Layout ───────────────────────────────────────────────────────────────

    #[test]
    fn inputs_list_required_before_optional() {
        let model = form("allocation-history");
        let names: Vec<(&str, bool)> = model.inputs().map(|(n, f)| (n, f.required)).collect();
        assert_eq!(names, vec![("resource", true), ("starttime", false), ("endtime", false)]);
    }

    #[test]
    fn nested_blocks_get_a_checkbox_and_leaf_fields() {
        let model = form("address-space-hierarchy");

        let checkbox = model.output("exact").unwrap();
        assert_eq!(checkbox.kind, InputKind::NotEmptyCheckbox);
        assert_eq!(checkbox.value, FieldValue::Checked(false));

        let leaf = model.output("exact->netname").unwrap();
        assert_eq!(leaf.kind, InputKind::Text);
        assert_eq!(leaf.label, "exact > netname");

        assert!(model.output("parameters->resource").is_some());
        assert!(
            model.output("parameters").is_none(),
            "plain mappings get no checkbox"
        );
    }

    #[test]
    fn status_code_comes_first() {
        let model = form("dns-chain");
        assert_eq!(model.outputs().next().map(|(p, _)| p), Some("status_code"));
    }

    // ── Building test cases ──────────────────────────────────────────────────

    #[test]
    fn missing_required_parameter_is_rejected() {
        let model = form("abuse-contact-finder");
        let err = model.to_test_case().unwrap_err();
        assert!(err.to_string().contains("Missing required parameters!"), "got: {}", err);
        assert!(err.to_string().contains("resource"), "got: {}", err);
    }

    #[test]
    fn blank_status_code_defaults_to_200() {
        let mut model = form("abuse-contact-finder");
        model.set_input("resource", "193.0.0.0/21").unwrap();
        model.set_output("authoritative_rir", "RIPE").unwrap();

        let case = model.to_test_case().unwrap();
        assert_eq!(case.expected_output.status_code, "200");
        assert_eq!(
            case.expected_output.fields,
            vec![("authoritative_rir".to_string(), "ripe".to_string())]
        );
        assert_eq!(case.test_input.to_string(), "resource=193.0.0.0/21");
    }

    #[test]
    fn checked_block_renders_not_empty_sentinel() {
        let mut model = form("address-space-hierarchy");
        model.set_input("resource", "193.0.0.0/21").unwrap();
        model.set_output("status_code", "200").unwrap();
        model.set_not_empty("more_specific", true).unwrap();
        model.set_output("exact->netname", "RIPE-NCC").unwrap();

        let case = model.to_test_case().unwrap();
        assert!(case
            .expected_output
            .fields
            .contains(&("more_specific".to_string(), "notempty".to_string())));
        assert!(case
            .expected_output
            .fields
            .contains(&("exact->netname".to_string(), "ripe-ncc".to_string())));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut model = form("dns-chain");
        assert!(model.set_input("prefix", "x").is_err());
        assert!(model.set_output("no->such", "x").is_err());
        assert!(
            model.set_not_empty("resource", true).is_err(),
            "a text leaf is not a checkbox"
        );
    }
}
