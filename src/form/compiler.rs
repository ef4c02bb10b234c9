//! Schema compilation
//!
//! [`compile`] turns a [`FormDefinition`] into a [`FormSchema`]: a tree of
//! compiled validators mirroring the field tree, plus the [`ValueShape`] of the
//! data object. Rule chains are compiled by a caller-supplied
//! [`ValidatorAdapter`]; every failure in the tree is collected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use super::definition::FormDefinition;
use super::evaluator::{evaluate, Evaluation};
use super::field::{Field, FieldKind, FieldOption};
use super::path::PropertyPath;
use super::shape::ValueShape;
use crate::error::{CompileError, SchemaCompilationError};
use crate::rules::chain::is_date;
use crate::rules::{is_blank, FieldValidator, RuleChain, ValidatorAdapter};

/// How validation treats fields hidden by a dependency
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HiddenFieldPolicy {
    /// Hidden fields are validated like visible ones
    #[default]
    Enforce,
    /// Hidden fields may be left empty, but present values are still checked
    SkipRequired,
    /// Hidden fields are not validated at all
    Skip,
}

/// Options applied when compiling and validating
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub hidden_fields: HiddenFieldPolicy,
    /// When false, keys not declared at a level are reported
    pub allow_unknown_keys: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            hidden_fields: HiddenFieldPolicy::Enforce,
            allow_unknown_keys: true,
        }
    }
}

/// One problem found in a submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Concrete path, e.g. `contacts[2].email`
    pub path: PropertyPath,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: PropertyPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

/// Result of validating a submission; never fatal
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }

    /// Issues reported for exactly this path
    pub fn for_path<'a>(&'a self, path: &'a PropertyPath) -> impl Iterator<Item = &'a ValidationIssue> {
        self.issues.iter().filter(move |issue| &issue.path == path)
    }
}

#[derive(Debug)]
enum CompiledNode {
    Text,
    Date,
    DateRange,
    /// Single value among the active options
    Choice,
    /// Distinct values among the active options
    MultiChoice,
    Toggle,
    Array {
        item: CompiledObject,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
}

#[derive(Debug)]
struct CompiledEntry {
    key: String,
    /// Presence check added by the compiler
    required: bool,
    validator: Option<Arc<dyn FieldValidator>>,
    node: CompiledNode,
}

#[derive(Debug, Default)]
struct CompiledObject {
    entries: Vec<CompiledEntry>,
}

/// Compiled form: validator tree plus value shape
#[derive(Debug)]
pub struct FormSchema {
    definition: Arc<FormDefinition>,
    root: CompiledObject,
    shape: ValueShape,
    options: CompileOptions,
}

/// Compile a definition, collecting every rule-chain and option-set failure
pub fn compile(
    definition: impl Into<Arc<FormDefinition>>,
    adapter: &dyn ValidatorAdapter,
    options: CompileOptions,
) -> Result<FormSchema, CompileError> {
    let definition = definition.into();
    let mut errors = Vec::new();
    let root = compile_level(definition.list_fields(), &PropertyPath::root(), adapter, &mut errors);
    if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "schema compilation failed");
        return Err(CompileError(errors));
    }

    let shape = ValueShape::from_fields(definition.list_fields());
    tracing::debug!(
        fields = root.entries.len(),
        hidden_fields = ?options.hidden_fields,
        "compiled form schema"
    );
    Ok(FormSchema {
        definition,
        root,
        shape,
        options,
    })
}

fn compile_level(
    fields: &[Field],
    path: &PropertyPath,
    adapter: &dyn ValidatorAdapter,
    errors: &mut Vec<SchemaCompilationError>,
) -> CompiledObject {
    let mut object = CompiledObject::default();
    for field in fields {
        let field_path = path.push_property(&field.key);
        let error = |message: String| SchemaCompilationError {
            path: field_path.clone(),
            message,
        };

        let validator = match &field.rules {
            None => None,
            Some(RuleChain::Prebuilt(validator)) => Some(validator.clone()),
            Some(RuleChain::Chain(chain)) => match adapter.compile(chain) {
                Ok(validator) => Some(validator),
                Err(message) => {
                    errors.push(error(format!("invalid rule chain '{}': {}", chain, message)));
                    None
                }
            },
        };

        if let Some(declared) = field.options() {
            let option_sets = std::iter::once(declared).chain(field.dependencies.iter().filter_map(|d| d.options()));
            for options in option_sets {
                if let Some(value) = duplicate_value(options) {
                    errors.push(error(format!("duplicate option value '{}'", value)));
                }
            }
        }

        let node = match &field.kind {
            FieldKind::Input { .. } | FieldKind::Textarea { .. } => CompiledNode::Text,
            FieldKind::Date { .. } => CompiledNode::Date,
            FieldKind::DateRange { .. } => CompiledNode::DateRange,
            FieldKind::Select { .. } | FieldKind::Radio { .. } => CompiledNode::Choice,
            FieldKind::Checkbox { .. } => CompiledNode::MultiChoice,
            FieldKind::Switch => CompiledNode::Toggle,
            FieldKind::Array {
                children,
                min_items,
                max_items,
            } => CompiledNode::Array {
                item: compile_level(children, &field_path.push_wildcard(), adapter, errors),
                min_items: *min_items,
                max_items: *max_items,
            },
        };

        let enforced = validator.as_ref().is_some_and(|v| v.enforces_presence());
        object.entries.push(CompiledEntry {
            key: field.key.clone(),
            required: field.required && !enforced,
            validator,
            node,
        });
    }
    object
}

fn duplicate_value(options: &[FieldOption]) -> Option<&str> {
    let mut seen = HashSet::new();
    options
        .iter()
        .find(|o| !seen.insert(o.value.as_str()))
        .map(|o| o.value.as_str())
}

impl FormSchema {
    pub fn definition(&self) -> &Arc<FormDefinition> {
        &self.definition
    }

    pub fn shape(&self) -> &ValueShape {
        &self.shape
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Initial data object with an empty value for every field
    pub fn default_values(&self) -> Value {
        self.shape.default_value()
    }

    /// Validate a submission against the options active for these values
    pub fn validate(&self, values: &Value) -> ValidationReport {
        let evaluation = evaluate(&self.definition, values);
        self.validate_with(values, &evaluation)
    }

    /// Validate using an evaluation already computed for `values`
    pub fn validate_with(&self, values: &Value, evaluation: &Evaluation) -> ValidationReport {
        let mut issues = Vec::new();
        match values.as_object() {
            Some(map) => self.validate_object(&self.root, map, &PropertyPath::root(), evaluation, &mut issues),
            None => issues.push(ValidationIssue::new(PropertyPath::root(), "Expected an object")),
        }
        tracing::debug!(issues = issues.len(), "validated submission");
        ValidationReport { issues }
    }

    fn validate_object(
        &self,
        object: &CompiledObject,
        map: &Map<String, Value>,
        base: &PropertyPath,
        evaluation: &Evaluation,
        issues: &mut Vec<ValidationIssue>,
    ) {
        for entry in &object.entries {
            let path = base.push_property(&entry.key);
            let hidden = evaluation.is_hidden(&path);
            if hidden && self.options.hidden_fields == HiddenFieldPolicy::Skip {
                continue;
            }
            let enforce_presence = !(hidden && self.options.hidden_fields == HiddenFieldPolicy::SkipRequired);
            let value = map.get(&entry.key).filter(|v| !v.is_null());

            if is_blank(value) {
                if !enforce_presence {
                    continue;
                }
                if entry.required {
                    issues.push(ValidationIssue::new(path, "Required"));
                    continue;
                }
            }

            let Some(value) = value else {
                if let Some(validator) = entry.validator.as_ref().filter(|v| enforce_presence && v.enforces_presence()) {
                    run_validator(validator.as_ref(), None, &path, issues);
                }
                continue;
            };

            self.validate_node(&entry.node, value, &path, evaluation, issues);
            if let Some(validator) = &entry.validator {
                run_validator(validator.as_ref(), Some(value), &path, issues);
            }
        }

        if !self.options.allow_unknown_keys {
            for key in map.keys() {
                if !object.entries.iter().any(|e| &e.key == key) {
                    issues.push(ValidationIssue::new(base.push_property(key), "Unknown field"));
                }
            }
        }
    }

    fn validate_node(
        &self,
        node: &CompiledNode,
        value: &Value,
        path: &PropertyPath,
        evaluation: &Evaluation,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let mut issue = |path: &PropertyPath, message: String| issues.push(ValidationIssue::new(path.clone(), message));
        let in_options = |v: &str| evaluation.options_for(path).iter().any(|o| o.value == v);

        match (node, value) {
            (CompiledNode::Text, Value::String(_)) => {}
            (CompiledNode::Date, Value::String(s)) => {
                if !s.is_empty() && !is_date(s) {
                    issue(path, "Invalid date".to_string());
                }
            }
            (CompiledNode::DateRange, Value::Object(range)) => {
                let bound = |name: &str| range.get(name).filter(|v| !v.is_null());
                let mut dates = Vec::with_capacity(2);
                for name in ["start", "end"] {
                    match bound(name) {
                        None => {}
                        Some(Value::String(s)) if s.is_empty() => {}
                        Some(Value::String(s)) if is_date(s) => dates.push(s.as_str()),
                        Some(_) => issue(&path.push_property(name), "Invalid date".to_string()),
                    }
                }
                // ISO-8601 dates order lexically
                if let [start, end] = dates.as_slice() {
                    if start > end {
                        issue(path, "Start date must not be after end date".to_string());
                    }
                }
            }
            (CompiledNode::Choice, Value::String(s)) => {
                if !s.is_empty() && !in_options(s) {
                    issue(path, format!("Invalid option '{}'", s));
                }
            }
            (CompiledNode::MultiChoice, Value::Array(items)) => {
                let mut seen = HashSet::new();
                for (idx, item) in items.iter().enumerate() {
                    let item_path = path.push_index(idx);
                    match item.as_str() {
                        Some(s) if !in_options(s) => issue(&item_path, format!("Invalid option '{}'", s)),
                        Some(s) if !seen.insert(s) => issue(&item_path, format!("Duplicate option '{}'", s)),
                        Some(_) => {}
                        None => issue(&item_path, "Expected string".to_string()),
                    }
                }
            }
            (CompiledNode::Toggle, Value::Bool(_)) => {}
            (
                CompiledNode::Array {
                    item,
                    min_items,
                    max_items,
                },
                Value::Array(items),
            ) => {
                if let Some(min) = *min_items {
                    if items.len() < min {
                        issue(path, format!("Must contain at least {} item(s)", min));
                    }
                }
                if let Some(max) = *max_items {
                    if items.len() > max {
                        issue(path, format!("Must contain at most {} item(s)", max));
                    }
                }
                for (idx, element) in items.iter().enumerate() {
                    let item_path = path.push_index(idx);
                    match element.as_object() {
                        Some(map) => self.validate_object(item, map, &item_path, evaluation, issues),
                        None => issues.push(ValidationIssue::new(item_path, "Expected an object")),
                    }
                }
            }
            (node, _) => issue(path, format!("Expected {}", expected_type(node))),
        }
    }
}

fn expected_type(node: &CompiledNode) -> &'static str {
    match node {
        CompiledNode::Text | CompiledNode::Date | CompiledNode::Choice => "string",
        CompiledNode::DateRange => "an object with start and end",
        CompiledNode::MultiChoice | CompiledNode::Array { .. } => "array",
        CompiledNode::Toggle => "boolean",
    }
}

fn run_validator(validator: &dyn FieldValidator, value: Option<&Value>, path: &PropertyPath, issues: &mut Vec<ValidationIssue>) {
    if let Err(messages) = validator.validate(value) {
        issues.extend(messages.into_iter().map(|m| ValidationIssue::new(path.clone(), m)));
    }
}

#[cfg(test)]
#[path = "compiler_test.rs"]
mod tests;
