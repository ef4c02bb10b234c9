//! Dependency evaluation
//!
//! [`evaluate`] is a pure function of a definition and a value snapshot. It
//! decides which fields are hidden and which option list each selectable
//! field currently offers. Hidden values are kept; nothing is written back.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use super::definition::FormDefinition;
use super::dependency::DependencyEffect;
use super::field::{Field, FieldKind, FieldOption};
use super::path::PropertyPath;

/// Hidden set and active options for one snapshot
///
/// Paths are concrete: array items appear as `contacts[0].type`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Evaluation {
    hidden: BTreeSet<PropertyPath>,
    options: BTreeMap<PropertyPath, Vec<FieldOption>>,
    overridden: BTreeSet<PropertyPath>,
    conflicts: BTreeSet<PropertyPath>,
}

impl Evaluation {
    pub fn is_hidden(&self, path: &PropertyPath) -> bool {
        self.hidden.contains(path)
    }

    /// Hidden state of a top-level field
    pub fn hidden(&self, key: &str) -> bool {
        self.is_hidden(&PropertyPath::key(key))
    }

    /// Active options at a path; empty for non-selectable or unknown paths
    pub fn options_for(&self, path: &PropertyPath) -> &[FieldOption] {
        self.options.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Active options of a top-level field
    pub fn options(&self, key: &str) -> &[FieldOption] {
        self.options_for(&PropertyPath::key(key))
    }

    /// True if a SETS_OPTIONS dependency replaced the declared options
    pub fn is_overridden(&self, path: &PropertyPath) -> bool {
        self.overridden.contains(path)
    }

    pub fn hidden_paths(&self) -> impl Iterator<Item = &PropertyPath> {
        self.hidden.iter()
    }

    /// Selectable fields whose current value is outside their active options
    pub fn option_conflicts(&self) -> impl Iterator<Item = &PropertyPath> {
        self.conflicts.iter()
    }

    pub fn has_conflict(&self, path: &PropertyPath) -> bool {
        self.conflicts.contains(path)
    }
}

/// Compute hidden fields and active options for `values`
///
/// Never fails: anything that is not an object where an object is expected,
/// or not an array where an array is expected, is treated as absent.
pub fn evaluate(definition: &FormDefinition, values: &Value) -> Evaluation {
    let mut evaluation = Evaluation::default();
    let empty = Map::new();
    let root = values.as_object().unwrap_or(&empty);
    evaluate_level(definition.list_fields(), root, &PropertyPath::root(), false, &mut evaluation);

    tracing::trace!(
        hidden = evaluation.hidden.len(),
        overridden = evaluation.overridden.len(),
        conflicts = evaluation.conflicts.len(),
        "evaluated dependencies"
    );
    evaluation
}

fn lookup<'a>(values: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    values.get(key).filter(|v| !v.is_null())
}

fn evaluate_level(
    fields: &[Field],
    values: &Map<String, Value>,
    path: &PropertyPath,
    parent_hidden: bool,
    out: &mut Evaluation,
) {
    for field in fields {
        let field_path = path.push_property(&field.key);
        let current = lookup(values, &field.key);

        let mut hidden = parent_hidden;
        let mut replacement: Option<&[FieldOption]> = None;
        for dependency in &field.dependencies {
            let source = lookup(values, &dependency.source_field);
            match &dependency.effect {
                DependencyEffect::Hides => {
                    if dependency.when.matches(source, current) {
                        hidden = true;
                    }
                }
                // Declaration order; the last firing dependency wins
                DependencyEffect::SetsOptions(options) => {
                    if dependency.when.matches(source, current) {
                        replacement = Some(options);
                    }
                }
            }
        }

        if hidden {
            out.hidden.insert(field_path.clone());
        }

        if let Some(declared) = field.options() {
            let active = replacement.unwrap_or(declared);
            if replacement.is_some() {
                out.overridden.insert(field_path.clone());
            }
            if outside_options(&field.kind, current, active) {
                tracing::debug!(path = %field_path, "value outside active options");
                out.conflicts.insert(field_path.clone());
            }
            out.options.insert(field_path.clone(), active.to_vec());
        }

        if let Some(children) = field.children() {
            let empty = Map::new();
            for (idx, item) in current.and_then(Value::as_array).into_iter().flatten().enumerate() {
                let item_values = item.as_object().unwrap_or(&empty);
                evaluate_level(children, item_values, &field_path.push_index(idx), hidden, out);
            }
        }
    }
}

fn outside_options(kind: &FieldKind, current: Option<&Value>, active: &[FieldOption]) -> bool {
    let allowed = |value: &str| active.iter().any(|o| o.value == value);
    match (kind, current) {
        (FieldKind::Checkbox { .. }, Some(Value::Array(items))) => {
            items.iter().filter_map(Value::as_str).any(|v| !allowed(v))
        }
        (_, Some(Value::String(value))) => !value.is_empty() && !allowed(value),
        _ => false,
    }
}

#[cfg(test)]
#[path = "evaluator_test.rs"]
mod tests;
