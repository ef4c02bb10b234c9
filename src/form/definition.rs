//! Form definitions: validated field trees with optional step grouping

use schemars::JsonSchema;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::field::{Field, FieldConfig};
use super::path::{PathSegment, PropertyPath};
use super::validator::DefinitionValidator;
use crate::error::{ConfigurationError, DefinitionError};

/// Presentation grouping of top-level fields for multi-page forms
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Keys of the top-level fields shown on this step, in order
    pub field_keys: Vec<String>,
}

/// Serializable form of a step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepConfig {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

/// Serializable form of a whole definition
///
/// Fields outside any step come first, followed by each step's fields. All of
/// them form a single sibling level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepConfig>,
}

/// A validated, immutable field tree
///
/// Only constructible through [`FormDefinition::new`], [`FormDefinition::with_steps`]
/// or [`FormDefinition::from_config`], so malformed trees never reach the
/// compiler or the evaluator.
#[derive(Clone, Debug, PartialEq)]
pub struct FormDefinition {
    id: Option<String>,
    title: Option<String>,
    fields: Vec<Field>,
    steps: Vec<Step>,
}

impl FormDefinition {
    /// Build a single-page form
    pub fn new(fields: Vec<Field>) -> Result<Self, DefinitionError> {
        Self::build(None, None, fields, Vec::new())
    }

    /// Build a multi-page form; `loose` fields come before every step
    pub fn with_steps(loose: Vec<Field>, steps: Vec<(Step, Vec<Field>)>) -> Result<Self, DefinitionError> {
        let mut fields = loose;
        let mut layout = Vec::with_capacity(steps.len());
        for (mut step, step_fields) in steps {
            step.field_keys = step_fields.iter().map(|f| f.key.clone()).collect();
            fields.extend(step_fields);
            layout.push(step);
        }
        Self::build(None, None, fields, layout)
    }

    fn build(
        id: Option<String>,
        title: Option<String>,
        fields: Vec<Field>,
        steps: Vec<Step>,
    ) -> Result<Self, DefinitionError> {
        let errors = DefinitionValidator::validate(&fields);
        if !errors.is_empty() {
            return Err(DefinitionError(errors));
        }
        tracing::debug!(fields = fields.len(), steps = steps.len(), "form definition built");
        Ok(Self {
            id,
            title,
            fields,
            steps,
        })
    }

    /// Build from the serializable form, rejecting any tree that violates the
    /// construction invariants
    pub fn from_config(config: FormConfig) -> Result<Self, DefinitionError> {
        let mut errors = Vec::new();
        let mut fields = DefinitionValidator::convert_fields(&config.fields, &PropertyPath::root(), &mut errors);
        let mut steps = Vec::with_capacity(config.steps.len());
        for step in &config.steps {
            let step_fields = DefinitionValidator::convert_fields(&step.fields, &PropertyPath::root(), &mut errors);
            steps.push(Step {
                id: step.id.clone(),
                title: step.title.clone(),
                description: step.description.clone(),
                field_keys: step_fields.iter().map(|f| f.key.clone()).collect(),
            });
            fields.extend(step_fields);
        }

        errors.extend(DefinitionValidator::validate(&fields));
        if !errors.is_empty() {
            return Err(DefinitionError(errors));
        }
        Ok(Self {
            id: config.id,
            title: config.title,
            fields,
            steps,
        })
    }

    /// Serializable form preserving every attribute
    pub fn to_config(&self) -> Result<FormConfig, ConfigurationError> {
        let in_step: std::collections::HashSet<&str> = self
            .steps
            .iter()
            .flat_map(|s| s.field_keys.iter().map(String::as_str))
            .collect();

        let to_config = |field: &Field| field.to_config(&PropertyPath::key(&field.key));

        let fields = self
            .fields
            .iter()
            .filter(|f| !in_step.contains(f.key.as_str()))
            .map(to_config)
            .collect::<Result<Vec<_>, _>>()?;

        let steps = self
            .steps
            .iter()
            .map(|step| {
                let fields = step
                    .field_keys
                    .iter()
                    .filter_map(|key| self.find_field(key))
                    .map(to_config)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(StepConfig {
                    id: step.id.clone(),
                    title: step.title.clone(),
                    description: step.description.clone(),
                    fields,
                })
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        Ok(FormConfig {
            id: self.id.clone(),
            title: self.title.clone(),
            fields,
            steps,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Top-level fields in declaration order
    pub fn list_fields(&self) -> &[Field] {
        &self.fields
    }

    /// Top-level field by key
    pub fn find_field(&self, key: &str) -> Option<&Field> {
        find_field(&self.fields, key)
    }

    /// Nested field by path; indices and wildcards both select the item schema
    pub fn find_path(&self, path: &PropertyPath) -> Option<&Field> {
        let mut level: &[Field] = &self.fields;
        let mut found: Option<&Field> = None;
        for segment in path.segments() {
            match segment {
                PathSegment::Property(key) => {
                    let field = find_field(level, key)?;
                    level = field.children().unwrap_or(&[]);
                    found = Some(field);
                }
                PathSegment::Index(_) | PathSegment::ArrayWildcard => {
                    if !found.is_some_and(|f| f.children().is_some()) {
                        return None;
                    }
                }
            }
        }
        found
    }

    /// Fields of one step, in step order
    pub fn step_fields(&self, step_id: &str) -> Vec<&Field> {
        self.steps
            .iter()
            .find(|s| s.id == step_id)
            .map(|s| s.field_keys.iter().filter_map(|k| self.find_field(k)).collect())
            .unwrap_or_default()
    }

    /// Visit every field depth-first with its schema path (array items use `[*]`)
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&PropertyPath, &'a Field)) {
        walk_level(&self.fields, &PropertyPath::root(), visit);
    }
}

/// Field among `fields` (one sibling level) by key
pub fn find_field<'a>(fields: &'a [Field], key: &str) -> Option<&'a Field> {
    fields.iter().find(|f| f.key == key)
}

/// Fields of one sibling level, in declaration order
pub fn list_fields(definition: &FormDefinition) -> &[Field] {
    definition.list_fields()
}

fn walk_level<'a>(fields: &'a [Field], path: &PropertyPath, visit: &mut dyn FnMut(&PropertyPath, &'a Field)) {
    for field in fields {
        let field_path = path.push_property(&field.key);
        visit(&field_path, field);
        if let Some(children) = field.children() {
            walk_level(children, &field_path.push_wildcard(), visit);
        }
    }
}

impl Serialize for FormDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_config().map_err(S::Error::custom)?.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FormDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let config = FormConfig::deserialize(deserializer)?;
        FormDefinition::from_config(config).map_err(D::Error::custom)
    }
}

impl TryFrom<FormConfig> for FormDefinition {
    type Error = DefinitionError;

    fn try_from(config: FormConfig) -> Result<Self, Self::Error> {
        FormDefinition::from_config(config)
    }
}
