//! Value-shape descriptors derived from a field tree
//!
//! A [`ValueShape`] describes the data object a form produces. It can be
//! exported as JSON Schema and used to build an initial value snapshot.

use serde_json::{Map, Value};

use super::dependency::DependencyEffect;
use super::field::{Field, FieldKind};

/// Type of a shape node
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeType {
    String,
    Boolean,
    /// Single choice among option values (select, radio)
    Enum(Vec<String>),
    /// Several distinct choices among option values (checkbox)
    Set(Vec<String>),
    /// `{ start, end }` pair of dates
    DateRange,
    Array {
        items: Box<ValueShape>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object {
        properties: Vec<(String, ValueShape)>,
    },
}

/// Shape of one value in the data object
#[derive(Clone, Debug, PartialEq)]
pub struct ValueShape {
    pub node_type: ShapeType,
    pub title: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    /// Format hint (e.g. "date")
    pub format: Option<String>,
}

impl ValueShape {
    fn new(node_type: ShapeType) -> Self {
        Self {
            node_type,
            title: None,
            description: None,
            required: false,
            format: None,
        }
    }

    /// Object shape of one sibling level, in declaration order
    pub fn from_fields(fields: &[Field]) -> Self {
        let properties = fields
            .iter()
            .map(|field| (field.key.clone(), Self::from_field(field)))
            .collect();
        Self::new(ShapeType::Object { properties })
    }

    pub fn from_field(field: &Field) -> Self {
        let (node_type, format) = match &field.kind {
            FieldKind::Input { .. } | FieldKind::Textarea { .. } => (ShapeType::String, None),
            FieldKind::Date { .. } => (ShapeType::String, Some("date".to_string())),
            FieldKind::DateRange { .. } => (ShapeType::DateRange, None),
            FieldKind::Select { .. } | FieldKind::Radio { .. } => (ShapeType::Enum(possible_values(field)), None),
            FieldKind::Checkbox { .. } => (ShapeType::Set(possible_values(field)), None),
            FieldKind::Switch => (ShapeType::Boolean, None),
            FieldKind::Array {
                children,
                min_items,
                max_items,
            } => (
                ShapeType::Array {
                    items: Box::new(Self::from_fields(children)),
                    min_items: *min_items,
                    max_items: *max_items,
                },
                None,
            ),
        };

        Self {
            node_type,
            title: Some(field.label.clone()).filter(|l| !l.is_empty()),
            description: field.description.clone(),
            required: field.required,
            format,
        }
    }

    /// Type name as used in JSON Schema
    pub fn type_name(&self) -> &'static str {
        match &self.node_type {
            ShapeType::String | ShapeType::Enum(_) => "string",
            ShapeType::Boolean => "boolean",
            ShapeType::Set(_) | ShapeType::Array { .. } => "array",
            ShapeType::DateRange | ShapeType::Object { .. } => "object",
        }
    }

    /// Export as a JSON Schema document
    pub fn to_json_schema(&self) -> Value {
        let mut schema = shape_to_json(self);
        if let Value::Object(obj) = &mut schema {
            obj.insert(
                "$schema".to_string(),
                Value::String("http://json-schema.org/draft-07/schema#".to_string()),
            );
        }
        schema
    }

    /// Empty value of this shape, usable as an initial snapshot
    pub fn default_value(&self) -> Value {
        match &self.node_type {
            ShapeType::String => Value::String(String::new()),
            ShapeType::Boolean => Value::Bool(false),
            ShapeType::Enum(_) | ShapeType::DateRange => Value::Null,
            ShapeType::Set(_) => Value::Array(Vec::new()),
            ShapeType::Array { items, min_items, .. } => {
                let count = min_items.unwrap_or(0);
                Value::Array((0..count).map(|_| items.default_value()).collect())
            }
            ShapeType::Object { properties } => {
                let mut obj = Map::new();
                for (name, prop) in properties {
                    obj.insert(name.clone(), prop.default_value());
                }
                Value::Object(obj)
            }
        }
    }
}

/// Declared option values followed by any value a SETS_OPTIONS dependency can introduce
fn possible_values(field: &Field) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    let declared = field.options().unwrap_or(&[]);
    let replacements = field.dependencies.iter().filter_map(|d| match &d.effect {
        DependencyEffect::SetsOptions(options) => Some(options.as_slice()),
        DependencyEffect::Hides => None,
    });
    for option in std::iter::once(declared).chain(replacements).flatten() {
        if !values.contains(&option.value) {
            values.push(option.value.clone());
        }
    }
    values
}

fn string_array(values: &[String]) -> Value {
    Value::Array(values.iter().map(|v| Value::String(v.clone())).collect())
}

fn shape_to_json(shape: &ValueShape) -> Value {
    let mut obj = Map::new();
    let type_name = Value::String(shape.type_name().to_string());
    // Choices and date ranges start out unset (null)
    if matches!(shape.node_type, ShapeType::Enum(_) | ShapeType::DateRange) {
        obj.insert(
            "type".to_string(),
            Value::Array(vec![type_name, Value::String("null".to_string())]),
        );
    } else {
        obj.insert("type".to_string(), type_name);
    }

    match &shape.node_type {
        ShapeType::String | ShapeType::Boolean => {}
        ShapeType::Enum(values) => {
            let mut allowed = string_array(values);
            if let Value::Array(items) = &mut allowed {
                items.push(Value::Null);
            }
            obj.insert("enum".to_string(), allowed);
        }
        ShapeType::Set(values) => {
            let mut items = Map::new();
            items.insert("type".to_string(), Value::String("string".to_string()));
            items.insert("enum".to_string(), string_array(values));
            obj.insert("items".to_string(), Value::Object(items));
            obj.insert("uniqueItems".to_string(), Value::Bool(true));
        }
        ShapeType::DateRange => {
            let mut props = Map::new();
            for bound in ["start", "end"] {
                let mut date = Map::new();
                date.insert("type".to_string(), Value::String("string".to_string()));
                date.insert("format".to_string(), Value::String("date".to_string()));
                props.insert(bound.to_string(), Value::Object(date));
            }
            obj.insert("properties".to_string(), Value::Object(props));
        }
        ShapeType::Array {
            items,
            min_items,
            max_items,
        } => {
            obj.insert("items".to_string(), shape_to_json(items));
            if let Some(min) = min_items {
                obj.insert("minItems".to_string(), Value::Number((*min as u64).into()));
            }
            if let Some(max) = max_items {
                obj.insert("maxItems".to_string(), Value::Number((*max as u64).into()));
            }
        }
        ShapeType::Object { properties } => {
            let mut props = Map::new();
            let mut required = Vec::new();
            for (name, prop) in properties {
                props.insert(name.clone(), shape_to_json(prop));
                if prop.required {
                    required.push(Value::String(name.clone()));
                }
            }
            obj.insert("properties".to_string(), Value::Object(props));
            if !required.is_empty() {
                obj.insert("required".to_string(), Value::Array(required));
            }
        }
    }

    if let Some(format) = &shape.format {
        obj.insert("format".to_string(), Value::String(format.clone()));
    }
    if let Some(title) = &shape.title {
        obj.insert("title".to_string(), Value::String(title.clone()));
    }
    if let Some(description) = &shape.description {
        obj.insert("description".to_string(), Value::String(description.clone()));
    }

    Value::Object(obj)
}
