//! Field definitions
//!
//! [`FieldKind`] is the closed set of field variants. Each variant carries only
//! the attributes valid for it: options exist only on selectable kinds,
//! children only on arrays. [`FieldConfig`] is the plain serializable form read
//! from definition files.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::dependency::{Dependency, DependencyConfig};
use super::path::PropertyPath;
use crate::error::{ConfigurationError, ConfigurationErrorKind};
use crate::rules::RuleChain;

/// One selectable choice
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

impl FieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Build an option list from (label, value) pairs
pub fn options<L, V>(pairs: impl IntoIterator<Item = (L, V)>) -> Vec<FieldOption>
where
    L: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(label, value)| FieldOption::new(label, value))
        .collect()
}

/// Field type tag as written in definitions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    Input,
    Textarea,
    Select,
    Checkbox,
    Switch,
    Radio,
    Date,
    RangeDate,
    Array,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Switch => "switch",
            Self::Radio => "radio",
            Self::Date => "date",
            Self::RangeDate => "range-date",
            Self::Array => "array",
        }
    }

    pub fn is_selectable(&self) -> bool {
        matches!(self, Self::Select | Self::Checkbox | Self::Radio)
    }

    pub fn has_placeholder(&self) -> bool {
        matches!(self, Self::Input | Self::Textarea | Self::Date | Self::RangeDate)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant-specific attributes of a field
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Input { placeholder: Option<String> },
    Textarea { placeholder: Option<String> },
    Date { placeholder: Option<String> },
    DateRange { placeholder: Option<String> },
    Select { options: Vec<FieldOption> },
    Radio { options: Vec<FieldOption> },
    /// Multi-select; the value is a list of option values
    Checkbox { options: Vec<FieldOption> },
    Switch,
    /// Repeated sub-form; `children` describe one item
    Array {
        children: Vec<Field>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Input { .. } => FieldType::Input,
            Self::Textarea { .. } => FieldType::Textarea,
            Self::Date { .. } => FieldType::Date,
            Self::DateRange { .. } => FieldType::RangeDate,
            Self::Select { .. } => FieldType::Select,
            Self::Radio { .. } => FieldType::Radio,
            Self::Checkbox { .. } => FieldType::Checkbox,
            Self::Switch => FieldType::Switch,
            Self::Array { .. } => FieldType::Array,
        }
    }
}

/// One declared input unit
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Stable identity, unique among siblings
    pub id: String,
    /// Property name of the value in the data object, unique among siblings
    pub key: String,
    pub label: String,
    pub description: Option<String>,
    pub required: bool,
    pub rules: Option<RuleChain>,
    /// Evaluated in declaration order
    pub dependencies: Vec<Dependency>,
    pub kind: FieldKind,
}

impl Field {
    /// New field with `id` and `label` defaulting to the key
    pub fn new(key: impl Into<String>, kind: FieldKind) -> Self {
        let key = key.into();
        Self {
            id: key.clone(),
            label: key.clone(),
            key,
            description: None,
            required: false,
            rules: None,
            dependencies: Vec::new(),
            kind,
        }
    }

    pub fn input(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::Input { placeholder: None })
    }

    pub fn textarea(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::Textarea { placeholder: None })
    }

    pub fn date(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::Date { placeholder: None })
    }

    pub fn date_range(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::DateRange { placeholder: None })
    }

    pub fn select(key: impl Into<String>, options: Vec<FieldOption>) -> Self {
        Self::new(key, FieldKind::Select { options })
    }

    pub fn radio(key: impl Into<String>, options: Vec<FieldOption>) -> Self {
        Self::new(key, FieldKind::Radio { options })
    }

    pub fn checkbox(key: impl Into<String>, options: Vec<FieldOption>) -> Self {
        Self::new(key, FieldKind::Checkbox { options })
    }

    pub fn switch(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::Switch)
    }

    pub fn array(key: impl Into<String>, children: Vec<Field>) -> Self {
        Self::new(
            key,
            FieldKind::Array {
                children,
                min_items: None,
                max_items: None,
            },
        )
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn rules(mut self, rules: impl Into<RuleChain>) -> Self {
        self.rules = Some(rules.into());
        self
    }

    pub fn dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Sets the placeholder on kinds that have one; ignored otherwise
    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        match &mut self.kind {
            FieldKind::Input { placeholder }
            | FieldKind::Textarea { placeholder }
            | FieldKind::Date { placeholder }
            | FieldKind::DateRange { placeholder } => *placeholder = Some(text.into()),
            _ => {}
        }
        self
    }

    /// Sets item-count bounds on array fields; ignored otherwise
    pub fn item_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        if let FieldKind::Array {
            min_items,
            max_items,
            ..
        } = &mut self.kind
        {
            *min_items = min;
            *max_items = max;
        }
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    pub fn is_selectable(&self) -> bool {
        self.field_type().is_selectable()
    }

    /// Declared options of select, radio and checkbox fields
    pub fn options(&self) -> Option<&[FieldOption]> {
        match &self.kind {
            FieldKind::Select { options }
            | FieldKind::Radio { options }
            | FieldKind::Checkbox { options } => Some(options),
            _ => None,
        }
    }

    /// Item schema of array fields
    pub fn children(&self) -> Option<&[Field]> {
        match &self.kind {
            FieldKind::Array { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn placeholder_text(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Input { placeholder }
            | FieldKind::Textarea { placeholder }
            | FieldKind::Date { placeholder }
            | FieldKind::DateRange { placeholder } => placeholder.as_deref(),
            _ => None,
        }
    }

    /// Plain serializable form; fails on prebuilt validators and native closures
    pub fn to_config(&self, path: &PropertyPath) -> Result<FieldConfig, ConfigurationError> {
        let not_serializable =
            |what: String| ConfigurationError::new(path.clone(), ConfigurationErrorKind::NotSerializable(what));

        let rules = match &self.rules {
            None => None,
            Some(RuleChain::Chain(chain)) => Some(chain.clone()),
            Some(RuleChain::Prebuilt(_)) => return Err(not_serializable("a prebuilt validator".to_string())),
        };

        let mut dependencies = Vec::with_capacity(self.dependencies.len());
        for dependency in &self.dependencies {
            if dependency.when.is_custom() {
                return Err(not_serializable(format!(
                    "a native condition on '{}'",
                    dependency.source_field
                )));
            }
            dependencies.push(DependencyConfig::from(dependency));
        }

        let (min_items, max_items, children) = match &self.kind {
            FieldKind::Array {
                children,
                min_items,
                max_items,
            } => {
                let item_path = path.push_wildcard();
                let children = children
                    .iter()
                    .map(|child| child.to_config(&item_path.push_property(&child.key)))
                    .collect::<Result<Vec<_>, _>>()?;
                (*min_items, *max_items, Some(children))
            }
            _ => (None, None, None),
        };

        Ok(FieldConfig {
            id: self.id.clone(),
            key: self.key.clone(),
            field_type: self.field_type(),
            label: self.label.clone(),
            placeholder: self.placeholder_text().map(String::from),
            description: self.description.clone(),
            required: self.required,
            rules,
            options: self.options().map(<[FieldOption]>::to_vec),
            dependencies,
            children,
            min_items,
            max_items,
        })
    }
}

/// Returns true for array-of-object fields
pub fn is_array_field(field: &Field) -> bool {
    matches!(field.kind, FieldKind::Array { .. })
}

/// Serializable form of a field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    /// Defaults to the key when omitted
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(rename = "type", alias = "as")]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Rule chain, e.g. ".min(5).email()"
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "zodRules")]
    pub rules: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FieldConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}
