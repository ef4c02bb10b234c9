//! Dependencies between sibling fields

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::condition::Condition;
use super::field::FieldOption;

/// Kind of a dependency, as written in definitions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyType {
    /// Source value decides whether the target is hidden
    Hides,
    /// Source value (and target value) decide whether the options are replaced
    SetsOptions,
}

/// What a firing dependency does to its target
#[derive(Clone, Debug, PartialEq)]
pub enum DependencyEffect {
    Hides,
    SetsOptions(Vec<FieldOption>),
}

/// A rule linking a target field (the one declaring it) to a sibling source field
#[derive(Clone, Debug, PartialEq)]
pub struct Dependency {
    pub source_field: String,
    pub effect: DependencyEffect,
    pub when: Condition,
}

impl Dependency {
    /// Hide the target while `when` holds for the source value
    pub fn hides(source_field: impl Into<String>, when: Condition) -> Self {
        Self {
            source_field: source_field.into(),
            effect: DependencyEffect::Hides,
            when,
        }
    }

    /// Replace the target's options while `when` holds for (source, target)
    pub fn sets_options(
        source_field: impl Into<String>,
        when: Condition,
        options: Vec<FieldOption>,
    ) -> Self {
        Self {
            source_field: source_field.into(),
            effect: DependencyEffect::SetsOptions(options),
            when,
        }
    }

    pub fn dependency_type(&self) -> DependencyType {
        match self.effect {
            DependencyEffect::Hides => DependencyType::Hides,
            DependencyEffect::SetsOptions(_) => DependencyType::SetsOptions,
        }
    }

    /// Replacement options for SETS_OPTIONS dependencies
    pub fn options(&self) -> Option<&[FieldOption]> {
        match &self.effect {
            DependencyEffect::Hides => None,
            DependencyEffect::SetsOptions(options) => Some(options),
        }
    }
}

/// Serializable form of a dependency
///
/// `value` is shorthand for `when: { equals: value }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyConfig {
    pub source_field: String,
    #[serde(rename = "type")]
    pub dependency_type: DependencyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
}

impl From<&Dependency> for DependencyConfig {
    fn from(dependency: &Dependency) -> Self {
        Self {
            source_field: dependency.source_field.clone(),
            dependency_type: dependency.dependency_type(),
            when: Some(dependency.when.clone()),
            value: None,
            options: dependency.options().map(<[FieldOption]>::to_vec),
        }
    }
}
