//! Construction-time checks for field trees and their dependencies

use std::collections::{HashMap, HashSet};

use super::condition::Condition;
use super::dependency::{Dependency, DependencyConfig, DependencyEffect, DependencyType};
use super::field::{Field, FieldConfig, FieldKind, FieldType};
use super::path::PropertyPath;
use crate::error::{ConfigurationError, ConfigurationErrorKind};
use crate::rules::RuleChain;

pub struct DefinitionValidator;

impl DefinitionValidator {
    /// Check every sibling level of the tree; returns all errors found
    pub fn validate(fields: &[Field]) -> Vec<ConfigurationError> {
        let mut errors = Vec::new();
        Self::validate_level(fields, &PropertyPath::root(), &mut errors);
        errors
    }

    fn validate_level(fields: &[Field], path: &PropertyPath, errors: &mut Vec<ConfigurationError>) {
        let mut seen_keys: HashMap<&str, usize> = HashMap::new();
        let mut seen_ids: HashMap<&str, usize> = HashMap::new();
        let sibling_keys: HashSet<&str> = fields.iter().map(|f| f.key.as_str()).collect();

        for (idx, field) in fields.iter().enumerate() {
            let field_path = path.push_property(&field.key);
            let mut push = |kind| errors.push(ConfigurationError::new(field_path.clone(), kind));

            if field.key.is_empty() {
                push(ConfigurationErrorKind::EmptyKey);
            } else if field.key.contains(|c: char| matches!(c, '.' | '[' | ']')) {
                push(ConfigurationErrorKind::InvalidKey(field.key.clone()));
            }

            if let Some(first) = seen_keys.insert(&field.key, idx) {
                push(ConfigurationErrorKind::DuplicateKey {
                    key: field.key.clone(),
                    first,
                    second: idx,
                });
            }

            if !field.id.is_empty() {
                if let Some(first) = seen_ids.insert(&field.id, idx) {
                    push(ConfigurationErrorKind::DuplicateId {
                        id: field.id.clone(),
                        first,
                        second: idx,
                    });
                }
            }

            match &field.kind {
                FieldKind::Select { options } | FieldKind::Radio { options } | FieldKind::Checkbox { options }
                    if options.is_empty() =>
                {
                    push(ConfigurationErrorKind::MissingOptions(field.field_type()));
                }
                FieldKind::Array {
                    children,
                    min_items,
                    max_items,
                } => {
                    if children.is_empty() {
                        push(ConfigurationErrorKind::MissingChildren);
                    }
                    if let (Some(min), Some(max)) = (min_items, max_items) {
                        if min > max {
                            push(ConfigurationErrorKind::InvalidItemBounds { min: *min, max: *max });
                        }
                    }
                }
                _ => {}
            }

            for dependency in &field.dependencies {
                for kind in Self::check_dependency(field, dependency, &sibling_keys) {
                    push(kind);
                }
            }

            // Children form their own sibling level; they cannot see ancestors
            if let Some(children) = field.children() {
                Self::validate_level(children, &field_path.push_wildcard(), errors);
            }
        }
    }

    fn check_dependency(
        target: &Field,
        dependency: &Dependency,
        sibling_keys: &HashSet<&str>,
    ) -> Vec<ConfigurationErrorKind> {
        let mut errors = Vec::new();
        let source = dependency.source_field.as_str();

        if source == target.key {
            errors.push(ConfigurationErrorKind::SelfDependency);
        } else if !sibling_keys.contains(source) {
            errors.push(ConfigurationErrorKind::DanglingSource(source.to_string()));
        }

        if let DependencyEffect::SetsOptions(options) = &dependency.effect {
            if !target.is_selectable() {
                errors.push(ConfigurationErrorKind::OptionsOnNonSelectable(target.field_type()));
            }
            if options.is_empty() {
                errors.push(ConfigurationErrorKind::EmptyDependencyOptions(source.to_string()));
            }
        }

        errors.extend(
            dependency
                .when
                .expression_errors()
                .into_iter()
                .map(ConfigurationErrorKind::InvalidExpression),
        );
        errors
    }

    /// Convert raw field configs into typed fields, recording shape errors that
    /// the typed tree cannot express (options on an input, children on a select)
    pub fn convert_fields(
        configs: &[FieldConfig],
        path: &PropertyPath,
        errors: &mut Vec<ConfigurationError>,
    ) -> Vec<Field> {
        configs
            .iter()
            .map(|config| Self::convert_field(config, path, errors))
            .collect()
    }

    fn convert_field(config: &FieldConfig, path: &PropertyPath, errors: &mut Vec<ConfigurationError>) -> Field {
        let field_path = path.push_property(&config.key);
        let field_type = config.field_type;
        let error = |kind| ConfigurationError::new(field_path.clone(), kind);

        if config.options.is_some() && !field_type.is_selectable() {
            errors.push(error(ConfigurationErrorKind::UnexpectedOptions(field_type)));
        }
        if config.children.is_some() && field_type != FieldType::Array {
            errors.push(error(ConfigurationErrorKind::UnexpectedChildren(field_type)));
        }
        if (config.min_items.is_some() || config.max_items.is_some()) && field_type != FieldType::Array {
            errors.push(error(ConfigurationErrorKind::UnexpectedItemBounds(field_type)));
        }

        let placeholder = config.placeholder.clone();
        let options = config.options.clone().unwrap_or_default();
        let kind = match field_type {
            FieldType::Input => FieldKind::Input { placeholder },
            FieldType::Textarea => FieldKind::Textarea { placeholder },
            FieldType::Date => FieldKind::Date { placeholder },
            FieldType::RangeDate => FieldKind::DateRange { placeholder },
            FieldType::Select => FieldKind::Select { options },
            FieldType::Radio => FieldKind::Radio { options },
            FieldType::Checkbox => FieldKind::Checkbox { options },
            FieldType::Switch => FieldKind::Switch,
            FieldType::Array => FieldKind::Array {
                children: Self::convert_fields(
                    config.children.as_deref().unwrap_or(&[]),
                    &field_path.push_wildcard(),
                    errors,
                ),
                min_items: config.min_items,
                max_items: config.max_items,
            },
        };

        let mut dependencies = Vec::with_capacity(config.dependencies.len());
        for dependency in &config.dependencies {
            match Self::convert_dependency(dependency) {
                Ok(d) => dependencies.push(d),
                Err(kind) => errors.push(error(kind)),
            }
        }

        Field {
            id: if config.id.is_empty() {
                config.key.clone()
            } else {
                config.id.clone()
            },
            key: config.key.clone(),
            label: config.label.clone(),
            description: config.description.clone(),
            required: config.required,
            rules: config.rules.clone().map(RuleChain::Chain),
            dependencies,
            kind,
        }
    }

    fn convert_dependency(config: &DependencyConfig) -> Result<Dependency, ConfigurationErrorKind> {
        let when = match (&config.when, &config.value) {
            (Some(when), _) => when.clone(),
            (None, Some(value)) => Condition::Equals(value.clone()),
            (None, None) => return Err(ConfigurationErrorKind::MissingCondition(config.source_field.clone())),
        };

        match config.dependency_type {
            DependencyType::Hides => {
                if config.options.is_some() {
                    return Err(ConfigurationErrorKind::UnexpectedDependencyOptions(
                        config.source_field.clone(),
                    ));
                }
                Ok(Dependency::hides(config.source_field.clone(), when))
            }
            DependencyType::SetsOptions => Ok(Dependency::sets_options(
                config.source_field.clone(),
                when,
                config.options.clone().unwrap_or_default(),
            )),
        }
    }
}
