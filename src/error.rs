//! Error types for form definitions, schema compilation and value snapshots

use thiserror::Error;

use crate::form::field::FieldType;
use crate::form::path::PropertyPath;

/// What is wrong with a single field or dependency in a definition tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationErrorKind {
    /// Field key is empty
    #[error("field key must not be empty")]
    EmptyKey,

    /// Field key contains path syntax (`.`, `[` or `]`)
    #[error("field key '{0}' must not contain '.', '[' or ']'")]
    InvalidKey(String),

    /// Two siblings share the same key
    #[error("duplicate key '{key}' (siblings at positions {first} and {second})")]
    DuplicateKey {
        key: String,
        first: usize,
        second: usize,
    },

    /// Two siblings share the same id
    #[error("duplicate id '{id}' (siblings at positions {first} and {second})")]
    DuplicateId {
        id: String,
        first: usize,
        second: usize,
    },

    /// Selectable field declared without options
    #[error("{0} field requires at least one option")]
    MissingOptions(FieldType),

    /// Array field declared without children
    #[error("array field requires at least one child field")]
    MissingChildren,

    /// Options supplied for a kind that cannot carry them
    #[error("{0} field cannot declare options")]
    UnexpectedOptions(FieldType),

    /// Children supplied for a non-array kind
    #[error("{0} field cannot declare children")]
    UnexpectedChildren(FieldType),

    /// Item-count bounds supplied for a non-array kind
    #[error("{0} field cannot declare item bounds")]
    UnexpectedItemBounds(FieldType),

    /// Array bounds are inverted
    #[error("min_items ({min}) is greater than max_items ({max})")]
    InvalidItemBounds { min: usize, max: usize },

    /// Dependency points at a key that is not a sibling
    #[error("dependency source '{0}' is not a sibling field")]
    DanglingSource(String),

    /// Dependency points at the field declaring it
    #[error("field cannot depend on itself")]
    SelfDependency,

    /// SETS_OPTIONS on a field without an option set
    #[error("SETS_OPTIONS dependency on non-selectable {0} field")]
    OptionsOnNonSelectable(FieldType),

    /// SETS_OPTIONS without replacement options
    #[error("SETS_OPTIONS dependency on '{0}' has no options")]
    EmptyDependencyOptions(String),

    /// HIDES dependency carrying an option list
    #[error("HIDES dependency on '{0}' cannot carry options")]
    UnexpectedDependencyOptions(String),

    /// Dependency declared without a predicate
    #[error("dependency on '{0}' needs a 'when' condition or a 'value'")]
    MissingCondition(String),

    /// Rhai expression failed to parse
    #[error("invalid condition expression: {0}")]
    InvalidExpression(String),

    /// Attribute that has no plain serializable form
    #[error("cannot serialize {0}")]
    NotSerializable(String),
}

/// A malformed field or dependency, located by its path in the tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {kind}")]
pub struct ConfigurationError {
    pub path: PropertyPath,
    pub kind: ConfigurationErrorKind,
}

impl ConfigurationError {
    pub fn new(path: PropertyPath, kind: ConfigurationErrorKind) -> Self {
        Self { path, kind }
    }
}

/// Every configuration error found while building one definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid form definition:\n{}", join_lines(.0))]
pub struct DefinitionError(pub Vec<ConfigurationError>);

impl DefinitionError {
    pub fn errors(&self) -> &[ConfigurationError] {
        &self.0
    }

    /// True if any error has the given kind
    pub fn contains(&self, kind: &ConfigurationErrorKind) -> bool {
        self.0.iter().any(|e| &e.kind == kind)
    }
}

/// A rule chain or option set that could not be compiled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct SchemaCompilationError {
    pub path: PropertyPath,
    pub message: String,
}

/// Every compilation failure for one definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema compilation failed:\n{}", join_lines(.0))]
pub struct CompileError(pub Vec<SchemaCompilationError>);

impl CompileError {
    pub fn errors(&self) -> &[SchemaCompilationError] {
        &self.0
    }
}

/// Errors raised when writing into a value snapshot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// Path cannot address a value (wildcard, index at root, or wrong container)
    #[error("cannot write to path '{0}'")]
    InvalidPath(String),

    /// Snapshot root must be an object
    #[error("form values must be a JSON object, got {0}")]
    InvalidRoot(&'static str),
}

/// Top-level error for loading and preparing forms
#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// File extension not recognised as a definition format
    #[error("unsupported definition format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Result type alias for form operations
pub type FormResult<T> = Result<T, FormError>;

fn join_lines<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("  - {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}
