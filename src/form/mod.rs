//! Form definitions, dependency evaluation and schema compilation

pub mod compiler;
pub mod condition;
pub mod definition;
pub mod dependency;
pub mod evaluator;
pub mod field;
pub mod path;
pub mod session;
pub mod shape;
pub mod snapshot;
pub mod validator;

pub use compiler::{compile, CompileOptions, FormSchema, HiddenFieldPolicy, ValidationIssue, ValidationReport};
pub use condition::Condition;
pub use definition::{find_field, list_fields, FormConfig, FormDefinition, Step, StepConfig};
pub use dependency::{Dependency, DependencyConfig, DependencyEffect, DependencyType};
pub use evaluator::{evaluate, Evaluation};
pub use field::{is_array_field, options, Field, FieldConfig, FieldKind, FieldOption, FieldType};
pub use path::{PathSegment, PropertyPath};
pub use session::FormSession;
pub use shape::{ShapeType, ValueShape};
pub use snapshot::ValueSnapshot;
