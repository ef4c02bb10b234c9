//! # Formwork - dynamic form engine
//!
//! Formwork describes forms as trees of typed fields with reactive
//! dependencies between siblings, and turns those descriptions into
//! validators and value shapes.
//!
//! ## Features
//!
//! - **Field model**: input, textarea, select, checkbox, switch, radio, date,
//!   date range and nested array-of-object fields, validated at construction
//! - **Dependencies**: HIDES and SETS_OPTIONS rules with serializable conditions
//!   (including Rhai expressions)
//! - **Schema compiler**: composed validator plus a value shape exportable as JSON Schema
//! - **Evaluator**: pure computation of hidden fields and active options
//! - **Definition files**: JSON, YAML and TOML
//!
//! ## Quick Start
//!
//! ```rust
//! use formwork::form::{compile, evaluate, options, CompileOptions, Condition, Dependency, Field, FormDefinition};
//! use formwork::rules::ChainAdapter;
//! use serde_json::json;
//!
//! let definition = FormDefinition::new(vec![
//!     Field::select("country", options([("United States", "US"), ("Canada", "CA")])),
//!     Field::input("state")
//!         .required(true)
//!         .dependency(Dependency::hides("country", Condition::not_equals("US"))),
//! ])?;
//!
//! let values = json!({ "country": "CA" });
//! assert!(evaluate(&definition, &values).hidden("state"));
//!
//! let schema = compile(definition, &ChainAdapter, CompileOptions::default())?;
//! assert!(!schema.validate(&values).is_valid());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod form;
pub mod rules;
pub mod theme;

pub use error::{
    CompileError, ConfigurationError, ConfigurationErrorKind, DefinitionError, FormError, FormResult,
    SchemaCompilationError, SnapshotError,
};
