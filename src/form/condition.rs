//! Dependency predicates
//!
//! A [`Condition`] decides whether a dependency fires. It observes the source
//! field's current value and, for SETS_OPTIONS, the target field's value.
//! Absent values (missing key or `null`) are passed as `None` and are never
//! coerced to a default.
//!
//! Conditions are plain data so definitions stay serializable:
//!
//! ```yaml
//! when: { notEquals: US }
//! when: { any: [ { equals: CA }, absent ] }
//! when: { expr: 'source != "US" && target == ()' }
//! ```
//!
//! `expr` conditions are Rhai expressions with `source` and `target` in scope
//! (absent values are `()`). They are compiled when the condition is built and
//! checked when the definition is validated.

use rhai::{Dynamic, Engine as RhaiEngine, Scope, AST};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Custom predicate over (source value, target value)
pub type PredicateFn = dyn Fn(Option<&Value>, Option<&Value>) -> bool + Send + Sync;

/// Predicate for a dependency
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    /// Source equals the value
    Equals(Value),
    /// Source is absent or differs from the value
    NotEquals(Value),
    /// Source equals one of the values
    OneOf(Vec<Value>),
    /// Source is absent or equals none of the values
    NoneOf(Vec<Value>),
    /// Source is an array (checkbox) containing the value
    Contains(Value),
    /// Source has a non-null value
    Present,
    /// Source is missing or null
    Absent,
    /// Source is not absent, false, 0, "" or []
    Truthy,
    /// Negation of `truthy`
    Falsy,
    /// Every condition holds
    All(Vec<Condition>),
    /// At least one condition holds
    Any(Vec<Condition>),
    /// Condition does not hold
    Not(Box<Condition>),
    /// Apply the inner condition to the target field's value instead of the source
    Target(Box<Condition>),
    /// Rhai expression over `source` and `target`
    Expr(#[schemars(with = "String")] Expression),
    /// Native closure; cannot be serialized
    #[serde(skip)]
    Custom(Predicate),
}

impl Condition {
    pub fn equals(value: impl Into<Value>) -> Self {
        Self::Equals(value.into())
    }

    pub fn not_equals(value: impl Into<Value>) -> Self {
        Self::NotEquals(value.into())
    }

    pub fn expr(source: impl Into<String>) -> Self {
        Self::Expr(Expression::new(source))
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>, Option<&Value>) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Predicate(Arc::new(f)))
    }

    /// Evaluate against the source value and the target's current value
    pub fn matches(&self, source: Option<&Value>, target: Option<&Value>) -> bool {
        let source = present(source);
        let target = present(target);
        match self {
            Self::Equals(expected) => source == Some(expected),
            Self::NotEquals(expected) => source != Some(expected),
            Self::OneOf(values) => source.is_some_and(|v| values.contains(v)),
            Self::NoneOf(values) => !source.is_some_and(|v| values.contains(v)),
            Self::Contains(expected) => source
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(expected)),
            Self::Present => source.is_some(),
            Self::Absent => source.is_none(),
            Self::Truthy => is_truthy(source),
            Self::Falsy => !is_truthy(source),
            Self::All(conditions) => conditions.iter().all(|c| c.matches(source, target)),
            Self::Any(conditions) => conditions.iter().any(|c| c.matches(source, target)),
            Self::Not(condition) => !condition.matches(source, target),
            Self::Target(condition) => condition.matches(target, target),
            Self::Expr(expression) => expression.eval(source, target),
            Self::Custom(predicate) => (predicate.0)(source, target),
        }
    }

    /// Collect compile errors of every expression in this condition
    pub fn expression_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        self.collect_expression_errors(&mut errors);
        errors
    }

    fn collect_expression_errors(&self, errors: &mut Vec<String>) {
        match self {
            Self::Expr(expression) => {
                if let Err(e) = &expression.compiled {
                    errors.push(format!("'{}': {}", expression.source, e));
                }
            }
            Self::All(conditions) | Self::Any(conditions) => {
                for c in conditions {
                    c.collect_expression_errors(errors);
                }
            }
            Self::Not(c) | Self::Target(c) => c.collect_expression_errors(errors),
            _ => {}
        }
    }

    /// True if this condition (or a nested one) is a native closure
    pub fn is_custom(&self) -> bool {
        match self {
            Self::Custom(_) => true,
            Self::All(conditions) | Self::Any(conditions) => conditions.iter().any(Self::is_custom),
            Self::Not(c) | Self::Target(c) => c.is_custom(),
            _ => false,
        }
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(_)) => true,
    }
}

/// Shared closure wrapper so conditions stay `Clone + Debug`
#[derive(Clone)]
pub struct Predicate(pub Arc<PredicateFn>);

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(<closure>)")
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// ============================================================================
// Rhai Expressions
// ============================================================================

fn rhai_engine() -> &'static RhaiEngine {
    static ENGINE: OnceLock<RhaiEngine> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let mut engine = RhaiEngine::new();
        engine.set_max_expr_depths(64, 64);
        engine
    })
}

/// A Rhai expression compiled once at construction
#[derive(Clone)]
pub struct Expression {
    source: String,
    compiled: Result<Arc<AST>, String>,
}

impl Expression {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = rhai_engine()
            .compile_expression(&source)
            .map(Arc::new)
            .map_err(|e| e.to_string());
        Self { source, compiled }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_valid(&self) -> bool {
        self.compiled.is_ok()
    }

    /// Runtime failures and non-boolean results count as "does not match"
    fn eval(&self, source: Option<&Value>, target: Option<&Value>) -> bool {
        let Ok(ast) = &self.compiled else {
            return false;
        };
        let mut scope = Scope::new();
        scope.push("source", source.map(json_to_dynamic).unwrap_or(Dynamic::UNIT));
        scope.push("target", target.map(json_to_dynamic).unwrap_or(Dynamic::UNIT));

        match rhai_engine().eval_ast_with_scope::<Dynamic>(&mut scope, ast) {
            Ok(result) => match result.as_bool() {
                Ok(b) => b,
                Err(type_name) => {
                    tracing::warn!(expr = %self.source, result = type_name, "condition did not evaluate to a boolean");
                    false
                }
            },
            Err(e) => {
                tracing::warn!(expr = %self.source, error = %e, "condition evaluation failed");
                false
            }
        }
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expression").field(&self.source).finish()
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Expression::new)
    }
}

/// Convert JSON Value to Rhai Dynamic
fn json_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else if let Some(f) = n.as_f64() {
                Dynamic::from(f)
            } else {
                Dynamic::UNIT
            }
        }
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(arr) => {
            let vec: Vec<Dynamic> = arr.iter().map(json_to_dynamic).collect();
            Dynamic::from(vec)
        }
        Value::Object(obj) => {
            let map: rhai::Map = obj
                .iter()
                .map(|(k, v)| (k.clone().into(), json_to_dynamic(v)))
                .collect();
            Dynamic::from(map)
        }
    }
}
