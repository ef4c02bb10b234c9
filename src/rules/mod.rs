//! Field validators and the adapters that build them from rule-chain strings
//!
//! The compiler never interprets rule chains itself. It hands each chain to a
//! [`ValidatorAdapter`], which returns an opaque [`FieldValidator`]. The
//! [`ChainAdapter`] understands zod-style chains such as `.min(2).email()`;
//! callers with their own rule syntax plug in a different adapter.

pub mod chain;

pub use chain::ChainAdapter;

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Checks one field value
pub trait FieldValidator: fmt::Debug + Send + Sync {
    /// Validate a value; `None` means the field is absent from the submission
    fn validate(&self, value: Option<&Value>) -> Result<(), Vec<String>>;

    /// True if this validator already rejects absent values
    fn enforces_presence(&self) -> bool {
        false
    }
}

/// Compiles a rule-chain string into a validator
pub trait ValidatorAdapter: Send + Sync {
    fn compile(&self, chain: &str) -> Result<Arc<dyn FieldValidator>, String>;
}

/// Validation rules attached to a field
#[derive(Clone, Debug)]
pub enum RuleChain {
    /// Rule-chain string compiled by the adapter, e.g. ".min(5).email()"
    Chain(String),
    /// Ready-made validator; cannot be written back to a definition file
    Prebuilt(Arc<dyn FieldValidator>),
}

impl RuleChain {
    pub fn prebuilt(validator: impl FieldValidator + 'static) -> Self {
        Self::Prebuilt(Arc::new(validator))
    }
}

impl PartialEq for RuleChain {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Chain(a), Self::Chain(b)) => a == b,
            (Self::Prebuilt(a), Self::Prebuilt(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for RuleChain {
    fn from(chain: &str) -> Self {
        Self::Chain(chain.to_string())
    }
}

impl From<String> for RuleChain {
    fn from(chain: String) -> Self {
        Self::Chain(chain)
    }
}

/// Rejects absent, null, blank-string and empty-list values
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl FieldValidator for Required {
    fn validate(&self, value: Option<&Value>) -> Result<(), Vec<String>> {
        if is_blank(value) {
            Err(vec!["Required".to_string()])
        } else {
            Ok(())
        }
    }

    fn enforces_presence(&self) -> bool {
        true
    }
}

/// Absent, null, "" and [] all count as not filled in, as does an object
/// (a date range) with no filled-in member
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(members)) => members.values().all(|v| is_blank(Some(v))),
        Some(_) => false,
    }
}
