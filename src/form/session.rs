//! Form session: current values plus a memoized evaluation

use std::sync::Arc;

use serde_json::Value;

use super::compiler::{FormSchema, ValidationReport};
use super::definition::FormDefinition;
use super::evaluator::{evaluate, Evaluation};
use super::path::PropertyPath;
use super::snapshot::ValueSnapshot;
use crate::error::SnapshotError;

/// Live state of one form being filled in
///
/// The evaluation is recomputed once per settled change: after each
/// [`FormSession::set_value`], or once at the end of a [`FormSession::batch`].
#[derive(Debug, Clone)]
pub struct FormSession {
    definition: Arc<FormDefinition>,
    snapshot: ValueSnapshot,
    evaluation: Evaluation,
    evaluated_version: u64,
}

impl FormSession {
    pub fn new(definition: impl Into<Arc<FormDefinition>>) -> Self {
        Self::with_snapshot(definition, ValueSnapshot::new())
    }

    pub fn with_snapshot(definition: impl Into<Arc<FormDefinition>>, snapshot: ValueSnapshot) -> Self {
        let definition = definition.into();
        let evaluation = evaluate(&definition, snapshot.as_value());
        let evaluated_version = snapshot.version();
        Self {
            definition,
            snapshot,
            evaluation,
            evaluated_version,
        }
    }

    pub fn definition(&self) -> &Arc<FormDefinition> {
        &self.definition
    }

    pub fn snapshot(&self) -> &ValueSnapshot {
        &self.snapshot
    }

    pub fn values(&self) -> &Value {
        self.snapshot.as_value()
    }

    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }

    /// Version of the snapshot the current evaluation was computed from
    pub fn evaluated_version(&self) -> u64 {
        self.evaluated_version
    }

    /// Apply one change and re-evaluate
    pub fn set_value(&mut self, path: impl Into<PropertyPath>, value: Value) -> Result<&Evaluation, SnapshotError> {
        self.snapshot.set(&path.into(), value)?;
        Ok(self.refresh())
    }

    /// Remove one value and re-evaluate
    pub fn remove_value(&mut self, path: impl Into<PropertyPath>) -> Option<Value> {
        let removed = self.snapshot.remove(&path.into());
        self.refresh();
        removed
    }

    /// Apply several changes, evaluating once after all of them
    ///
    /// Changes made before an error are kept, and the evaluation is refreshed
    /// either way.
    pub fn batch<R>(
        &mut self,
        update: impl FnOnce(&mut ValueSnapshot) -> Result<R, SnapshotError>,
    ) -> Result<R, SnapshotError> {
        let result = update(&mut self.snapshot);
        self.refresh();
        result
    }

    /// Drop the values of hidden fields, then re-evaluate
    pub fn clear_hidden(&mut self) -> usize {
        let cleared = self.snapshot.clear_hidden(&self.evaluation);
        self.refresh();
        cleared
    }

    /// Validate the current values with the current evaluation
    pub fn submit(&self, schema: &FormSchema) -> ValidationReport {
        schema.validate_with(self.snapshot.as_value(), &self.evaluation)
    }

    fn refresh(&mut self) -> &Evaluation {
        if self.snapshot.version() != self.evaluated_version {
            self.evaluation = evaluate(&self.definition, self.snapshot.as_value());
            self.evaluated_version = self.snapshot.version();
            tracing::debug!(version = self.evaluated_version, "re-evaluated form");
        }
        &self.evaluation
    }
}
