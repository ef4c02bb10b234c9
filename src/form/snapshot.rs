//! Versioned value snapshot
//!
//! In-memory data object keyed by field key, with path-based reads and
//! writes. Every successful write bumps the version.

use serde_json::{Map, Value};

use super::evaluator::Evaluation;
use super::path::{PathSegment, PropertyPath};
use crate::error::SnapshotError;

/// Current form values and a monotonic version counter
#[derive(Clone, Debug, PartialEq)]
pub struct ValueSnapshot {
    version: u64,
    values: Value,
}

impl Default for ValueSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueSnapshot {
    pub fn new() -> Self {
        Self {
            version: 0,
            values: Value::Object(Map::new()),
        }
    }

    /// Wrap existing values; the root must be an object
    pub fn from_value(values: Value) -> Result<Self, SnapshotError> {
        if !values.is_object() {
            return Err(SnapshotError::InvalidRoot(json_type(&values)));
        }
        Ok(Self { version: 0, values })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn as_value(&self) -> &Value {
        &self.values
    }

    pub fn into_value(self) -> Value {
        self.values
    }

    /// Value at a concrete path; wildcards never match
    pub fn get(&self, path: &PropertyPath) -> Option<&Value> {
        path.segments().try_fold(&self.values, |current, segment| match segment {
            PathSegment::Property(key) => current.as_object()?.get(key),
            PathSegment::Index(idx) => current.as_array()?.get(*idx),
            PathSegment::ArrayWildcard => None,
        })
    }

    /// Write a value, creating intermediate objects and array slots (filled with
    /// empty objects). Fails without modifying anything if an existing value on
    /// the way has the wrong container type.
    pub fn set(&mut self, path: &PropertyPath, value: Value) -> Result<(), SnapshotError> {
        self.check_writable(path)?;
        let slot = Self::slot(&mut self.values, path, &path.to_string())?;
        *slot = value;
        self.version += 1;
        tracing::trace!(path = %path, version = self.version, "value set");
        Ok(())
    }

    /// Remove a value; removing an array index shifts the following items.
    /// Returns the removed value, if any.
    pub fn remove(&mut self, path: &PropertyPath) -> Option<Value> {
        let last = path.last()?.clone();
        let parent_path = path.parent();
        let removed = match (self.get_mut(&parent_path)?, last) {
            (Value::Object(map), PathSegment::Property(key)) => map.remove(&key),
            (Value::Array(items), PathSegment::Index(idx)) if idx < items.len() => Some(items.remove(idx)),
            _ => None,
        };
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    /// Drop the values of every hidden field
    ///
    /// Evaluation never clears values on its own; callers opt in here.
    /// Returns the number of values removed.
    pub fn clear_hidden(&mut self, evaluation: &Evaluation) -> usize {
        let mut paths: Vec<&PropertyPath> = evaluation.hidden_paths().collect();
        paths.sort_by(|a, b| b.cmp(a));

        let mut cleared = 0;
        for path in paths {
            let (Some(PathSegment::Property(key)), Some(Value::Object(map))) =
                (path.last(), Self::get_mut_in(&mut self.values, &path.parent()))
            else {
                continue;
            };
            if map.remove(key).is_some() {
                cleared += 1;
            }
        }
        if cleared > 0 {
            self.version += 1;
            tracing::debug!(cleared, version = self.version, "cleared hidden values");
        }
        cleared
    }

    fn get_mut(&mut self, path: &PropertyPath) -> Option<&mut Value> {
        Self::get_mut_in(&mut self.values, path)
    }

    fn get_mut_in<'a>(root: &'a mut Value, path: &PropertyPath) -> Option<&'a mut Value> {
        path.segments().try_fold(root, |current, segment| match segment {
            PathSegment::Property(key) => current.as_object_mut()?.get_mut(key),
            PathSegment::Index(idx) => current.as_array_mut()?.get_mut(*idx),
            PathSegment::ArrayWildcard => None,
        })
    }

    fn check_writable(&self, path: &PropertyPath) -> Result<(), SnapshotError> {
        let invalid = || SnapshotError::InvalidPath(path.to_string());
        if path.is_root() {
            return Err(invalid());
        }
        let mut current = Some(&self.values);
        for segment in path.segments() {
            current = match (segment, current) {
                (PathSegment::ArrayWildcard, _) => return Err(invalid()),
                // Missing or null containers are created on write
                (_, None | Some(Value::Null)) => None,
                (PathSegment::Property(key), Some(Value::Object(map))) => map.get(key),
                (PathSegment::Index(idx), Some(Value::Array(items))) => items.get(*idx),
                _ => return Err(invalid()),
            };
        }
        Ok(())
    }

    fn slot<'a>(root: &'a mut Value, path: &PropertyPath, display: &str) -> Result<&'a mut Value, SnapshotError> {
        let mut current = root;
        for segment in path.segments() {
            current = match segment {
                PathSegment::Property(key) => {
                    if current.is_null() {
                        *current = Value::Object(Map::new());
                    }
                    let map = current
                        .as_object_mut()
                        .ok_or_else(|| SnapshotError::InvalidPath(display.to_string()))?;
                    map.entry(key.clone()).or_insert(Value::Null)
                }
                PathSegment::Index(idx) => {
                    if current.is_null() {
                        *current = Value::Array(Vec::new());
                    }
                    let items = current
                        .as_array_mut()
                        .ok_or_else(|| SnapshotError::InvalidPath(display.to_string()))?;
                    while items.len() <= *idx {
                        items.push(Value::Object(Map::new()));
                    }
                    &mut items[*idx]
                }
                PathSegment::ArrayWildcard => return Err(SnapshotError::InvalidPath(display.to_string())),
            };
        }
        Ok(current)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
