//! Scalar variable value tracking.
//!
//! Records declared and assigned variables by name and keeps the last known
//! value of each so that pointer-dereference notifications can be resolved
//! against it later. Assignments are never suppressed: to a step-by-step
//! visualizer a rewrite of an unchanged value is still a step.

use std::collections::HashMap;

use crate::event::TracedValue;

/// Last known state of one scalar variable.
#[derive(Debug, Clone)]
pub struct VariableRecord {
    /// Variable name.
    pub name: String,
    /// Last known value; `Null` until the first assignment.
    pub value: TracedValue,
    /// Declared type, when a declare notification was seen.
    pub var_type: Option<String>,
    /// Call depth of the declaring frame.
    pub depth: u32,
}

/// Registry of scalar variables keyed by name.
///
/// No internal synchronization; mutation happens only under the recorder's
/// critical section.
#[derive(Debug, Default)]
pub struct VariableTracker {
    records: HashMap<String, VariableRecord>,
}

impl VariableTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        VariableTracker::default()
    }

    /// Registers a declaration with a null value and the reported type.
    pub fn declare(&mut self, name: &str, var_type: &str, depth: u32) {
        self.records.insert(
            name.to_string(),
            VariableRecord {
                name: name.to_string(),
                value: TracedValue::Null,
                var_type: Some(var_type.to_string()),
                depth,
            },
        );
    }

    /// Overwrites the last known value unconditionally.
    ///
    /// A variable assigned without a prior declare notification (partially
    /// instrumented source) is registered on the fly with an unknown type.
    pub fn assign(&mut self, name: &str, value: TracedValue, depth: u32) {
        self.records
            .entry(name.to_string())
            .and_modify(|record| record.value = value.clone())
            .or_insert_with(|| VariableRecord {
                name: name.to_string(),
                value,
                var_type: None,
                depth,
            });
    }

    /// Last known record for a variable, if any notification mentioned it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&VariableRecord> {
        self.records.get(name)
    }

    /// Number of distinct variables seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no variable has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
