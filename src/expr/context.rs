// SPDX-License-Identifier: MIT

//! Variable context for expression evaluation
//!
//! Values live in a nested `serde_json::Value` tree keyed by dotted names.
//! A key containing dots resolves identically whether it was stored flat or
//! as nested maps, so `ctx.get("Requirements.needsCustomTool")` works no
//! matter how the value arrived.

use serde_json::{Map, Value};

/// A mapping from dotted variable names to values.
///
/// Two contexts exist in practice: a *static* context built from declared
/// attribute defaults (used for previews) and a *runtime* context owned by
/// the execution engine (accumulated attribute values, current error count,
/// current active-state name).
#[derive(Debug, Clone, Default)]
pub struct VariableContext {
    fields: Map<String, Value>,
}

impl VariableContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Build a context from a JSON object; non-objects yield an empty context
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::new(),
        }
    }

    /// Set a value at a dotted path, creating intermediate objects.
    ///
    /// Existing non-object intermediates are replaced; the last writer wins.
    pub fn set(&mut self, path: &str, value: Value) {
        let mut parts = path.split('.').peekable();
        let mut current = &mut self.fields;

        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                current.insert(part.to_string(), value);
                return;
            }
            let entry = current
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(map) = entry else {
                return;
            };
            current = map;
        }
    }

    /// Resolve a dotted path.
    ///
    /// An exact flat key wins; otherwise the path is walked as nested maps.
    pub fn get(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.fields.get(path) {
            return Some(value);
        }

        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// True if the path resolves to any value, including an explicit null
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Convert the context to a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Iterate over the top-level field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }
}
