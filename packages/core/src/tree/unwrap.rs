//! Unwrapping
//!
//! `to_tree` turns a node graph into the plain mapping/sequence form handed
//! to the document writer. Tagged nodes are left as nodes (the writer
//! dispatches them by tag); every other node is replaced by the container or
//! literal it wraps. The source node is only read, never changed.

use crate::models::{Mapping, ObjectNode, Value};

impl ObjectNode {
    /// Structural copy of storage with untagged nodes unwrapped
    pub fn to_tree(&self) -> Mapping {
        unwrap_mapping(self.storage())
    }
}

/// Unwrap one value
pub fn unwrap_value(value: &Value) -> Value {
    if value.is_tagged() {
        return value.clone();
    }
    match value {
        Value::Object(node) => Value::Mapping(unwrap_mapping(node.storage())),
        Value::Mapping(map) => Value::Mapping(unwrap_mapping(map)),
        Value::List(list) => Value::Sequence(list.iter().map(unwrap_value).collect()),
        Value::Sequence(items) => Value::Sequence(items.iter().map(unwrap_value).collect()),
        Value::Enum(node) => node.value().clone(),
        leaf => leaf.clone(),
    }
}

fn unwrap_mapping(map: &Mapping) -> Mapping {
    map.iter()
        .map(|(key, value)| (key.clone(), unwrap_value(value)))
        .collect()
}
