//! Object Nodes
//!
//! An [`ObjectNode`] owns exactly one string-keyed [`Mapping`] and an optional
//! node class. All mutation happens in place on that mapping; constructing a
//! node from a raw mapping moves it rather than copying it.
//!
//! # Access styles
//!
//! - **Raw**: `get` / `set` / `has` / `remove` touch storage only, never
//!   synthesise anything.
//! - **Resolved**: `get_or_init` reads through the field resolver, coercing
//!   stored raw values to the declared field type and caching defaults for
//!   declared fields that are absent.
//! - **Attribute**: `attr` / `set_attr` are the resolved forms keyed by
//!   attribute name, where a reserved-word field such as `type` is spelled
//!   `type_`.
//!
//! # Threading
//!
//! Resolution caches defaults and coerced values in storage, so
//! `get_or_init` takes `&mut self`. Nodes are not synchronised internally;
//! sharing one across threads needs the caller's own `Mutex`.

use crate::context::DataModels;
use crate::error::{NodeError, Result};
use crate::models::resolver::{resolve, FieldContext, FieldCoercion};
use crate::models::tag::attr_to_key;
use crate::models::value::{mapping_eq, Mapping, Value};
use crate::registry::ClassRef;

#[derive(Debug, Clone, Default)]
pub struct ObjectNode {
    class: Option<ClassRef>,
    storage: Mapping,
    shape_override: Option<Vec<usize>>,
}

impl ObjectNode {
    /// Empty untyped node
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty node of the given class
    pub fn with_class(class: ClassRef) -> Self {
        Self {
            class: Some(class),
            ..Self::default()
        }
    }

    /// Wrap an existing mapping without copying it
    pub fn from_mapping(storage: Mapping, class: Option<ClassRef>) -> Self {
        Self {
            class,
            storage,
            shape_override: None,
        }
    }

    /// Wrap a raw mapping or re-class an existing object node
    ///
    /// # Errors
    ///
    /// Returns `NodeError::TypeError` for anything that is not a mapping.
    pub fn from_value(value: Value, class: Option<ClassRef>) -> std::result::Result<Self, NodeError> {
        match value {
            Value::Mapping(storage) => Ok(Self::from_mapping(storage, class)),
            Value::Object(mut node) => {
                if class.is_some() {
                    node.class = class;
                }
                Ok(node)
            }
            other => Err(NodeError::type_error(format!(
                "cannot build an object node from {}",
                other.type_name()
            ))),
        }
    }

    pub fn class(&self) -> Option<&ClassRef> {
        self.class.as_ref()
    }

    /// Class name, or `None` for untyped nodes
    pub fn class_name(&self) -> Option<&str> {
        self.class.as_ref().map(|class| class.name())
    }

    pub fn is_tagged(&self) -> bool {
        self.class
            .as_ref()
            .map(|class| class.tag().is_some())
            .unwrap_or(false)
    }

    pub fn storage(&self) -> &Mapping {
        &self.storage
    }

    pub fn into_storage(self) -> Mapping {
        self.storage
    }

    // ------------------------------------------------------------------
    // Raw storage access
    // ------------------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.storage.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.storage.get_mut(key)
    }

    /// Store a value without validation, returning the previous one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.storage.insert(key.into(), value.into())
    }

    pub fn has(&self, key: &str) -> bool {
        self.storage.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.storage.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.storage.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.storage.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Independent copy; later writes to either node never reach the other
    pub fn copy(&self) -> Self {
        self.clone()
    }

    // ------------------------------------------------------------------
    // Resolved access
    // ------------------------------------------------------------------

    /// Read a field, synthesising and caching its default when absent
    ///
    /// A stored raw value is coerced to the declared field type once and
    /// re-stored. A stored field the class does not declare is returned
    /// as-is.
    ///
    /// # Errors
    ///
    /// - `NodeError::MissingField` when the name is neither stored nor declared
    /// - `NodeError::InvalidEnumValue` / `TypeError` when coercion fails
    /// - `ShapeError::NoDefaultShape` when an array default has no base shape
    pub fn get_or_init(&mut self, ctx: &DataModels, name: &str) -> Result<&mut Value> {
        let field = FieldContext::new(ctx, self.class.clone(), self.shape_override.clone());
        let coercion = field.coercion(name);
        resolve(&mut self.storage, name, &coercion, |storage| {
            field.make_default(storage, name)
        })
    }

    /// Store a value, coercing it to the declared field type first
    ///
    /// Enum fields reject literals outside the declared set; the node is
    /// unchanged on error.
    pub fn assign(&mut self, ctx: &DataModels, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let field = FieldContext::new(ctx, self.class.clone(), self.shape_override.clone());
        let coercion = field.coercion(name);

        let value = if coercion.needs_coercion(&value) {
            coercion.check(&value)?;
            coercion.wrap(value)
        } else {
            value
        };

        self.storage.insert(name.to_string(), value);
        Ok(())
    }

    /// Attribute-style read; `type_` reads the stored `type` field
    pub fn attr(&mut self, ctx: &DataModels, attr: &str) -> Result<&mut Value> {
        self.get_or_init(ctx, attr_to_key(attr))
    }

    /// Attribute-style write; `type_` writes the stored `type` field
    pub fn set_attr(&mut self, ctx: &DataModels, attr: &str, value: impl Into<Value>) -> Result<()> {
        self.assign(ctx, attr_to_key(attr), value)
    }

    // ------------------------------------------------------------------
    // Array shape override
    // ------------------------------------------------------------------

    /// Base shape used for default arrays on this node, ahead of the primary array
    pub fn set_default_shape(&mut self, shape: Option<Vec<usize>>) {
        self.shape_override = shape;
    }

    pub fn default_shape(&self) -> Option<&[usize]> {
        self.shape_override.as_deref()
    }
}

impl PartialEq for ObjectNode {
    fn eq(&self, other: &Self) -> bool {
        mapping_eq(&self.storage, &other.storage)
    }
}

impl From<Mapping> for ObjectNode {
    fn from(storage: Mapping) -> Self {
        Self::from_mapping(storage, None)
    }
}

#[cfg(test)]
#[path = "object_node_test.rs"]
mod object_node_test;
