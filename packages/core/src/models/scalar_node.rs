//! Enumeration and Tagged Scalar Nodes
//!
//! - [`EnumNode`] holds one literal from a closed set declared by a schema
//!   `enum`. It may carry a tagged class (a standalone enum tag) or none (an
//!   inline enum field).
//! - [`ScalarNode`] is a primitive (string, number, time) marked with a tag.

use crate::error::NodeError;
use crate::models::value::Value;
use crate::registry::{ClassRef, NodeKind, ScalarKind};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct EnumNode {
    class: Option<ClassRef>,
    field: String,
    literals: Vec<Value>,
    value: Box<Value>,
}

impl EnumNode {
    /// Enum value for `field`, validated against `literals`
    ///
    /// # Errors
    ///
    /// Returns `NodeError::InvalidEnumValue` when `value` is not one of the
    /// literals.
    pub fn new(field: impl Into<String>, literals: Vec<Value>, value: Value) -> Result<Self, NodeError> {
        let field = field.into();
        let value = unwrap_literal(value);
        check_literal(&field, &literals, &value)?;
        Ok(Self {
            class: None,
            field,
            literals,
            value: Box::new(value),
        })
    }

    /// Tagged enum whose literals come from the class's schema
    pub fn for_class(class: ClassRef, value: Value) -> Result<Self, NodeError> {
        let literals = class.enum_literals().to_vec();
        let mut node = Self::new(class.name().to_string(), literals, value)?;
        node.class = Some(class);
        Ok(node)
    }

    pub fn class(&self) -> Option<&ClassRef> {
        self.class.as_ref()
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class.as_ref().map(|class| class.name())
    }

    pub fn is_tagged(&self) -> bool {
        self.class
            .as_ref()
            .map(|class| class.tag().is_some())
            .unwrap_or(false)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        *self.value
    }

    /// Assemble a node from a literal already checked against `literals`
    pub(crate) fn from_checked(
        field: String,
        literals: Vec<Value>,
        value: Value,
        class: Option<ClassRef>,
    ) -> Self {
        Self {
            class,
            field,
            literals,
            value: Box::new(unwrap_literal(value)),
        }
    }

    pub fn literals(&self) -> &[Value] {
        &self.literals
    }

    /// Replace the value; the node is unchanged when the literal is rejected
    pub fn set(&mut self, value: impl Into<Value>) -> Result<(), NodeError> {
        let value = unwrap_literal(value.into());
        check_literal(&self.field, &self.literals, &value)?;
        *self.value = value;
        Ok(())
    }
}

impl PartialEq for EnumNode {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

fn unwrap_literal(value: Value) -> Value {
    match value {
        Value::Enum(node) => node.into_value(),
        Value::Scalar(node) => node.into_value(),
        other => other,
    }
}

pub(crate) fn check_literal(field: &str, literals: &[Value], value: &Value) -> Result<(), NodeError> {
    if literals.iter().any(|literal| literal == value) {
        Ok(())
    } else {
        Err(NodeError::invalid_enum_value(field, value.to_string(), literals))
    }
}

#[derive(Debug, Clone)]
pub struct ScalarNode {
    class: ClassRef,
    value: Box<Value>,
}

impl ScalarNode {
    /// Tagged scalar of a scalar-kind class
    ///
    /// Integers are widened for float scalars and RFC 3339 strings are parsed
    /// for time scalars.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::TypeError` when the class is not a scalar class or
    /// the value does not fit its primitive type.
    pub fn new(class: ClassRef, value: Value) -> Result<Self, NodeError> {
        if class.kind() != NodeKind::Scalar {
            return Err(NodeError::type_error(format!(
                "class {} is not a scalar class",
                class.name()
            )));
        }
        let value = coerce_primitive(class.scalar_kind(), unwrap_literal(value)).map_err(|raw| {
            NodeError::type_error(format!(
                "scalar {} cannot hold a {} value",
                class.name(),
                raw.type_name()
            ))
        })?;
        Ok(Self {
            class,
            value: Box::new(value),
        })
    }

    /// Assemble a node from a value already converted by `coerce_primitive`
    pub(crate) fn from_checked(class: ClassRef, value: Value) -> Self {
        Self {
            class,
            value: Box::new(value),
        }
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        *self.value
    }
}

impl PartialEq for ScalarNode {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// Convert a raw primitive to the scalar kind, handing the value back on mismatch
pub(crate) fn coerce_primitive(kind: Option<ScalarKind>, value: Value) -> Result<Value, Value> {
    match (kind, value) {
        (Some(ScalarKind::Str), Value::Str(s)) => Ok(Value::Str(s)),
        (Some(ScalarKind::Int), Value::Int(i)) => Ok(Value::Int(i)),
        (Some(ScalarKind::Float), Value::Float(x)) => Ok(Value::Float(x)),
        (Some(ScalarKind::Float), Value::Int(i)) => Ok(Value::Float(i as f64)),
        (Some(ScalarKind::Time), Value::Time(t)) => Ok(Value::Time(t)),
        (Some(ScalarKind::Time), Value::Str(s)) => match DateTime::parse_from_rfc3339(&s) {
            Ok(t) => Ok(Value::Time(t.with_timezone(&Utc))),
            Err(_) => Err(Value::Str(s)),
        },
        (None, value) if value.is_primitive() => Ok(value),
        (_, value) => Err(value),
    }
}
