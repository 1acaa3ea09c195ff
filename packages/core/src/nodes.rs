//! Typed Nodes
//!
//! `build.rs` emits one struct per class declared in the bundled manifest
//! (tagged and implied). Each wraps the matching node type and dereferences
//! to it, so typed code keeps the full node API:
//!
//! ```rust,ignore
//! let mut image = Image::create(&ctx)?;
//! image.get_or_init(&ctx, "dq")?;
//! let node: ObjectNode = image.into_node();
//! ```

use crate::context::DataModels;
use crate::error::{NodeError, Result};
use crate::models::{EnumNode, ListNode, ObjectNode, ScalarNode, Value};

/// Node types a typed wrapper can hold
pub trait NodeHandle: Sized {
    fn class_name(&self) -> Option<&str>;

    /// Extract this node type from a value
    fn from_value(value: Value) -> Result<Self>;
}

impl NodeHandle for ObjectNode {
    fn class_name(&self) -> Option<&str> {
        ObjectNode::class_name(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(ObjectNode::from_value(value, None)?)
    }
}

impl NodeHandle for ListNode {
    fn class_name(&self) -> Option<&str> {
        ListNode::class_name(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(ListNode::from_value(value, None)?)
    }
}

impl NodeHandle for EnumNode {
    fn class_name(&self) -> Option<&str> {
        EnumNode::class_name(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Enum(node) => Ok(node),
            other => Err(NodeError::type_error(format!(
                "expected an enum node, got {}",
                other.type_name()
            ))
            .into()),
        }
    }
}

impl NodeHandle for ScalarNode {
    fn class_name(&self) -> Option<&str> {
        Some(ScalarNode::class_name(self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Scalar(node) => Ok(node),
            other => Err(NodeError::type_error(format!(
                "expected a scalar node, got {}",
                other.type_name()
            ))
            .into()),
        }
    }
}

/// Statically named wrapper around a node of one class
pub trait TypedNode: Sized {
    type Node: NodeHandle;

    const CLASS_NAME: &'static str;

    /// Current tag, `None` for implied classes
    const TAG: Option<&'static str>;

    fn wrap(node: Self::Node) -> Self;

    fn as_node(&self) -> &Self::Node;

    fn as_node_mut(&mut self) -> &mut Self::Node;

    fn into_node(self) -> Self::Node;

    /// Wrap a node after checking its class
    ///
    /// # Errors
    ///
    /// Returns `NodeError::TypeError` when the node belongs to another class
    /// or to none.
    fn from_node(node: Self::Node) -> Result<Self> {
        match node.class_name() {
            Some(name) if name == Self::CLASS_NAME => Ok(Self::wrap(node)),
            other => Err(NodeError::type_error(format!(
                "expected a {} node, got {}",
                Self::CLASS_NAME,
                other.unwrap_or("an untyped node")
            ))
            .into()),
        }
    }

    /// Fresh instance from the context's registry
    fn create(ctx: &DataModels) -> Result<Self> {
        let class = ctx.registry().class(Self::CLASS_NAME)?;
        let node = Self::Node::from_value(ctx.instantiate(&class)?)?;
        Ok(Self::wrap(node))
    }
}

include!(concat!(env!("OUT_DIR"), "/generated_nodes.rs"));
