//! Node Storage
//!
//! This module contains the tree data structures every data model is built
//! from:
//!
//! - [`Value`] - element type of node containers (plain values, leaves, nodes)
//! - [`ObjectNode`] - mapping-backed node with lazy field resolution
//! - [`ListNode`] - sequence-backed node
//! - [`EnumNode`] / [`ScalarNode`] - closed-set and tagged primitive nodes
//! - [`TagId`] - parsed `<namespace>/<name>-<version>` tags
//!
//! Nodes own their container outright. Wrapping a raw mapping or sequence
//! moves it; nothing in this module copies storage behind the caller's back.

mod list_node;
mod object_node;
pub mod resolver;
mod scalar_node;
pub mod tag;
mod value;

pub use list_node::ListNode;
pub use object_node::ObjectNode;
pub use resolver::{default_time, resolve, FieldCoercion, NoCoercion};
pub use scalar_node::{EnumNode, ScalarNode};
pub use tag::{attr_to_key, key_to_attr, TagId, LEAF_NAMESPACE};
pub use value::{ArrayData, DType, Mapping, NdArray, Quantity, Value, NONUM, NOSTR};
