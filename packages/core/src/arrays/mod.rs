//! Array Shape Resolution
//!
//! Default arrays on array-owning nodes are sized from a base shape, taken in
//! priority order from:
//!
//! 1. an override stored on the node (`ObjectNode::set_default_shape`)
//! 2. the node's primary array, read through the field resolver
//! 3. the configured default shape, or the testing shape when
//!    `RuntimeConfig::use_testing_shape` is set
//!
//! The secondary field's [`ShapeRule`] then derives its own shape. The
//! resolution itself lives with the field resolver, which owns the storage
//! borrow needed to read the primary.

mod shape;

pub use shape::{trailing, ArrayLayout, ShapeRule, AMP33_GROUPS, AMP33_WIDTH, BORDER_WIDTH};
