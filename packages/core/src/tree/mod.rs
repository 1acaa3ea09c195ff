//! Tree serialization
//!
//! - `flush` fills missing fields before a node is written
//! - `unwrap` turns a node graph into plain containers (`to_tree`)
//! - `document` encodes and decodes the persisted JSON form
//! - `context` holds the per-thread encoding conventions

pub mod context;
pub mod document;
mod flush;
mod unwrap;

pub use context::{current_tree_context, with_tree_context, TimeFormat, TreeContext};
pub use document::{decode_value, encode_value, TreeDocument, TAG_KEY};
pub use flush::{flush_fields, FlushMode, FlushOptions};
pub use unwrap::unwrap_value;
