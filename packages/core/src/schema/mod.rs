//! Schema Documents and Bindings
//!
//! - [`SchemaSource`] - URI to parsed JSON document (memory, directory, chained)
//! - [`SchemaBinding`] - resolved field set of one schema (`$ref`, `allOf`,
//!   `patternProperties`)
//! - [`FieldSchema`] / [`FieldKind`] - one declared field and its classified type
//! - [`default_for_field`] - placeholder defaults for leaf fields
//! - [`bundled`] - schemas and manifest shipped with the crate

mod binding;
pub mod bundled;
mod defaults;
mod source;

pub use binding::{FieldKind, FieldSchema, SchemaBinding};
pub use defaults::{default_for_field, schema_default};
pub use source::{ChainedSchemaSource, DirectorySchemaSource, MemorySchemaSource, SchemaSource};

pub(crate) use binding::literal_from_json;
