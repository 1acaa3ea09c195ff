//! Data Models Core
//!
//! Schema-driven hierarchical data models for scientific data products. Each
//! data product version is a typed tree of nested records, enumerations and
//! numeric arrays backed by a versioned schema document.
//!
//! # Architecture
//!
//! - **Lazy fields**: every schema-declared field is read through the field
//!   resolver, which coerces stored raw values once and caches defaults
//! - **Tag registry**: versioned tags map to node classes and node classes to
//!   their data model wrappers
//! - **Explicit context**: registry, schema source and configuration live in
//!   a [`DataModels`] value passed by reference
//!
//! # Modules
//!
//! - [`models`] - Values and nodes (ObjectNode, ListNode, EnumNode, ScalarNode)
//! - [`schema`] - Schema sources, bindings and leaf defaults
//! - [`registry`] - Manifests, node classes and the tag registry
//! - [`arrays`] - Default array shape rules
//! - [`tree`] - Flushing, unwrapping and tree documents
//! - [`nodes`] - Typed nodes generated from the bundled manifest
//! - [`datamodel`] - Root wrappers opened from and saved to documents

pub mod arrays;
pub mod config;
pub mod context;
pub mod datamodel;
pub mod error;
pub mod models;
pub mod nodes;
pub mod registry;
pub mod schema;
pub mod tree;

// Re-export commonly used types
pub use config::RuntimeConfig;
pub use context::{DataModels, DataModelsBuilder};
pub use datamodel::DataModel;
pub use error::{DataModelError, NodeError, RegistryError, Result, SchemaError, ShapeError, TreeError};
pub use models::*;
pub use nodes::{NodeHandle, TypedNode};
pub use registry::{ClassRef, NodeClass, NodeKind, Registry, ScalarKind};
pub use tree::{FlushMode, FlushOptions, TreeDocument};
