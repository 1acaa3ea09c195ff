//! Error Types
//!
//! Each runtime component has its own error enum; [`DataModelError`] aggregates
//! them so public operations can propagate any failure with `?`.
//!
//! - `NodeError` - storage access, construction and coercion failures
//! - `ShapeError` - default array shape resolution failures
//! - `RegistryError` - tag/class registration and lookup failures
//! - `SchemaError` - schema loading and binding failures
//! - `TreeError` - persisted document encoding/decoding failures
//!
//! None of these are converted into default values anywhere in the crate:
//! a disagreement between stored data and a class's schema always reaches
//! the caller.

use thiserror::Error;

/// Node storage and construction errors
#[derive(Error, Debug)]
pub enum NodeError {
    /// Field is neither stored nor declared on the node's class
    #[error("Missing field '{field}' on {class}: not stored and not declared by the schema")]
    MissingField { class: String, field: String },

    /// Node constructed from (or coerced to) an incompatible value
    #[error("Type error: {0}")]
    TypeError(String),

    /// Enumeration literal outside the declared set
    #[error("Invalid value {value} for enum '{field}' (allowed: {allowed})")]
    InvalidEnumValue {
        field: String,
        value: String,
        allowed: String,
    },

    /// Sequence index outside the list bounds
    #[error("Index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

impl NodeError {
    /// Create a missing field error
    pub fn missing_field(class: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            class: class.into(),
            field: field.into(),
        }
    }

    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create an invalid enum value error
    pub fn invalid_enum_value(
        field: impl Into<String>,
        value: impl Into<String>,
        allowed: &[impl std::fmt::Display],
    ) -> Self {
        Self::InvalidEnumValue {
            field: field.into(),
            value: value.into(),
            allowed: allowed
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Default array shape errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShapeError {
    /// No override, no primary array and no configured default shape
    #[error("No default shape defined for array field '{field}'")]
    NoDefaultShape { field: String },

    /// Base shape has fewer dimensions than the rule or field needs
    #[error("Shape rule for '{field}' needs a base of at least {expected} dimensions, got {actual}")]
    RankMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// Unparseable shape rule name
    #[error("Unknown shape rule: {0}")]
    UnknownRule(String),
}

/// Tag and type registry errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Tag already registered to a class
    #[error("Tag '{tag}' is already registered to class {existing} (attempted: {class})")]
    DuplicateTag {
        tag: String,
        existing: String,
        class: String,
    },

    /// Class name already registered
    #[error("Class {0} is already registered")]
    DuplicateClass(String),

    /// Wrapper model already bound to another class
    #[error("Data model {model} already wraps class {existing}")]
    DuplicateWrapper { model: String, existing: String },

    /// No class registered under this tag
    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    /// No class registered under this name
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// No class wrapped by this data model name
    #[error("Unknown data model: {0}")]
    UnknownModel(String),

    /// Class exists but carries no tag
    #[error("Class {0} has no tag")]
    Untagged(String),

    /// Malformed tag string
    #[error("Invalid tag '{0}': expected <namespace>/<name>-<version>")]
    InvalidTag(String),

    /// Implied class whose owner chain never reaches a tagged class
    #[error("Implied class {class} cannot be resolved: {reason}")]
    UnresolvedImplied { class: String, reason: String },
}

/// Schema loading and binding errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Schema document not available from the source
    #[error("Schema not found: {uri}")]
    NotFound { uri: String },

    /// Field signature lookup for a name the schema does not declare
    #[error("Schema {schema} declares no field '{field}'")]
    UnknownField { schema: String, field: String },

    /// `$ref` chain that loops back on itself
    #[error("Cyclic $ref chain: {}", chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    /// Document or manifest that does not fit the schema vocabulary
    #[error("Malformed schema '{uri}': {reason}")]
    Malformed { uri: String, reason: String },

    /// Failure reading a schema document from disk
    #[error("IO error reading schema: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    /// Create a not found error
    pub fn not_found(uri: impl Into<String>) -> Self {
        Self::NotFound { uri: uri.into() }
    }

    /// Create a malformed schema error
    pub fn malformed(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            uri: uri.into(),
            reason: reason.into(),
        }
    }
}

/// Persisted tree document errors
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Value that cannot be represented in the document
    #[error("Cannot encode value: {0}")]
    Encode(String),

    /// Document content that does not decode to a value
    #[error("Cannot decode document: {0}")]
    Decode(String),
}

impl TreeError {
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

/// Aggregate error for all public runtime operations
#[derive(Error, Debug)]
pub enum DataModelError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Invalid runtime configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, DataModelError>;
