//! Node Classes
//!
//! A [`NodeClass`] is the runtime description of one node type: its kind,
//! its tag (for tagged classes), its bound schema, and the array layout of
//! array-owning classes. Classes are immutable once registered and shared as
//! [`ClassRef`].

use crate::arrays::ArrayLayout;
use crate::models::{TagId, Value};
use crate::schema::{FieldSchema, SchemaBinding};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handle to a registered class
pub type ClassRef = Arc<NodeClass>;

/// Container shape of a class's instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Object,
    List,
    Enum,
    Scalar,
}

/// Primitive type held by a scalar class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    #[default]
    Str,
    Int,
    Float,
    Time,
}

#[derive(Debug, Clone)]
pub struct NodeClass {
    name: String,
    kind: NodeKind,
    scalar: Option<ScalarKind>,
    tag: Option<TagId>,
    schema_uri: Option<String>,
    historical_schema_uris: Vec<String>,
    description: Option<String>,
    implied_by: Vec<(String, String)>,
    layout: Option<ArrayLayout>,
    binding: Option<Arc<SchemaBinding>>,
}

impl NodeClass {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            scalar: None,
            tag: None,
            schema_uri: None,
            historical_schema_uris: Vec::new(),
            description: None,
            implied_by: Vec::new(),
            layout: None,
            binding: None,
        }
    }

    /// Unregistered object class for an untagged nested object field
    pub fn anonymous(name: impl Into<String>, binding: SchemaBinding) -> Self {
        Self::new(name, NodeKind::Object).with_binding(binding)
    }

    pub fn with_tag(mut self, tag: TagId) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Attach the schema document URI and its binding
    pub fn with_schema(mut self, uri: impl Into<String>, binding: SchemaBinding) -> Self {
        self.schema_uri = Some(uri.into());
        self.binding = Some(Arc::new(binding));
        self
    }

    pub fn with_binding(mut self, binding: SchemaBinding) -> Self {
        self.binding = Some(Arc::new(binding));
        self
    }

    pub fn with_scalar(mut self, scalar: ScalarKind) -> Self {
        self.scalar = Some(scalar);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_layout(mut self, layout: ArrayLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_historical_schema_uris(mut self, uris: Vec<String>) -> Self {
        self.historical_schema_uris = uris;
        self
    }

    /// Record an owning `(class, field)` for an implied class
    pub fn implied_by(mut self, owner: impl Into<String>, field: impl Into<String>) -> Self {
        self.implied_by.push((owner.into(), field.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        self.scalar
    }

    pub fn tag(&self) -> Option<&TagId> {
        self.tag.as_ref()
    }

    pub fn is_tagged(&self) -> bool {
        self.tag.is_some()
    }

    pub fn schema_uri(&self) -> Option<&str> {
        self.schema_uri.as_deref()
    }

    pub fn historical_schema_uris(&self) -> &[String] {
        &self.historical_schema_uris
    }

    /// Manifest description, else the schema's
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or_else(|| self.binding.as_ref().and_then(|binding| binding.description()))
    }

    pub fn title(&self) -> Option<&str> {
        self.binding.as_ref().and_then(|binding| binding.title())
    }

    /// `(owner class, field)` pairs this implied class is reached through
    pub fn owners(&self) -> &[(String, String)] {
        &self.implied_by
    }

    pub fn is_implied(&self) -> bool {
        !self.implied_by.is_empty()
    }

    pub fn layout(&self) -> Option<&ArrayLayout> {
        self.layout.as_ref()
    }

    pub fn binding(&self) -> Option<&SchemaBinding> {
        self.binding.as_deref()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.binding()?.field(name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn required_fields(&self) -> &[String] {
        self.binding()
            .map(SchemaBinding::required_fields)
            .unwrap_or(&[])
    }

    /// Literals of an enum class
    pub fn enum_literals(&self) -> &[Value] {
        self.binding().map(SchemaBinding::literals).unwrap_or(&[])
    }
}

impl PartialEq for NodeClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for NodeClass {}
