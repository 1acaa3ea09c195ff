//! Schema Bindings
//!
//! A [`SchemaBinding`] is the resolved view of one schema document: the
//! declared fields in property order, the de-duplicated required set, any
//! `patternProperties` matchers, and the root-level `title`, `description`,
//! `tag` and `enum` annotations.
//!
//! # Resolution
//!
//! - `$ref` is followed to its target, either an absolute URI or a
//!   `#/json/pointer` fragment relative to the current document
//! - `allOf` children are collected in order and unioned
//! - `properties`, `required` and `patternProperties` are terminal
//!
//! A `$ref` chain that returns to a schema already being collected is a
//! `SchemaError::CyclicReference`. Nested field schemas are not bound until
//! asked for ([`FieldSchema::sub_binding`]), so recursive object structures
//! are fine.

use crate::error::SchemaError;
use crate::models::{DType, TagId, Value, LEAF_NAMESPACE};
use crate::schema::source::SchemaSource;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Declared type of a schema field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Value marked with a registered (non-leaf) tag
    Tagged(String),
    /// Untagged nested object
    Object,
    /// Untagged sequence
    List,
    /// Closed set of literals
    Enum(Vec<Value>),
    /// Numeric array leaf
    Array {
        ndim: Option<usize>,
        dtype: DType,
        unit: Option<String>,
    },
    /// Time leaf
    Time,
    /// Scalar quantity leaf
    Quantity { unit: Option<String> },
    Str,
    Int,
    Float,
    Bool,
    /// No type information
    Any,
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Tagged(_) => "tagged",
            FieldKind::Object => "object",
            FieldKind::List => "list",
            FieldKind::Enum(_) => "enum",
            FieldKind::Array { .. } => "ndarray",
            FieldKind::Time => "time",
            FieldKind::Quantity { .. } => "quantity",
            FieldKind::Str => "string",
            FieldKind::Int => "integer",
            FieldKind::Float => "number",
            FieldKind::Bool => "boolean",
            FieldKind::Any => "untyped",
        }
    }
}

/// One declared field: its classified kind plus the raw sub-schema
#[derive(Debug, Clone)]
pub struct FieldSchema {
    name: String,
    kind: FieldKind,
    schema: Arc<JsonValue>,
    base_uri: String,
}

impl FieldSchema {
    /// Field name (for pattern fields, the pattern)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Raw sub-schema as declared
    pub fn schema(&self) -> &JsonValue {
        &self.schema
    }

    /// URI of the document the field was declared in
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn title(&self) -> Option<&str> {
        self.schema.get("title").and_then(JsonValue::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.schema.get("description").and_then(JsonValue::as_str)
    }

    /// Bind the field's own sub-schema (for nested objects)
    pub fn sub_binding(&self, source: &dyn SchemaSource) -> Result<SchemaBinding, SchemaError> {
        SchemaBinding::from_document(source, &self.base_uri, &self.schema)
    }
}

/// Resolved field set and annotations of a schema document
#[derive(Debug, Clone, Default)]
pub struct SchemaBinding {
    uri: String,
    title: Option<String>,
    description: Option<String>,
    tag: Option<String>,
    fields: Vec<FieldSchema>,
    index: HashMap<String, usize>,
    required: Vec<String>,
    patterns: Vec<(Regex, FieldSchema)>,
    literals: Vec<Value>,
}

impl SchemaBinding {
    /// Load and bind the schema document at `uri`
    pub fn bind(source: &dyn SchemaSource, uri: &str) -> Result<Self, SchemaError> {
        let document = source.load(uri)?;
        let stack = vec![format!("{}#", document_uri(uri))];
        Self::collect(source, uri, &document, stack)
    }

    /// Bind an already loaded (sub-)schema; `base_uri` resolves relative `$ref`s
    pub fn from_document(
        source: &dyn SchemaSource,
        base_uri: &str,
        document: &JsonValue,
    ) -> Result<Self, SchemaError> {
        Self::collect(source, base_uri, document, Vec::new())
    }

    fn collect(
        source: &dyn SchemaSource,
        base_uri: &str,
        document: &JsonValue,
        stack: Vec<String>,
    ) -> Result<Self, SchemaError> {
        let mut collector = Collector {
            source,
            stack,
            binding: SchemaBinding {
                uri: base_uri.to_string(),
                ..Default::default()
            },
        };
        collector.collect(base_uri, document)?;
        Ok(collector.binding)
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Tag declared at the schema root
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Required field names, in first-declared order without duplicates
    pub fn required_fields(&self) -> &[String] {
        &self.required
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|required| required == name)
    }

    /// Declared fields in property order
    pub fn fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldSchema::name)
    }

    /// Declared field, falling back to `patternProperties` matches
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        match self.index.get(name) {
            Some(&position) => self.fields.get(position),
            None => self
                .patterns
                .iter()
                .find(|(pattern, _)| pattern.is_match(name))
                .map(|(_, field)| field),
        }
    }

    pub fn declares(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Like [`field`](Self::field), but a missing name is an error
    pub fn field_signature(&self, name: &str) -> Result<&FieldSchema, SchemaError> {
        self.field(name).ok_or_else(|| SchemaError::UnknownField {
            schema: self.uri.clone(),
            field: name.to_string(),
        })
    }

    /// Root-level `enum` literals (empty for non-enum schemas)
    pub fn literals(&self) -> &[Value] {
        &self.literals
    }

    /// Literals of an enum field
    pub fn enum_literals(&self, name: &str) -> Option<&[Value]> {
        match self.field(name)?.kind() {
            FieldKind::Enum(literals) => Some(literals),
            _ => None,
        }
    }

    /// No fields, patterns, or requirements
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.patterns.is_empty() && self.required.is_empty()
    }
}

/// Depth-first walker accumulating one binding
struct Collector<'s> {
    source: &'s dyn SchemaSource,
    stack: Vec<String>,
    binding: SchemaBinding,
}

impl Collector<'_> {
    fn collect(&mut self, base: &str, schema: &JsonValue) -> Result<(), SchemaError> {
        let Some(object) = schema.as_object() else {
            return Ok(());
        };

        let text = |key: &str| object.get(key).and_then(JsonValue::as_str).map(str::to_string);
        if self.binding.title.is_none() {
            self.binding.title = text("title");
        }
        if self.binding.description.is_none() {
            self.binding.description = text("description");
        }
        if self.binding.tag.is_none() {
            self.binding.tag = text("tag");
        }
        if self.binding.literals.is_empty() {
            if let Some(literals) = object.get("enum").and_then(JsonValue::as_array) {
                self.binding.literals = literals.iter().filter_map(literal_from_json).collect();
            }
        }

        if let Some(reference) = object.get("$ref").and_then(JsonValue::as_str) {
            let target = resolve_ref(self.source, base, reference)?;
            if self.stack.contains(&target.uri) {
                let mut chain = self.stack.clone();
                chain.push(target.uri);
                return Err(SchemaError::CyclicReference { chain });
            }
            self.stack.push(target.uri);
            self.collect(&target.document_uri, &target.schema)?;
            self.stack.pop();
        }

        if let Some(children) = object.get("allOf").and_then(JsonValue::as_array) {
            for child in children {
                self.collect(base, child)?;
            }
        }

        if let Some(properties) = object.get("properties").and_then(JsonValue::as_object) {
            for (name, sub) in properties {
                let field = classify(self.source, base, name, sub)?;
                self.add_field(field);
            }
        }

        if let Some(required) = object.get("required").and_then(JsonValue::as_array) {
            for name in required.iter().filter_map(JsonValue::as_str) {
                if !self.binding.is_required(name) {
                    self.binding.required.push(name.to_string());
                }
            }
        }

        if let Some(patterns) = object.get("patternProperties").and_then(JsonValue::as_object) {
            for (pattern, sub) in patterns {
                let regex = Regex::new(pattern).map_err(|e| {
                    SchemaError::malformed(base, format!("invalid pattern '{}': {}", pattern, e))
                })?;
                let field = classify(self.source, base, pattern, sub)?;
                self.binding.patterns.push((regex, field));
            }
        }

        Ok(())
    }

    /// Add a field; a re-declaration replaces the schema but keeps the first position
    fn add_field(&mut self, field: FieldSchema) {
        match self.binding.index.get(field.name()) {
            Some(&position) => self.binding.fields[position] = field,
            None => {
                self.binding
                    .index
                    .insert(field.name().to_string(), self.binding.fields.len());
                self.binding.fields.push(field);
            }
        }
    }
}

/// Resolved `$ref` target
struct RefTarget {
    /// `document#fragment`, used for cycle detection
    uri: String,
    document_uri: String,
    schema: JsonValue,
}

fn document_uri(uri: &str) -> &str {
    uri.split('#').next().unwrap_or(uri)
}

fn resolve_ref(source: &dyn SchemaSource, base: &str, reference: &str) -> Result<RefTarget, SchemaError> {
    let (doc_part, fragment) = reference.split_once('#').unwrap_or((reference, ""));
    let base_doc = document_uri(base);

    let document_uri = if doc_part.is_empty() {
        base_doc.to_string()
    } else if doc_part.contains("://") {
        doc_part.to_string()
    } else {
        match base_doc.rsplit_once('/') {
            Some((dir, _)) => format!("{}/{}", dir, doc_part),
            None => doc_part.to_string(),
        }
    };

    let document = source.load(&document_uri)?;
    let schema = if fragment.is_empty() {
        (*document).clone()
    } else {
        document
            .pointer(fragment)
            .cloned()
            .ok_or_else(|| SchemaError::not_found(format!("{}#{}", document_uri, fragment)))?
    };

    Ok(RefTarget {
        uri: format!("{}#{}", document_uri, fragment),
        document_uri,
        schema,
    })
}

/// JSON literal as a tree value (strings, numbers, booleans)
pub(crate) fn literal_from_json(json: &JsonValue) -> Option<Value> {
    match json {
        JsonValue::String(s) => Some(Value::Str(s.clone())),
        JsonValue::Bool(b) => Some(Value::Bool(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Int(i)),
            None => n.as_f64().map(Value::Float),
        },
        _ => None,
    }
}

fn classify(
    source: &dyn SchemaSource,
    base: &str,
    name: &str,
    schema: &JsonValue,
) -> Result<FieldSchema, SchemaError> {
    let mut seen = Vec::new();
    let kind = classify_kind(source, base, schema, &mut seen)?;
    Ok(FieldSchema {
        name: name.to_string(),
        kind,
        schema: Arc::new(schema.clone()),
        base_uri: document_uri(base).to_string(),
    })
}

fn classify_kind(
    source: &dyn SchemaSource,
    base: &str,
    schema: &JsonValue,
    seen: &mut Vec<String>,
) -> Result<FieldKind, SchemaError> {
    let Some(object) = schema.as_object() else {
        return Ok(FieldKind::Any);
    };

    if let Some(tag) = object.get("tag").and_then(JsonValue::as_str) {
        return leaf_or_tagged(base, tag, object);
    }

    if let Some(literals) = object.get("enum").and_then(JsonValue::as_array) {
        return Ok(FieldKind::Enum(
            literals.iter().filter_map(literal_from_json).collect(),
        ));
    }

    match object.get("type").and_then(JsonValue::as_str) {
        Some("object") => return Ok(FieldKind::Object),
        Some("array") => return Ok(FieldKind::List),
        Some("string") => {
            let is_time = object.get("format").and_then(JsonValue::as_str) == Some("date-time");
            return Ok(if is_time { FieldKind::Time } else { FieldKind::Str });
        }
        Some("integer") => return Ok(FieldKind::Int),
        Some("number") => return Ok(FieldKind::Float),
        Some("boolean") => return Ok(FieldKind::Bool),
        _ => {}
    }

    if let Some(reference) = object.get("$ref").and_then(JsonValue::as_str) {
        let target = resolve_ref(source, base, reference)?;
        if seen.contains(&target.uri) {
            let mut chain = seen.clone();
            chain.push(target.uri);
            return Err(SchemaError::CyclicReference { chain });
        }
        seen.push(target.uri);
        return classify_kind(source, &target.document_uri, &target.schema, seen);
    }

    if ["properties", "allOf", "patternProperties"]
        .iter()
        .any(|key| object.contains_key(*key))
    {
        return Ok(FieldKind::Object);
    }

    Ok(FieldKind::Any)
}

fn leaf_or_tagged(
    base: &str,
    tag: &str,
    object: &serde_json::Map<String, JsonValue>,
) -> Result<FieldKind, SchemaError> {
    let id = match tag.parse::<TagId>() {
        Ok(id) if id.namespace() == LEAF_NAMESPACE => id,
        _ => return Ok(FieldKind::Tagged(tag.to_string())),
    };

    let ndim = object
        .get("ndim")
        .and_then(JsonValue::as_u64)
        .map(|ndim| ndim as usize);
    let unit = object.get("unit").and_then(JsonValue::as_str).map(str::to_string);
    let dtype = match object.get("datatype").and_then(JsonValue::as_str) {
        Some(name) => name
            .parse::<DType>()
            .map_err(|e| SchemaError::malformed(base, e.to_string()))?,
        None => DType::Float32,
    };

    Ok(match id.name() {
        "ndarray" => FieldKind::Array { ndim, dtype, unit },
        "quantity" if ndim.is_some() => FieldKind::Array { ndim, dtype, unit },
        "quantity" => FieldKind::Quantity { unit },
        "time" => FieldKind::Time,
        _ => FieldKind::Tagged(tag.to_string()),
    })
}

#[cfg(test)]
#[path = "binding_test.rs"]
mod binding_test;
