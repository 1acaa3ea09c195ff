//! Field Resolution
//!
//! Every schema-declared field of an [`ObjectNode`](crate::models::ObjectNode)
//! is read through [`resolve`]:
//!
//! 1. If storage holds the name, the stored value is coerced to the declared
//!    field type when it is still raw, re-stored, and returned. Coercion
//!    therefore happens at most once per field.
//! 2. Otherwise the default producer runs exactly once and its result is
//!    stored and returned.
//!
//! Default producers receive the storage mapping itself so an array default
//! can read (and initialise) the primary array it derives its shape from.

use crate::arrays::{trailing, ShapeRule};
use crate::context::DataModels;
use crate::error::{NodeError, Result, ShapeError};
use crate::models::scalar_node::{check_literal, coerce_primitive};
use crate::models::value::{Mapping, NdArray, Value};
use crate::models::{EnumNode, ListNode, ObjectNode, ScalarNode};
use crate::registry::{ClassRef, NodeClass, NodeKind, ScalarKind};
use crate::schema::{default_for_field, schema_default, FieldKind, FieldSchema};
use chrono::{DateTime, Utc};
use std::cell::OnceCell;
use std::sync::Arc;
use tracing::debug;

/// Conversion of raw stored values to a field's declared node type
///
/// `check` does all fallible work up front so `wrap` can take the value
/// out of storage without risking its loss.
pub trait FieldCoercion {
    /// Whether `value` is still in a raw form this coercion wraps
    fn needs_coercion(&self, value: &Value) -> bool;

    /// Validate `value` against the declared type
    fn check(&self, value: &Value) -> Result<()>;

    /// Wrap a value previously accepted by `check`
    fn wrap(&self, value: Value) -> Value;
}

/// Coercion for fields without a declared type
pub struct NoCoercion;

impl FieldCoercion for NoCoercion {
    fn needs_coercion(&self, _value: &Value) -> bool {
        false
    }

    fn check(&self, _value: &Value) -> Result<()> {
        Ok(())
    }

    fn wrap(&self, value: Value) -> Value {
        value
    }
}

/// Read `name` from `storage`, coercing or synthesising as needed
pub fn resolve<'a, C, F>(
    storage: &'a mut Mapping,
    name: &str,
    coercion: &C,
    make_default: F,
) -> Result<&'a mut Value>
where
    C: FieldCoercion + ?Sized,
    F: FnOnce(&mut Mapping) -> Result<Value>,
{
    if storage.contains_key(name) {
        let slot = storage
            .get_mut(name)
            .ok_or_else(|| NodeError::missing_field("<storage>", name))?;
        if coercion.needs_coercion(slot) {
            coercion.check(slot)?;
            let raw = std::mem::take(slot);
            *slot = coercion.wrap(raw);
            debug!("Coerced stored field '{}' to {}", name, slot.type_name());
        }
        return Ok(slot);
    }

    let value = make_default(storage)?;
    debug!("Synthesised default for field '{}' ({})", name, value.type_name());
    Ok(storage.entry(name.to_string()).or_insert(value))
}

/// Fixed time used for default time fields (2020-01-01T00:00:00Z)
pub const DEFAULT_TIME_SECS: i64 = 1_577_836_800;

pub fn default_time() -> DateTime<Utc> {
    DateTime::from_timestamp(DEFAULT_TIME_SECS, 0).unwrap_or_default()
}

/// Resolution state for one node: the context plus the node's own class and override
///
/// Holds clones of the node's class and shape override so the node's storage
/// can be borrowed mutably while defaults are computed.
pub(crate) struct FieldContext<'c> {
    ctx: &'c DataModels,
    class: Option<ClassRef>,
    shape_override: Option<Vec<usize>>,
}

impl<'c> FieldContext<'c> {
    pub(crate) fn new(
        ctx: &'c DataModels,
        class: Option<ClassRef>,
        shape_override: Option<Vec<usize>>,
    ) -> Self {
        Self {
            ctx,
            class,
            shape_override,
        }
    }

    fn class_label(&self) -> &str {
        self.class
            .as_ref()
            .map(|class| class.name())
            .unwrap_or("untyped node")
    }

    /// Coercion for the declared type of `name`
    pub(crate) fn coercion<'f>(&'f self, name: &'f str) -> DeclaredCoercion<'f> {
        let owner = self.class.as_deref();
        DeclaredCoercion {
            ctx: self.ctx,
            owner,
            name,
            field: owner.and_then(|class| class.field(name)),
            target: OnceCell::new(),
        }
    }

    /// Produce the default value for `name`
    pub(crate) fn make_default(&self, storage: &mut Mapping, name: &str) -> Result<Value> {
        let class = self
            .class
            .as_ref()
            .ok_or_else(|| NodeError::missing_field(self.class_label(), name))?;

        if let Some(producer) = self.ctx.registry().default_producer(class.name(), name) {
            debug!("Using registered default producer for {}.{}", class.name(), name);
            return producer(self.ctx);
        }

        let field = class
            .field(name)
            .ok_or_else(|| NodeError::missing_field(class.name(), name))?;

        if let Some(value) = default_for_field(field) {
            return Ok(value);
        }

        match field.kind() {
            FieldKind::Array { ndim, dtype, unit } => {
                let shape = self.array_shape(class, storage, name, *ndim)?;
                let array = NdArray::zeros(shape, *dtype);
                Ok(Value::Array(match unit {
                    Some(unit) => array.with_unit(unit.clone()),
                    None => array,
                }))
            }
            FieldKind::Tagged(tag) => {
                let target = self.ctx.registry().class_for_tag_compatible(tag)?;
                self.ctx.instantiate(&target)
            }
            FieldKind::Object => {
                let target = object_class(self.ctx, class, name, field)?;
                Ok(Value::Object(ObjectNode::with_class(target)))
            }
            FieldKind::List => Ok(Value::List(ListNode::new())),
            FieldKind::Enum(literals) => {
                let first = schema_default(field).or_else(|| literals.first().cloned());
                let first = first.ok_or_else(|| {
                    NodeError::type_error(format!("enum field '{}' declares no literals", name))
                })?;
                Ok(Value::Enum(EnumNode::new(name, literals.clone(), first)?))
            }
            other => Err(NodeError::type_error(format!(
                "no default available for {} field '{}'",
                other.label(),
                name
            ))
            .into()),
        }
    }

    /// Shape of a default array for `name` under the class's array layout
    fn array_shape(
        &self,
        class: &NodeClass,
        storage: &mut Mapping,
        name: &str,
        ndim: Option<usize>,
    ) -> Result<Vec<usize>> {
        let rule = class
            .layout()
            .map(|layout| layout.rule(name))
            .unwrap_or_default();

        if let ShapeRule::Fixed(shape) = rule {
            return Ok(shape);
        }

        let base = self.base_shape(class, storage, name, ndim)?;
        Ok(rule.derive(name, &base, ndim)?)
    }

    /// Base shape: node override, then the primary array, then configuration
    fn base_shape(
        &self,
        class: &NodeClass,
        storage: &mut Mapping,
        name: &str,
        ndim: Option<usize>,
    ) -> Result<Vec<usize>> {
        if let Some(shape) = &self.shape_override {
            return Ok(shape.clone());
        }

        let primary = class.layout().and_then(|layout| layout.primary());
        let mut base_ndim = ndim;

        if let Some(primary) = primary.filter(|primary| *primary != name) {
            if storage.contains_key(primary) || class.declares(primary) {
                let coercion = self.coercion(primary);
                let value = resolve(storage, primary, &coercion, |storage| {
                    self.make_default(storage, primary)
                })?;
                if let Some(array) = value.as_array() {
                    return Ok(array.shape().to_vec());
                }
            }
            if let Some(FieldKind::Array { ndim, .. }) = class.field(primary).map(FieldSchema::kind) {
                base_ndim = *ndim;
            }
        }

        let configured = self
            .ctx
            .config()
            .active_shape()
            .ok_or_else(|| ShapeError::NoDefaultShape {
                field: name.to_string(),
            })?;

        Ok(match base_ndim {
            Some(ndim) => trailing(name, configured, ndim)?,
            None => configured.to_vec(),
        })
    }
}

/// Class for an untagged object field: the implied class, else an anonymous
/// class bound to the field's sub-schema
pub(crate) fn object_class(
    ctx: &DataModels,
    owner: &NodeClass,
    name: &str,
    field: &FieldSchema,
) -> Result<ClassRef> {
    if let Some(class) = ctx.registry().implied_class(owner.name(), name) {
        return Ok(class);
    }
    let binding = field.sub_binding(ctx.schemas())?;
    Ok(Arc::new(NodeClass::anonymous(
        format!("{}.{}", owner.name(), name),
        binding,
    )))
}

/// Target of a declared-field coercion, computed by `check`
enum Target {
    Object(ClassRef),
    List(Option<ClassRef>),
    Enum {
        literals: Vec<Value>,
        class: Option<ClassRef>,
    },
    Scalar(ClassRef),
    Time,
}

/// Coercion driven by the declared field schema of the owning class
pub(crate) struct DeclaredCoercion<'f> {
    ctx: &'f DataModels,
    owner: Option<&'f NodeClass>,
    name: &'f str,
    field: Option<&'f FieldSchema>,
    target: OnceCell<Target>,
}

impl DeclaredCoercion<'_> {
    fn target_for(&self, field: &FieldSchema, value: &Value) -> Result<Target> {
        let mismatch = |expected: &str| {
            NodeError::type_error(format!(
                "field '{}' expects {}, got {}",
                self.name,
                expected,
                value.type_name()
            ))
        };

        match field.kind() {
            FieldKind::Tagged(tag) => {
                let class = self.ctx.registry().class_for_tag_compatible(tag)?;
                match (class.kind(), value) {
                    (NodeKind::Object, Value::Mapping(_)) => Ok(Target::Object(class)),
                    (NodeKind::List, Value::Sequence(_)) => Ok(Target::List(Some(class))),
                    (NodeKind::Enum, literal) if literal.is_primitive() => {
                        check_literal(self.name, class.enum_literals(), literal)?;
                        Ok(Target::Enum {
                            literals: class.enum_literals().to_vec(),
                            class: Some(class),
                        })
                    }
                    (NodeKind::Scalar, literal) if literal.is_primitive() => {
                        coerce_primitive(class.scalar_kind(), literal.clone())
                            .map_err(|_| mismatch(class.name()))?;
                        Ok(Target::Scalar(class))
                    }
                    _ => Err(mismatch(class.name()).into()),
                }
            }
            FieldKind::Object => match (self.owner, value) {
                (Some(owner), Value::Mapping(_)) => {
                    Ok(Target::Object(object_class(self.ctx, owner, self.name, field)?))
                }
                _ => Err(mismatch("a mapping").into()),
            },
            FieldKind::List => Ok(Target::List(None)),
            FieldKind::Enum(literals) => {
                check_literal(self.name, literals, value)?;
                Ok(Target::Enum {
                    literals: literals.clone(),
                    class: None,
                })
            }
            FieldKind::Time => {
                coerce_primitive(Some(ScalarKind::Time), value.clone())
                    .map_err(|_| mismatch("an RFC 3339 time"))?;
                Ok(Target::Time)
            }
            _ => Err(mismatch(field.kind().label()).into()),
        }
    }
}

impl FieldCoercion for DeclaredCoercion<'_> {
    fn needs_coercion(&self, value: &Value) -> bool {
        let Some(field) = self.field else {
            return false;
        };
        match field.kind() {
            FieldKind::Tagged(_) => {
                matches!(value, Value::Mapping(_) | Value::Sequence(_)) || value.is_primitive()
            }
            FieldKind::Object => matches!(value, Value::Mapping(_)),
            FieldKind::List => matches!(value, Value::Sequence(_)),
            FieldKind::Enum(_) => value.is_primitive(),
            FieldKind::Time => matches!(value, Value::Str(_)),
            _ => false,
        }
    }

    fn check(&self, value: &Value) -> Result<()> {
        let Some(field) = self.field else {
            return Ok(());
        };
        let target = self.target_for(field, value)?;
        // A second check on the same coercion keeps the first target
        let _ = self.target.set(target);
        Ok(())
    }

    fn wrap(&self, value: Value) -> Value {
        match (self.target.get(), value) {
            (Some(Target::Object(class)), Value::Mapping(storage)) => {
                Value::Object(ObjectNode::from_mapping(storage, Some(class.clone())))
            }
            (Some(Target::List(class)), Value::Sequence(items)) => {
                Value::List(ListNode::from_items(items, class.clone()))
            }
            (Some(Target::Enum { literals, class }), literal) => {
                let field = class
                    .as_ref()
                    .map(|class| class.name().to_string())
                    .unwrap_or_else(|| self.name.to_string());
                Value::Enum(EnumNode::from_checked(
                    field,
                    literals.clone(),
                    literal,
                    class.clone(),
                ))
            }
            (Some(Target::Scalar(class)), literal) => {
                match coerce_primitive(class.scalar_kind(), literal) {
                    Ok(converted) => Value::Scalar(ScalarNode::from_checked(class.clone(), converted)),
                    Err(raw) => raw,
                }
            }
            (Some(Target::Time), literal) => {
                coerce_primitive(Some(ScalarKind::Time), literal)
                    .unwrap_or_else(|raw| raw)
            }
            (_, value) => value,
        }
    }
}
