//! Schema-derived defaults for leaf fields
//!
//! Placeholders mark values nobody has filled in yet: strings default to
//! [`NOSTR`], numbers to [`NONUM`], times to 2020-01-01T00:00:00Z. A schema
//! `default` annotation takes precedence when its type fits.

use crate::models::{default_time, Quantity, Value, NONUM, NOSTR};
use crate::schema::binding::{literal_from_json, FieldKind, FieldSchema};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

/// The field's schema `default` annotation as a literal
pub fn schema_default(field: &FieldSchema) -> Option<Value> {
    field.schema().get("default").and_then(literal_from_json)
}

/// Default for a leaf-kinded field, `None` for kinds that need context
/// (arrays, tagged values, nested objects, enums)
pub fn default_for_field(field: &FieldSchema) -> Option<Value> {
    let declared = schema_default(field);

    match field.kind() {
        FieldKind::Str => Some(match declared {
            Some(Value::Str(s)) => Value::Str(s),
            _ => Value::Str(NOSTR.to_string()),
        }),
        FieldKind::Int => Some(match declared {
            Some(Value::Int(i)) => Value::Int(i),
            _ => Value::Int(NONUM),
        }),
        FieldKind::Float => Some(match declared {
            Some(Value::Float(x)) => Value::Float(x),
            Some(Value::Int(i)) => Value::Float(i as f64),
            _ => Value::Float(NONUM as f64),
        }),
        FieldKind::Bool => Some(match declared {
            Some(Value::Bool(b)) => Value::Bool(b),
            _ => Value::Bool(false),
        }),
        FieldKind::Time => {
            let time = field
                .schema()
                .get("default")
                .and_then(JsonValue::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(default_time);
            Some(Value::Time(time))
        }
        FieldKind::Quantity { unit } => {
            let value = declared.and_then(|v| v.as_f64()).unwrap_or(NONUM as f64);
            Some(Value::Quantity(Quantity::new(
                value,
                unit.clone().unwrap_or_default(),
            )))
        }
        FieldKind::Any => Some(declared.unwrap_or(Value::Null)),
        FieldKind::Tagged(_)
        | FieldKind::Object
        | FieldKind::List
        | FieldKind::Enum(_)
        | FieldKind::Array { .. } => None,
    }
}
