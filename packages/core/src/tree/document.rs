//! Tree Documents
//!
//! JSON rendition of a persisted tree. Tagged values carry their tag under
//! a `"!tag"` key:
//!
//! ```json
//! {
//!   "!tag": "https://datamodels.org/tags/image-1.0.0",
//!   "meta": { "filename": "r0001.json", "origin": { "!tag": "...", "value": "SIMULATION" } },
//!   "data": { "!tag": "https://datamodels.org/leaf/quantity-1.0.0", "shape": [8, 8], "datatype": "float32", "fill": 0.0, "unit": "DN / s" }
//! }
//! ```
//!
//! - tagged objects inline their fields next to the tag
//! - tagged lists hold their elements under `items`
//! - tagged enums and scalars hold their primitive under `value`
//! - leaves (times, quantities, arrays) use tags in the leaf namespace of
//!   the current tree context
//!
//! Decoding dispatches every non-leaf tag through
//! [`Registry::class_for_tag_compatible`], so documents written under an
//! older tag version still open.

use crate::error::{Result, TreeError};
use crate::models::{
    ArrayData, DType, EnumNode, ListNode, Mapping, NdArray, ObjectNode, Quantity, ScalarNode,
    Value,
};
use crate::registry::{NodeKind, Registry};
use crate::schema::literal_from_json;
use crate::tree::context::{current_tree_context, TimeFormat, TreeContext};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Map, Number, Value as JsonValue};
use std::path::Path;
use tracing::debug;

/// Key marking a tagged value
pub const TAG_KEY: &str = "!tag";

const LEAF_VERSION: &str = "1.0.0";

/// A persisted tree held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct TreeDocument {
    root: Value,
}

impl TreeDocument {
    pub fn new(root: impl Into<Value>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_root(self) -> Value {
        self.root
    }

    /// Encode the whole document
    pub fn to_json(&self) -> std::result::Result<JsonValue, TreeError> {
        encode_value(&self.root)
    }

    /// Decode a document, resolving tags against `registry`
    pub fn from_json(json: &JsonValue, registry: &Registry) -> Result<Self> {
        Ok(Self {
            root: decode_value(json, registry)?,
        })
    }

    pub fn to_string_pretty(&self) -> std::result::Result<String, TreeError> {
        Ok(serde_json::to_string_pretty(&self.to_json()?)?)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> std::result::Result<(), TreeError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_string_pretty()?)?;
        debug!("Wrote tree document {}", path.display());
        Ok(())
    }

    pub fn open(path: impl AsRef<Path>, registry: &Registry) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(TreeError::from)?;
        let json: JsonValue = serde_json::from_str(&text).map_err(TreeError::from)?;
        debug!("Read tree document {}", path.display());
        Self::from_json(&json, registry)
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode one value under the current tree context
///
/// # Errors
///
/// Returns `TreeError::Encode` for non-finite floats and for raw mappings
/// that already use the tag key.
pub fn encode_value(value: &Value) -> std::result::Result<JsonValue, TreeError> {
    let context = current_tree_context();
    encode(value, &context)
}

fn encode(value: &Value, context: &TreeContext) -> std::result::Result<JsonValue, TreeError> {
    match value {
        Value::Null => Ok(JsonValue::Null),
        Value::Bool(b) => Ok(JsonValue::Bool(*b)),
        Value::Int(i) => Ok(JsonValue::from(*i)),
        Value::Float(x) => encode_float(*x),
        Value::Str(s) => Ok(JsonValue::String(s.clone())),
        Value::Time(t) => {
            let mut doc = leaf_doc(context, "time");
            doc.insert("value".to_string(), encode_time(t, context.time_format)?);
            Ok(JsonValue::Object(doc))
        }
        Value::Quantity(q) => {
            let mut doc = leaf_doc(context, "quantity");
            doc.insert("value".to_string(), encode_float(q.value)?);
            doc.insert("unit".to_string(), JsonValue::String(q.unit.clone()));
            Ok(JsonValue::Object(doc))
        }
        Value::Array(array) => encode_array(array, context),
        Value::Mapping(map) => {
            if map.contains_key(TAG_KEY) {
                return Err(TreeError::encode(format!(
                    "mapping uses the reserved key '{}'",
                    TAG_KEY
                )));
            }
            Ok(JsonValue::Object(encode_mapping(map, context)?))
        }
        Value::Sequence(items) => encode_items(items, context),
        Value::Object(node) => {
            if node.has(TAG_KEY) {
                return Err(TreeError::encode(format!(
                    "object node uses the reserved key '{}'",
                    TAG_KEY
                )));
            }
            let mut doc = Map::new();
            if let Some(tag) = node.class().and_then(|class| class.tag()) {
                doc.insert(TAG_KEY.to_string(), JsonValue::String(tag.to_string()));
            }
            doc.extend(encode_mapping(node.storage(), context)?);
            Ok(JsonValue::Object(doc))
        }
        Value::List(node) => {
            let items = encode_items(node.items(), context)?;
            match node.class().and_then(|class| class.tag()) {
                Some(tag) => Ok(json!({ TAG_KEY: tag.to_string(), "items": items })),
                None => Ok(items),
            }
        }
        Value::Enum(node) => {
            let literal = encode(node.value(), context)?;
            match node.class().and_then(|class| class.tag()) {
                Some(tag) => Ok(json!({ TAG_KEY: tag.to_string(), "value": literal })),
                None => Ok(literal),
            }
        }
        Value::Scalar(node) => {
            let tag = node
                .class()
                .tag()
                .map(|tag| tag.to_string())
                .ok_or_else(|| {
                    TreeError::encode(format!("scalar class {} has no tag", node.class_name()))
                })?;
            Ok(json!({ TAG_KEY: tag, "value": encode(node.value(), context)? }))
        }
    }
}

fn encode_mapping(map: &Mapping, context: &TreeContext) -> std::result::Result<Map<String, JsonValue>, TreeError> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), encode(value, context)?)))
        .collect()
}

fn encode_items(items: &[Value], context: &TreeContext) -> std::result::Result<JsonValue, TreeError> {
    Ok(JsonValue::Array(
        items
            .iter()
            .map(|item| encode(item, context))
            .collect::<std::result::Result<Vec<_>, _>>()?,
    ))
}

fn encode_float(x: f64) -> std::result::Result<JsonValue, TreeError> {
    Number::from_f64(x)
        .map(JsonValue::Number)
        .ok_or_else(|| TreeError::encode(format!("non-finite float {}", x)))
}

fn encode_time(t: &DateTime<Utc>, format: TimeFormat) -> std::result::Result<JsonValue, TreeError> {
    match format {
        TimeFormat::Isot => Ok(JsonValue::String(t.to_rfc3339())),
        TimeFormat::Unix if t.timestamp_subsec_nanos() == 0 => Ok(JsonValue::from(t.timestamp())),
        TimeFormat::Unix => {
            encode_float(t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) / 1e9)
        }
    }
}

fn encode_array(array: &NdArray, context: &TreeContext) -> std::result::Result<JsonValue, TreeError> {
    let mut doc = leaf_doc(context, "ndarray");
    doc.insert("shape".to_string(), json!(array.shape()));
    doc.insert("datatype".to_string(), JsonValue::String(array.dtype().name().to_string()));
    match array.data() {
        ArrayData::Fill(fill) => {
            doc.insert("fill".to_string(), encode_float(*fill)?);
        }
        ArrayData::Values(values) => {
            let values = values
                .iter()
                .map(|x| encode_float(*x))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            doc.insert("data".to_string(), JsonValue::Array(values));
        }
    }
    if let Some(unit) = array.unit() {
        doc.insert("unit".to_string(), JsonValue::String(unit.to_string()));
    }
    Ok(JsonValue::Object(doc))
}

fn leaf_tag(context: &TreeContext, name: &str) -> String {
    format!("{}/{}-{}", context.leaf_namespace, name, LEAF_VERSION)
}

fn leaf_doc(context: &TreeContext, name: &str) -> Map<String, JsonValue> {
    let mut doc = Map::new();
    doc.insert(TAG_KEY.to_string(), JsonValue::String(leaf_tag(context, name)));
    doc
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode one value under the current tree context
pub fn decode_value(json: &JsonValue, registry: &Registry) -> Result<Value> {
    let context = current_tree_context();
    decode(json, registry, &context)
}

fn decode(json: &JsonValue, registry: &Registry, context: &TreeContext) -> Result<Value> {
    match json {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Array(items) => Ok(Value::Sequence(
            items
                .iter()
                .map(|item| decode(item, registry, context))
                .collect::<Result<Vec<_>>>()?,
        )),
        JsonValue::Object(doc) => match doc.get(TAG_KEY) {
            None => Ok(Value::Mapping(decode_fields(doc, registry, context)?)),
            Some(JsonValue::String(tag)) => decode_tagged(tag, doc, registry, context),
            Some(other) => Err(TreeError::decode(format!("tag must be a string, got {}", other)).into()),
        },
        literal => literal_from_json(literal)
            .ok_or_else(|| TreeError::decode(format!("unsupported literal {}", literal)).into()),
    }
}

fn decode_fields(doc: &Map<String, JsonValue>, registry: &Registry, context: &TreeContext) -> Result<Mapping> {
    doc.iter()
        .filter(|(key, _)| key.as_str() != TAG_KEY)
        .map(|(key, value)| Ok((key.clone(), decode(value, registry, context)?)))
        .collect()
}

fn decode_tagged(
    tag: &str,
    doc: &Map<String, JsonValue>,
    registry: &Registry,
    context: &TreeContext,
) -> Result<Value> {
    if let Some(leaf) = tag
        .strip_prefix(context.leaf_namespace.as_str())
        .and_then(|rest| rest.strip_prefix('/'))
    {
        return decode_leaf(leaf, doc, context).map_err(Into::into);
    }

    let class = registry.class_for_tag_compatible(tag)?;
    match class.kind() {
        NodeKind::Object => {
            let fields = decode_fields(doc, registry, context)?;
            Ok(Value::Object(ObjectNode::from_mapping(fields, Some(class))))
        }
        NodeKind::List => {
            let items = match doc.get("items") {
                Some(JsonValue::Array(items)) => items
                    .iter()
                    .map(|item| decode(item, registry, context))
                    .collect::<Result<Vec<_>>>()?,
                None => Vec::new(),
                Some(other) => {
                    return Err(TreeError::decode(format!("list items must be an array, got {}", other)).into())
                }
            };
            Ok(Value::List(ListNode::from_items(items, Some(class))))
        }
        NodeKind::Enum => {
            let value = decode(required(doc, "value", tag)?, registry, context)?;
            Ok(Value::Enum(EnumNode::for_class(class, value)?))
        }
        NodeKind::Scalar => {
            let value = decode(required(doc, "value", tag)?, registry, context)?;
            Ok(Value::Scalar(ScalarNode::new(class, value)?))
        }
    }
}

fn decode_leaf(
    leaf: &str,
    doc: &Map<String, JsonValue>,
    context: &TreeContext,
) -> std::result::Result<Value, TreeError> {
    let tag = format!("{}/{}", context.leaf_namespace, leaf);
    let name = leaf.rsplit_once('-').map(|(name, _)| name).unwrap_or(leaf);
    match name {
        "time" => decode_time(required(doc, "value", &tag)?).map(Value::Time),
        "quantity" => {
            let value = number(required(doc, "value", &tag)?, "quantity value")?;
            let unit = string(required(doc, "unit", &tag)?, "quantity unit")?;
            Ok(Value::Quantity(Quantity::new(value, unit)))
        }
        "ndarray" => decode_array(doc, &tag).map(Value::Array),
        other => Err(TreeError::decode(format!("unknown leaf type '{}'", other))),
    }
}

fn decode_time(json: &JsonValue) -> std::result::Result<DateTime<Utc>, TreeError> {
    match json {
        JsonValue::String(text) => DateTime::parse_from_rfc3339(text)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| TreeError::decode(format!("invalid time '{}': {}", text, e))),
        JsonValue::Number(n) => {
            let seconds = n
                .as_f64()
                .ok_or_else(|| TreeError::decode(format!("invalid unix time {}", n)))?;
            let whole = seconds.floor();
            let nanos = ((seconds - whole) * 1e9).round() as u32;
            Utc.timestamp_opt(whole as i64, nanos.min(999_999_999))
                .single()
                .ok_or_else(|| TreeError::decode(format!("unix time {} out of range", n)))
        }
        other => Err(TreeError::decode(format!("invalid time value {}", other))),
    }
}

fn decode_array(doc: &Map<String, JsonValue>, tag: &str) -> std::result::Result<NdArray, TreeError> {
    let shape = match required(doc, "shape", tag)? {
        JsonValue::Array(dims) => dims
            .iter()
            .map(|dim| {
                dim.as_u64()
                    .and_then(|d| usize::try_from(d).ok())
                    .ok_or_else(|| TreeError::decode(format!("invalid array dimension {}", dim)))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?,
        other => return Err(TreeError::decode(format!("array shape must be a list, got {}", other))),
    };
    if NdArray::element_count(&shape).is_none() {
        return Err(TreeError::decode(format!("array shape {:?} has too many elements", shape)));
    }
    let dtype: DType = string(required(doc, "datatype", tag)?, "datatype")?
        .parse()
        .map_err(|e| TreeError::decode(format!("{}", e)))?;

    let array = match (doc.get("fill"), doc.get("data")) {
        (Some(fill), None) => NdArray::filled(shape, dtype, number(fill, "array fill")?),
        (None, Some(JsonValue::Array(values))) => {
            let values = values
                .iter()
                .map(|x| number(x, "array element"))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            NdArray::from_values(shape, dtype, values).map_err(|e| TreeError::decode(format!("{}", e)))?
        }
        _ => {
            return Err(TreeError::decode(format!(
                "{} needs exactly one of 'fill' or a 'data' list",
                tag
            )))
        }
    };

    Ok(match doc.get("unit") {
        Some(unit) => array.with_unit(string(unit, "array unit")?),
        None => array,
    })
}

fn required<'a>(doc: &'a Map<String, JsonValue>, key: &str, tag: &str) -> std::result::Result<&'a JsonValue, TreeError> {
    doc.get(key)
        .ok_or_else(|| TreeError::decode(format!("{} is missing '{}'", tag, key)))
}

fn number(json: &JsonValue, what: &str) -> std::result::Result<f64, TreeError> {
    json.as_f64()
        .ok_or_else(|| TreeError::decode(format!("{} must be a number, got {}", what, json)))
}

fn string(json: &JsonValue, what: &str) -> std::result::Result<String, TreeError> {
    json.as_str()
        .map(str::to_string)
        .ok_or_else(|| TreeError::decode(format!("{} must be a string, got {}", what, json)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::context::with_tree_context;

    #[test]
    fn test_plain_values_round_trip() {
        let registry = Registry::new();
        let mut map = Mapping::new();
        map.insert("name".to_string(), Value::from("r0001"));
        map.insert("count".to_string(), Value::Int(3));
        map.insert("ratio".to_string(), Value::Float(0.5));
        map.insert(
            "tags".to_string(),
            Value::Sequence(vec![Value::Bool(true), Value::Null]),
        );
        let value = Value::Mapping(map);

        let json = encode_value(&value).unwrap();
        assert_eq!(decode_value(&json, &registry).unwrap(), value);
    }

    #[test]
    fn test_leaves_round_trip() {
        let registry = Registry::new();
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let array = NdArray::from_values(vec![2, 2], DType::UInt16, vec![1.0, 2.0, 3.0, 4.0])
            .unwrap()
            .with_unit("DN");

        for value in [
            Value::Time(time),
            Value::Quantity(Quantity::new(2.5, "s")),
            Value::Array(array),
            Value::Array(NdArray::zeros(vec![8, 4096, 4096], DType::Float32)),
        ] {
            let json = encode_value(&value).unwrap();
            assert_eq!(decode_value(&json, &registry).unwrap(), value);
        }
    }

    #[test]
    fn test_unix_time_format() {
        let registry = Registry::new();
        let time = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let unix = TreeContext {
            time_format: TimeFormat::Unix,
            ..TreeContext::default()
        };

        let json = with_tree_context(unix, || encode_value(&Value::Time(time))).unwrap();
        assert_eq!(json["value"], json!(1_577_836_800));
        // decoding accepts either form
        assert_eq!(decode_value(&json, &registry).unwrap(), Value::Time(time));
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        assert!(matches!(
            encode_value(&Value::Float(f64::NAN)),
            Err(TreeError::Encode(_))
        ));
        assert!(matches!(
            encode_value(&Value::Array(NdArray::filled(vec![2], DType::Float32, f64::INFINITY))),
            Err(TreeError::Encode(_))
        ));
    }

    #[test]
    fn test_reserved_tag_key_is_rejected() {
        let mut map = Mapping::new();
        map.insert(TAG_KEY.to_string(), Value::from("x"));
        assert!(matches!(
            encode_value(&Value::Mapping(map)),
            Err(TreeError::Encode(_))
        ));
    }

    #[test]
    fn test_unknown_tag_fails_to_decode() {
        let registry = Registry::new();
        let json = json!({ TAG_KEY: "https://example.org/tags/widget-1.0.0", "size": 1 });
        assert!(decode_value(&json, &registry).is_err());

        let leaf = json!({ TAG_KEY: "https://datamodels.org/leaf/table-1.0.0" });
        assert!(matches!(
            decode_value(&leaf, &registry),
            Err(crate::error::DataModelError::Tree(TreeError::Decode(_)))
        ));
    }

    #[test]
    fn test_overflowing_array_shape_is_rejected() {
        let registry = Registry::new();
        for body in [json!({"data": []}), json!({"fill": 0.0})] {
            let mut json = json!({
                TAG_KEY: "https://datamodels.org/leaf/ndarray-1.0.0",
                "shape": [4294967296u64, 4294967296u64, 16],
                "datatype": "float32"
            });
            for (key, value) in body.as_object().unwrap() {
                json[key] = value.clone();
            }
            assert!(matches!(
                decode_value(&json, &registry),
                Err(crate::error::DataModelError::Tree(TreeError::Decode(_)))
            ));
        }
    }

    #[test]
    fn test_write_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let registry = Registry::new();

        let mut map = Mapping::new();
        map.insert("value".to_string(), Value::Quantity(Quantity::new(1.0, "K")));
        let document = TreeDocument::new(Value::Mapping(map));
        document.write(&path).unwrap();

        let reopened = TreeDocument::open(&path, &registry).unwrap();
        assert_eq!(reopened, document);
    }
}
