//! Tree Values
//!
//! [`Value`] is the element type of every node container. It covers the plain
//! forms a persisted tree holds (scalars, mappings, sequences), the opaque
//! scientific leaves (times, quantities, numeric arrays), and the wrapped node
//! forms produced by lazy coercion.
//!
//! # Equality
//!
//! Equality is structural over the *flattened* form: a wrapped node compares
//! equal to the raw mapping, sequence or literal it wraps, and node classes
//! are ignored. This keeps `node == node_before_read` true even after a read
//! coerced a raw mapping into an `ObjectNode` in place.

use crate::error::NodeError;
use crate::models::{EnumNode, ListNode, ObjectNode, ScalarNode};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Plain string-keyed container held by object nodes
pub type Mapping = BTreeMap<String, Value>;

/// Placeholder for numeric fields filled in by default synthesis
pub const NONUM: i64 = -999_999;

/// Placeholder for string fields filled in by default synthesis
pub const NOSTR: &str = "?";

/// Element type of a numeric array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    UInt8,
    UInt16,
    UInt32,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl DType {
    pub fn name(&self) -> &'static str {
        match self {
            DType::Bool => "bool8",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }
}

impl FromStr for DType {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool8" | "bool" => Ok(DType::Bool),
            "uint8" => Ok(DType::UInt8),
            "uint16" => Ok(DType::UInt16),
            "uint32" => Ok(DType::UInt32),
            "int32" => Ok(DType::Int32),
            "int64" => Ok(DType::Int64),
            "float32" => Ok(DType::Float32),
            "float64" => Ok(DType::Float64),
            other => Err(NodeError::type_error(format!("unknown datatype '{}'", other))),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Array contents: either a constant fill or explicit values
///
/// Default arrays are constant-filled, so a production-size default costs
/// nothing until values are written.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Fill(f64),
    Values(Vec<f64>),
}

/// Opaque numeric array leaf with a shape, element type and optional unit
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    dtype: DType,
    shape: Vec<usize>,
    data: ArrayData,
    unit: Option<String>,
}

impl NdArray {
    /// Array of the given shape filled with a constant
    pub fn filled(shape: Vec<usize>, dtype: DType, fill: f64) -> Self {
        Self {
            dtype,
            shape,
            data: ArrayData::Fill(fill),
            unit: None,
        }
    }

    pub fn zeros(shape: Vec<usize>, dtype: DType) -> Self {
        Self::filled(shape, dtype, 0.0)
    }

    /// Element count of `shape`, `None` when it overflows `usize`
    pub fn element_count(shape: &[usize]) -> Option<usize> {
        shape.iter().try_fold(1usize, |count, dim| count.checked_mul(*dim))
    }

    /// Array from explicit values; the value count must match the shape
    pub fn from_values(shape: Vec<usize>, dtype: DType, values: Vec<f64>) -> Result<Self, NodeError> {
        let expected = Self::element_count(&shape).ok_or_else(|| {
            NodeError::type_error(format!("array shape {:?} has too many elements", shape))
        })?;
        if values.len() != expected {
            return Err(NodeError::type_error(format!(
                "array of shape {:?} needs {} values, got {}",
                shape,
                expected,
                values.len()
            )));
        }
        Ok(Self {
            dtype,
            shape,
            data: ArrayData::Values(values),
            unit: None,
        })
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total element count, saturating at `usize::MAX`
    pub fn len(&self) -> usize {
        Self::element_count(&self.shape).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }
}

/// Scalar physical quantity
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

/// Element of a node container
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Time(DateTime<Utc>),
    Quantity(Quantity),
    Array(NdArray),
    /// Raw mapping, not yet wrapped by a node
    Mapping(Mapping),
    /// Raw sequence, not yet wrapped by a node
    Sequence(Vec<Value>),
    Object(ObjectNode),
    List(ListNode),
    Enum(EnumNode),
    Scalar(ScalarNode),
}

impl Value {
    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Time(_) => "time",
            Value::Quantity(_) => "quantity",
            Value::Array(_) => "ndarray",
            Value::Mapping(_) => "mapping",
            Value::Sequence(_) => "sequence",
            Value::Object(_) => "object node",
            Value::List(_) => "list node",
            Value::Enum(_) => "enum node",
            Value::Scalar(_) => "scalar node",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Primitive leaf that a scalar or enum node can wrap
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Bool(_)
                | Value::Int(_)
                | Value::Float(_)
                | Value::Str(_)
                | Value::Time(_)
                | Value::Quantity(_)
        )
    }

    /// Node variants (anything carrying a class)
    pub fn is_node(&self) -> bool {
        matches!(
            self,
            Value::Object(_) | Value::List(_) | Value::Enum(_) | Value::Scalar(_)
        )
    }

    /// Node variants whose class carries a tag
    pub fn is_tagged(&self) -> bool {
        match self {
            Value::Object(node) => node.is_tagged(),
            Value::List(node) => node.is_tagged(),
            Value::Enum(node) => node.is_tagged(),
            Value::Scalar(_) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Enum(node) => node.value().as_str(),
            Value::Scalar(node) => node.value().as_str(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Enum(node) => node.value().as_i64(),
            Value::Scalar(node) => node.value().as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Scalar(node) => node.value().as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Time(t) => Some(t),
            Value::Scalar(node) => node.value().as_time(),
            _ => None,
        }
    }

    pub fn as_quantity(&self) -> Option<&Quantity> {
        match self {
            Value::Quantity(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut NdArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Value::Object(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectNode> {
        match self {
            Value::Object(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListNode> {
        match self {
            Value::List(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut ListNode> {
        match self {
            Value::List(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumNode> {
        match self {
            Value::Enum(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarNode> {
        match self {
            Value::Scalar(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            Value::Object(node) => Some(node.storage()),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            Value::List(node) => Some(node.items()),
            _ => None,
        }
    }

    /// View through node wrappers down to the container or literal they hold
    fn flat(&self) -> Flat<'_> {
        match self {
            Value::Mapping(map) => Flat::Map(map),
            Value::Object(node) => Flat::Map(node.storage()),
            Value::Sequence(items) => Flat::Seq(items),
            Value::List(node) => Flat::Seq(node.items()),
            Value::Enum(node) => node.value().flat(),
            Value::Scalar(node) => node.value().flat(),
            leaf => Flat::Leaf(leaf),
        }
    }
}

enum Flat<'a> {
    Leaf(&'a Value),
    Map(&'a Mapping),
    Seq(&'a [Value]),
}

/// Flattened equality of two mappings
pub(crate) fn mapping_eq(a: &Mapping, b: &Mapping) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(key, value)| b.get(key).map(|other| value == other).unwrap_or(false))
}

fn leaf_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Time(x), Value::Time(y)) => x == y,
        (Value::Quantity(x), Value::Quantity(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => x == y,
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.flat(), other.flat()) {
            (Flat::Map(a), Flat::Map(b)) => mapping_eq(a, b),
            (Flat::Seq(a), Flat::Seq(b)) => a == b,
            (Flat::Leaf(a), Flat::Leaf(b)) => leaf_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Quantity(q) => write!(f, "{} {}", q.value, q.unit),
            Value::Array(a) => write!(f, "ndarray<{}>{:?}", a.dtype(), a.shape()),
            Value::Enum(node) => write!(f, "{}", node.value()),
            Value::Scalar(node) => write!(f, "{}", node.value()),
            other => write!(f, "<{}>", other.type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Time(t)
    }
}

impl From<Quantity> for Value {
    fn from(q: Quantity) -> Self {
        Value::Quantity(q)
    }
}

impl From<NdArray> for Value {
    fn from(a: NdArray) -> Self {
        Value::Array(a)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Mapping(map)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<ObjectNode> for Value {
    fn from(node: ObjectNode) -> Self {
        Value::Object(node)
    }
}

impl From<ListNode> for Value {
    fn from(node: ListNode) -> Self {
        Value::List(node)
    }
}

impl From<EnumNode> for Value {
    fn from(node: EnumNode) -> Self {
        Value::Enum(node)
    }
}

impl From<ScalarNode> for Value {
    fn from(node: ScalarNode) -> Self {
        Value::Scalar(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_mapping_equals_raw_mapping() {
        let mut map = Mapping::new();
        map.insert("a".to_string(), Value::Int(1));
        let raw = Value::Mapping(map.clone());
        let wrapped = Value::Object(ObjectNode::from_mapping(map, None));
        assert_eq!(raw, wrapped);
    }

    #[test]
    fn test_sequence_equality_is_ordered() {
        let a = Value::Sequence(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::Sequence(vec![Value::Int(2), Value::Int(1)]);
        assert_ne!(a, b);
        assert_eq!(a, Value::List(ListNode::from_items(vec![Value::Int(1), Value::Int(2)], None)));
    }

    #[test]
    fn test_int_and_float_are_distinct_leaves() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Int(1).as_f64(), Some(1.0));
    }

    #[test]
    fn test_array_from_values_checks_length() {
        assert!(NdArray::from_values(vec![2, 2], DType::Float32, vec![0.0; 4]).is_ok());
        assert!(NdArray::from_values(vec![2, 2], DType::Float32, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_element_count_overflow() {
        let huge = vec![usize::MAX, 2];
        assert_eq!(NdArray::element_count(&huge), None);
        assert!(NdArray::from_values(huge.clone(), DType::Float32, Vec::new()).is_err());
        assert_eq!(NdArray::zeros(huge, DType::Float32).len(), usize::MAX);
        assert_eq!(NdArray::element_count(&[]), Some(1));
    }

    #[test]
    fn test_default_array_is_fill_backed() {
        let array = NdArray::zeros(vec![8, 4096, 4096], DType::Float32);
        assert_eq!(array.len(), 8 * 4096 * 4096);
        assert_eq!(array.data(), &ArrayData::Fill(0.0));
    }

    #[test]
    fn test_dtype_names_round_trip() {
        for dtype in [DType::UInt16, DType::Float32, DType::Bool] {
            assert_eq!(dtype.name().parse::<DType>().unwrap(), dtype);
        }
    }
}
