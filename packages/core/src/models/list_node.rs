//! List Nodes
//!
//! A [`ListNode`] owns an ordered sequence of values. Equality and iteration
//! follow sequence order.

use crate::error::NodeError;
use crate::models::value::Value;
use crate::registry::ClassRef;

#[derive(Debug, Clone, Default)]
pub struct ListNode {
    class: Option<ClassRef>,
    items: Vec<Value>,
}

impl ListNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(class: ClassRef) -> Self {
        Self {
            class: Some(class),
            items: Vec::new(),
        }
    }

    /// Wrap an existing sequence without copying it
    pub fn from_items(items: Vec<Value>, class: Option<ClassRef>) -> Self {
        Self { class, items }
    }

    /// Wrap a raw sequence or re-class an existing list node
    pub fn from_value(value: Value, class: Option<ClassRef>) -> Result<Self, NodeError> {
        match value {
            Value::Sequence(items) => Ok(Self::from_items(items, class)),
            Value::List(mut node) => {
                if class.is_some() {
                    node.class = class;
                }
                Ok(node)
            }
            other => Err(NodeError::type_error(format!(
                "cannot build a list node from {}",
                other.type_name()
            ))),
        }
    }

    pub fn class(&self) -> Option<&ClassRef> {
        self.class.as_ref()
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class.as_ref().map(|class| class.name())
    }

    pub fn is_tagged(&self) -> bool {
        self.class
            .as_ref()
            .map(|class| class.tag().is_some())
            .unwrap_or(false)
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn get(&self, index: usize) -> Result<&Value, NodeError> {
        let len = self.items.len();
        self.items
            .get(index)
            .ok_or(NodeError::IndexOutOfRange { index, len })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Value, NodeError> {
        let len = self.items.len();
        self.items
            .get_mut(index)
            .ok_or(NodeError::IndexOutOfRange { index, len })
    }

    /// Replace the item at `index`, returning the previous one
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<Value, NodeError> {
        let slot = self.get_mut(index)?;
        Ok(std::mem::replace(slot, value.into()))
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push(value.into());
    }

    pub fn insert(&mut self, index: usize, value: impl Into<Value>) -> Result<(), NodeError> {
        let len = self.items.len();
        if index > len {
            return Err(NodeError::IndexOutOfRange { index, len });
        }
        self.items.insert(index, value.into());
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Value, NodeError> {
        let len = self.items.len();
        if index >= len {
            return Err(NodeError::IndexOutOfRange { index, len });
        }
        Ok(self.items.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Value> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn copy(&self) -> Self {
        self.clone()
    }
}

impl PartialEq for ListNode {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl From<Vec<Value>> for ListNode {
    fn from(items: Vec<Value>) -> Self {
        Self::from_items(items, None)
    }
}

impl<'a> IntoIterator for &'a ListNode {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ListNode {
        ListNode::from(vec![Value::from("a"), Value::from("b")])
    }

    #[test]
    fn test_index_access() {
        let mut list = sample();
        assert_eq!(list.get(1).unwrap(), &Value::from("b"));
        assert!(matches!(
            list.get(2),
            Err(NodeError::IndexOutOfRange { index: 2, len: 2 })
        ));

        let old = list.set(0, "z").unwrap();
        assert_eq!(old, Value::from("a"));
        assert_eq!(list.get(0).unwrap(), &Value::from("z"));
    }

    #[test]
    fn test_insert_and_remove() {
        let mut list = sample();
        list.insert(2, "c").unwrap();
        assert_eq!(list.len(), 3);
        assert!(list.insert(5, "x").is_err());
        assert_eq!(list.remove(0).unwrap(), Value::from("a"));
        assert!(list.remove(9).is_err());
        let items: Vec<_> = list.iter().filter_map(Value::as_str).collect();
        assert_eq!(items, vec!["b", "c"]);
    }

    #[test]
    fn test_from_value_rejects_mapping() {
        let result = ListNode::from_value(Value::Mapping(Default::default()), None);
        assert!(matches!(result, Err(NodeError::TypeError(_))));
    }

    #[test]
    fn test_copy_is_independent() {
        let original = sample();
        let mut copy = original.copy();
        copy.push("c");
        assert_eq!(original.len(), 2);
        assert_ne!(original, copy);
    }
}
