//! Data Models
//!
//! A [`DataModel`] is the external wrapper around one root tagged node, the
//! unit that is opened from and saved to a tree document. The registry's
//! wrapper table decides which classes can be wrapped and under which model
//! name (`Image` is wrapped by `ImageModel`, and so on).

use crate::context::DataModels;
use crate::error::{NodeError, RegistryError, Result};
use crate::models::{ObjectNode, Value};
use crate::tree::{FlushMode, FlushOptions, TreeDocument};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct DataModel {
    model_type: String,
    node: ObjectNode,
}

impl DataModel {
    /// Empty model of the named wrapper type
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownModel` when no class is wrapped by
    /// `model_type`.
    pub fn new(ctx: &DataModels, model_type: &str) -> Result<Self> {
        let class = ctx.registry().class_for_wrapper(model_type)?;
        Ok(Self {
            model_type: model_type.to_string(),
            node: ctx.create(class.name())?,
        })
    }

    /// Wrap an existing root node
    ///
    /// # Errors
    ///
    /// - `NodeError::TypeError` for an untyped node
    /// - `RegistryError::UnknownModel` when the node's class has no wrapper
    pub fn from_node(ctx: &DataModels, node: ObjectNode) -> Result<Self> {
        let class = node
            .class_name()
            .ok_or_else(|| NodeError::type_error("a data model needs a typed root node"))?;
        let model_type = ctx
            .registry()
            .wrapper_for(class)
            .ok_or_else(|| RegistryError::UnknownModel(format!("(none wraps {})", class)))?
            .to_string();
        Ok(Self { model_type, node })
    }

    /// Read a model from a tree document
    ///
    /// The root's tag selects the class (older tag versions resolve to the
    /// newest registered one); the class must have a wrapper.
    pub fn open(ctx: &DataModels, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = TreeDocument::open(path, ctx.registry())?;
        let model = match document.into_root() {
            Value::Object(node) if node.is_tagged() => Self::from_node(ctx, node)?,
            other => {
                return Err(NodeError::type_error(format!(
                    "{} does not hold a tagged object at its root (found {})",
                    path.display(),
                    other.type_name()
                ))
                .into())
            }
        };
        info!("Opened {} from {}", model.model_type, path.display());
        Ok(model)
    }

    /// Flush required fields (recursively) and write the tree document
    pub fn save(&mut self, ctx: &DataModels, path: impl AsRef<Path>) -> Result<()> {
        let options = FlushOptions::new(FlushMode::Required)
            .with_warn(ctx.config().flush_warn)
            .with_recurse(true);
        self.save_with(ctx, path, &options)
    }

    /// Flush with `options`, then write the tree document
    pub fn save_with(&mut self, ctx: &DataModels, path: impl AsRef<Path>, options: &FlushOptions) -> Result<()> {
        let path = path.as_ref();
        self.node.flush(ctx, options)?;

        let root = ObjectNode::from_mapping(self.node.to_tree(), self.node.class().cloned());
        TreeDocument::new(root).write(path)?;
        info!("Saved {} to {}", self.model_type, path.display());
        Ok(())
    }

    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn node(&self) -> &ObjectNode {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut ObjectNode {
        &mut self.node
    }

    pub fn into_node(self) -> ObjectNode {
        self.node
    }

    /// Resolved field read on the root node
    pub fn get(&mut self, ctx: &DataModels, name: &str) -> Result<&mut Value> {
        self.node.get_or_init(ctx, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::error::DataModelError;

    #[test]
    fn test_new_by_model_name() {
        let ctx = DataModels::bundled_with(RuntimeConfig::testing()).unwrap();
        let model = DataModel::new(&ctx, "RampModel").unwrap();
        assert_eq!(model.model_type(), "RampModel");
        assert_eq!(model.node().class_name(), Some("Ramp"));

        assert!(matches!(
            DataModel::new(&ctx, "NoSuchModel"),
            Err(DataModelError::Registry(RegistryError::UnknownModel(_)))
        ));
    }

    #[test]
    fn test_from_node_requires_wrapper() {
        let ctx = DataModels::bundled().unwrap();
        assert!(DataModel::from_node(&ctx, ctx.create("Image").unwrap()).is_ok());
        assert!(DataModel::from_node(&ctx, ctx.create("ImageMeta").unwrap()).is_err());
        assert!(DataModel::from_node(&ctx, ObjectNode::new()).is_err());
    }

    #[test]
    fn test_open_rejects_untagged_root() {
        let ctx = DataModels::bundled().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.json");
        std::fs::write(&path, r#"{"filename": "x"}"#).unwrap();

        assert!(matches!(
            DataModel::open(&ctx, &path),
            Err(DataModelError::Node(NodeError::TypeError(_)))
        ));
    }
}
