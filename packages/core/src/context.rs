//! Data Model Context
//!
//! [`DataModels`] bundles everything node operations consult: the class
//! registry, the schema source and the runtime configuration. It is built
//! once at startup and passed by reference:
//!
//! ```rust,ignore
//! let ctx = DataModels::bundled()?;
//! let mut image = ctx.create("Image")?;
//! let data = image.get_or_init(&ctx, "data")?;
//! ```
//!
//! The context is `Send + Sync`; share it across threads behind an `Arc`.

use crate::config::RuntimeConfig;
use crate::error::{DataModelError, NodeError, Result};
use crate::models::{default_time, EnumNode, ListNode, ObjectNode, ScalarNode, Value, NONUM, NOSTR};
use crate::registry::{ClassRef, DefaultProducer, Manifest, NodeKind, Registry, ScalarKind};
use crate::schema::{bundled, SchemaSource};
use tracing::info;

pub struct DataModels {
    registry: Registry,
    schemas: Box<dyn SchemaSource>,
    config: RuntimeConfig,
}

impl DataModels {
    pub fn builder() -> DataModelsBuilder {
        DataModelsBuilder::default()
    }

    /// Context over the bundled manifest and schemas with default configuration
    pub fn bundled() -> Result<Self> {
        Self::builder().build()
    }

    pub fn bundled_with(config: RuntimeConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable registry, for extension registration after bootstrap
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn schemas(&self) -> &dyn SchemaSource {
        self.schemas.as_ref()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Register an additional manifest's classes
    pub fn load_manifest(&mut self, manifest: &Manifest) -> Result<usize> {
        self.registry.load_manifest(manifest, self.schemas.as_ref())
    }

    /// Fresh instance of a class: an empty object or list, the first enum
    /// literal, or a placeholder scalar
    pub fn instantiate(&self, class: &ClassRef) -> Result<Value> {
        match class.kind() {
            NodeKind::Object => Ok(Value::Object(ObjectNode::with_class(class.clone()))),
            NodeKind::List => Ok(Value::List(ListNode::with_class(class.clone()))),
            NodeKind::Enum => {
                let first = class.enum_literals().first().cloned().ok_or_else(|| {
                    NodeError::type_error(format!("enum class {} declares no literals", class.name()))
                })?;
                Ok(Value::Enum(EnumNode::for_class(class.clone(), first)?))
            }
            NodeKind::Scalar => {
                let placeholder = match class.scalar_kind().unwrap_or_default() {
                    ScalarKind::Str => Value::Str(NOSTR.to_string()),
                    ScalarKind::Int => Value::Int(NONUM),
                    ScalarKind::Float => Value::Float(NONUM as f64),
                    ScalarKind::Time => Value::Time(default_time()),
                };
                Ok(Value::Scalar(ScalarNode::new(class.clone(), placeholder)?))
            }
        }
    }

    /// Empty object node of the named class
    pub fn create(&self, class_name: &str) -> Result<ObjectNode> {
        let class = self.registry.class(class_name)?;
        match self.instantiate(&class)? {
            Value::Object(node) => Ok(node),
            other => Err(NodeError::type_error(format!(
                "class {} instantiates a {}, not an object node",
                class_name,
                other.type_name()
            ))
            .into()),
        }
    }
}

impl std::fmt::Debug for DataModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataModels")
            .field("classes", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`DataModels`]
///
/// Without further calls it loads the bundled manifest against the bundled
/// schemas with `RuntimeConfig::default()`.
#[derive(Default)]
pub struct DataModelsBuilder {
    schemas: Option<Box<dyn SchemaSource>>,
    config: Option<RuntimeConfig>,
    manifests: Vec<Manifest>,
    skip_bundled: bool,
    defaults: Vec<(String, String, DefaultProducer)>,
}

impl DataModelsBuilder {
    /// Schema source replacing the bundled one
    pub fn schemas(mut self, source: impl SchemaSource + 'static) -> Self {
        self.schemas = Some(Box::new(source));
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Additional manifest, loaded after the bundled one
    pub fn manifest(mut self, manifest: Manifest) -> Self {
        self.manifests.push(manifest);
        self
    }

    /// Do not load the bundled manifest
    pub fn without_bundled_manifest(mut self) -> Self {
        self.skip_bundled = true;
        self
    }

    pub fn default_producer(
        mut self,
        class: impl Into<String>,
        field: impl Into<String>,
        producer: DefaultProducer,
    ) -> Self {
        self.defaults.push((class.into(), field.into(), producer));
        self
    }

    pub fn build(self) -> Result<DataModels> {
        let config = self.config.unwrap_or_default();
        config.validate().map_err(DataModelError::Config)?;

        let schemas: Box<dyn SchemaSource> = match self.schemas {
            Some(source) => source,
            None => Box::new(bundled::source()?),
        };

        let mut manifests = Vec::new();
        if !self.skip_bundled {
            manifests.push(Manifest::builtin()?);
        }
        manifests.extend(self.manifests);

        let mut registry = Registry::new();
        for manifest in &manifests {
            registry.load_manifest(manifest, schemas.as_ref())?;
        }
        for (class, field, producer) in self.defaults {
            registry.register_default(&class, &field, producer)?;
        }

        info!(
            "Data model context ready: {} classes from {} manifest(s)",
            registry.len(),
            manifests.len()
        );

        Ok(DataModels {
            registry,
            schemas,
            config,
        })
    }
}
