//! Tag and Type Registry
//!
//! The [`Registry`] maps versioned tags to node classes, node classes to
//! their external data model wrappers, and `(owner class, field)` pairs to
//! implied classes. It is built once during bootstrap (see
//! [`DataModels`](crate::DataModels)) and read through shared references
//! afterwards; extension registration needs `&mut`.
//!
//! # Invariants
//!
//! - Each tag maps to exactly one class and each class carries at most one tag
//! - Each data model wraps at most one class
//! - A failed registration leaves the registry exactly as it was

mod manifest;
mod node_class;

pub use manifest::{class_name_for_tag, ImpliedDecl, ImpliedOwner, Manifest, TagDecl};
pub use node_class::{ClassRef, NodeClass, NodeKind, ScalarKind};

use crate::context::DataModels;
use crate::error::{DataModelError, RegistryError, Result};
use crate::models::{TagId, Value};
use crate::schema::{FieldKind, SchemaBinding, SchemaSource};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Custom default producer for one field of one class
pub type DefaultProducer = fn(&DataModels) -> Result<Value>;

#[derive(Debug, Clone)]
struct DefaultEntry {
    class: String,
    field: String,
    producer: DefaultProducer,
}

#[derive(Debug, Default)]
pub struct Registry {
    classes: BTreeMap<String, ClassRef>,
    tags: HashMap<String, String>,
    wrappers: HashMap<String, String>,
    models: HashMap<String, String>,
    implied: HashMap<(String, String), String>,
    defaults: Vec<DefaultEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a class under its name and, if tagged, its tag
    ///
    /// # Errors
    ///
    /// - `RegistryError::DuplicateTag` if another class owns the tag
    /// - `RegistryError::DuplicateClass` if the name is taken
    pub fn register(&mut self, class: NodeClass) -> std::result::Result<ClassRef, RegistryError> {
        if let Some(tag) = class.tag() {
            let tag = tag.to_string();
            if let Some(existing) = self.tags.get(&tag) {
                return Err(RegistryError::DuplicateTag {
                    tag,
                    existing: existing.clone(),
                    class: class.name().to_string(),
                });
            }
        }
        if self.classes.contains_key(class.name()) {
            return Err(RegistryError::DuplicateClass(class.name().to_string()));
        }

        let class = Arc::new(class);
        if let Some(tag) = class.tag() {
            self.tags.insert(tag.to_string(), class.name().to_string());
        }
        self.classes.insert(class.name().to_string(), class.clone());
        debug!("Registered class {} ({:?})", class.name(), class.kind());
        Ok(class)
    }

    /// Bind `model` as the external wrapper of `class`
    pub fn register_wrapper(&mut self, class: &str, model: &str) -> std::result::Result<(), RegistryError> {
        if !self.classes.contains_key(class) {
            return Err(RegistryError::UnknownClass(class.to_string()));
        }
        if let Some(existing) = self.models.get(model) {
            return Err(RegistryError::DuplicateWrapper {
                model: model.to_string(),
                existing: existing.clone(),
            });
        }
        if let Some(existing_model) = self.wrappers.get(class) {
            return Err(RegistryError::DuplicateWrapper {
                model: existing_model.clone(),
                existing: class.to_string(),
            });
        }

        self.wrappers.insert(class.to_string(), model.to_string());
        self.models.insert(model.to_string(), class.to_string());
        Ok(())
    }

    /// Record that `owner.field` holds instances of the implied class `class`
    pub fn register_implied(&mut self, owner: &str, field: &str, class: &str) {
        self.implied
            .insert((owner.to_string(), field.to_string()), class.to_string());
    }

    /// Register a custom default producer
    ///
    /// Producers for fields the class's schema does not declare make those
    /// fields "extra" fields, flushed by `FlushMode::Extra`.
    pub fn register_default(
        &mut self,
        class: &str,
        field: &str,
        producer: DefaultProducer,
    ) -> std::result::Result<(), RegistryError> {
        if !self.classes.contains_key(class) {
            return Err(RegistryError::UnknownClass(class.to_string()));
        }
        match self
            .defaults
            .iter_mut()
            .find(|entry| entry.class == class && entry.field == field)
        {
            Some(entry) => entry.producer = producer,
            None => self.defaults.push(DefaultEntry {
                class: class.to_string(),
                field: field.to_string(),
                producer,
            }),
        }
        Ok(())
    }

    /// Register every class a manifest declares
    ///
    /// Tagged classes are bound to their schemas first. Implied classes are
    /// then resolved in passes, each binding the classes whose owner is
    /// already registered, until none remain.
    ///
    /// # Errors
    ///
    /// - Schema load/binding failures
    /// - Registration conflicts
    /// - `RegistryError::UnresolvedImplied` when a pass makes no progress
    pub fn load_manifest(&mut self, manifest: &Manifest, schemas: &dyn SchemaSource) -> Result<usize> {
        let before = self.classes.len();

        for decl in &manifest.tags {
            let tag = decl.tag()?;
            let binding = SchemaBinding::bind(schemas, &decl.schema_uri)?;
            let mut class = NodeClass::new(decl.class_name()?, decl.kind)
                .with_tag(tag)
                .with_schema(decl.schema_uri.clone(), binding)
                .with_historical_schema_uris(decl.historical_schema_uris.clone());
            if decl.kind == NodeKind::Scalar {
                class = class.with_scalar(decl.scalar.unwrap_or_default());
            }
            if let Some(description) = &decl.description {
                class = class.with_description(description.clone());
            }
            if let Some(layout) = &decl.arrays {
                class = class.with_layout(layout.clone());
            }

            let class = self.register(class)?;
            if let Some(model) = &decl.model {
                self.register_wrapper(class.name(), model)?;
            }
        }

        let mut pending: Vec<&ImpliedDecl> = manifest.implied.iter().collect();
        while !pending.is_empty() {
            let count = pending.len();
            let mut remaining = Vec::new();
            for decl in pending {
                if !self.register_implied_decl(decl, schemas)? {
                    remaining.push(decl);
                }
            }
            if remaining.len() == count {
                let decl = remaining[0];
                let owners: Vec<String> = decl
                    .implied_by
                    .iter()
                    .map(|owner| format!("{}.{}", owner.class, owner.field))
                    .collect();
                return Err(RegistryError::UnresolvedImplied {
                    class: decl.class.clone(),
                    reason: format!("no owner among [{}] is registered", owners.join(", ")),
                }
                .into());
            }
            pending = remaining;
        }

        let added = self.classes.len() - before;
        info!("Loaded manifest {} ({} classes)", manifest.id, added);
        Ok(added)
    }

    /// Bind and register one implied class; `Ok(false)` if no owner is registered yet
    fn register_implied_decl(&mut self, decl: &ImpliedDecl, schemas: &dyn SchemaSource) -> Result<bool> {
        let Some((owner, owner_class)) = decl
            .implied_by
            .iter()
            .find_map(|owner| Some((owner, self.classes.get(&owner.class)?.clone())))
        else {
            return Ok(false);
        };

        let field = owner_class
            .binding()
            .ok_or_else(|| RegistryError::UnresolvedImplied {
                class: decl.class.clone(),
                reason: format!("owner {} has no schema", owner.class),
            })?
            .field_signature(&owner.field)?;
        if field.kind() != &FieldKind::Object {
            return Err(DataModelError::from(RegistryError::UnresolvedImplied {
                class: decl.class.clone(),
                reason: format!(
                    "{}.{} is a {} field, not an untagged object",
                    owner.class,
                    owner.field,
                    field.kind().label()
                ),
            }));
        }

        let mut class = NodeClass::new(decl.class.clone(), NodeKind::Object)
            .with_binding(field.sub_binding(schemas)?);
        for owner in &decl.implied_by {
            class = class.implied_by(owner.class.clone(), owner.field.clone());
        }
        if let Some(description) = &decl.description {
            class = class.with_description(description.clone());
        }
        if let Some(layout) = &decl.arrays {
            class = class.with_layout(layout.clone());
        }

        self.register(class)?;
        for owner in &decl.implied_by {
            self.register_implied(&owner.class, &owner.field, &decl.class);
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn class(&self, name: &str) -> std::result::Result<ClassRef, RegistryError> {
        self.classes
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownClass(name.to_string()))
    }

    pub fn contains_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Class registered under exactly `tag`
    pub fn class_for_tag(&self, tag: &str) -> std::result::Result<ClassRef, RegistryError> {
        self.tags
            .get(tag)
            .and_then(|name| self.classes.get(name))
            .cloned()
            .ok_or_else(|| RegistryError::UnknownTag(tag.to_string()))
    }

    /// Class for `tag`, tolerating version differences
    ///
    /// An exact match wins. A wildcard tag (`image-1.*`) selects the newest
    /// matching registered version. A concrete tag with no exact match (a
    /// document written by another release) falls back to the newest
    /// registered version of the same type, with a warning.
    pub fn class_for_tag_compatible(&self, tag: &str) -> std::result::Result<ClassRef, RegistryError> {
        if let Ok(class) = self.class_for_tag(tag) {
            return Ok(class);
        }

        let wanted: TagId = tag.parse()?;
        let candidates = self
            .classes
            .values()
            .filter_map(|class| class.tag().map(|tag| (tag, class)));

        if wanted.is_pattern() {
            return candidates
                .filter(|(registered, _)| registered.matches(&wanted))
                .max_by(|(a, _), (b, _)| a.cmp_version(b))
                .map(|(_, class)| class.clone())
                .ok_or_else(|| RegistryError::UnknownTag(tag.to_string()));
        }

        let (registered, class) = candidates
            .filter(|(registered, _)| registered.same_type(&wanted))
            .max_by(|(a, _), (b, _)| a.cmp_version(b))
            .ok_or_else(|| RegistryError::UnknownTag(tag.to_string()))?;
        warn!(
            "Tag {} is not registered; reading it as {} (class {})",
            tag,
            registered,
            class.name()
        );
        Ok(class.clone())
    }

    /// Tag of a registered class
    pub fn tag_for_class(&self, name: &str) -> std::result::Result<&TagId, RegistryError> {
        self.classes
            .get(name)
            .ok_or_else(|| RegistryError::UnknownClass(name.to_string()))?
            .tag()
            .ok_or_else(|| RegistryError::Untagged(name.to_string()))
    }

    /// Data model wrapping `class`, if any
    pub fn wrapper_for(&self, class: &str) -> Option<&str> {
        self.wrappers.get(class).map(String::as_str)
    }

    /// Class wrapped by the data model `model`
    pub fn class_for_wrapper(&self, model: &str) -> std::result::Result<ClassRef, RegistryError> {
        self.models
            .get(model)
            .and_then(|name| self.classes.get(name))
            .cloned()
            .ok_or_else(|| RegistryError::UnknownModel(model.to_string()))
    }

    /// Implied class stored under `owner.field`
    pub fn implied_class(&self, owner: &str, field: &str) -> Option<ClassRef> {
        self.implied
            .get(&(owner.to_string(), field.to_string()))
            .and_then(|name| self.classes.get(name))
            .cloned()
    }

    pub fn default_producer(&self, class: &str, field: &str) -> Option<DefaultProducer> {
        self.defaults
            .iter()
            .find(|entry| entry.class == class && entry.field == field)
            .map(|entry| entry.producer)
    }

    /// Fields with producers but no schema declaration, in registration order
    pub fn extra_fields(&self, class: &ClassRef) -> Vec<&str> {
        self.defaults
            .iter()
            .filter(|entry| entry.class == class.name() && !class.declares(&entry.field))
            .map(|entry| entry.field.as_str())
            .collect()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassRef> {
        self.classes.values()
    }

    /// `(tag, class name)` pairs, sorted by tag
    pub fn tags(&self) -> Vec<(&str, &str)> {
        let mut tags: Vec<(&str, &str)> = self
            .tags
            .iter()
            .map(|(tag, class)| (tag.as_str(), class.as_str()))
            .collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;
