//! Flushing
//!
//! Before a node is persisted its missing fields are filled in by reading
//! them through the field resolver. Which fields count is set by
//! [`FlushMode`]:
//!
//! - `None` - nothing
//! - `Required` - the schema's required fields
//! - `All` - every declared field
//! - `Extra` - every declared field plus fields that only have a registered
//!   default producer
//!
//! Fields are visited in the schema's declared property order, so two
//! flushes of differently populated nodes produce the same field set.

use crate::context::DataModels;
use crate::error::Result;
use crate::models::{ObjectNode, Value};
use crate::registry::ClassRef;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushMode {
    None,
    #[default]
    Required,
    All,
    Extra,
}

/// Field set, warning and depth policy for a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushOptions {
    pub mode: FlushMode,
    /// Warn for each field filled with a default
    pub warn: bool,
    /// Flush child object nodes (and object nodes inside lists) too
    pub recurse: bool,
}

impl FlushOptions {
    pub const NONE: Self = Self::new(FlushMode::None);
    pub const REQUIRED: Self = Self::new(FlushMode::Required);
    pub const ALL: Self = Self::new(FlushMode::All);
    pub const EXTRA: Self = Self::new(FlushMode::Extra);

    pub const fn new(mode: FlushMode) -> Self {
        Self {
            mode,
            warn: false,
            recurse: false,
        }
    }

    pub const fn with_warn(mut self, warn: bool) -> Self {
        self.warn = warn;
        self
    }

    pub const fn with_recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }
}

impl Default for FlushOptions {
    fn default() -> Self {
        Self::REQUIRED
    }
}

/// Field names a flush visits for `class`, in visiting order
pub fn flush_fields(ctx: &DataModels, class: &ClassRef, mode: FlushMode) -> Vec<String> {
    let Some(binding) = class.binding() else {
        return Vec::new();
    };

    let mut names: Vec<String> = match mode {
        FlushMode::None => return Vec::new(),
        FlushMode::Required => binding
            .field_names()
            .filter(|name| binding.is_required(name))
            .map(str::to_string)
            .collect(),
        FlushMode::All | FlushMode::Extra => binding.field_names().map(str::to_string).collect(),
    };

    // required names declared only through patterns or not at all
    for name in binding.required_fields() {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }

    if mode == FlushMode::Extra {
        for name in ctx.registry().extra_fields(class) {
            if !names.iter().any(|existing| existing == name) {
                names.push(name.to_string());
            }
        }
    }

    names
}

impl ObjectNode {
    /// Fill missing fields with their defaults according to `options`
    ///
    /// Fields already stored are never recomputed.
    pub fn flush(&mut self, ctx: &DataModels, options: &FlushOptions) -> Result<()> {
        if let Some(class) = self.class().cloned() {
            for name in flush_fields(ctx, &class, options.mode) {
                if self.has(&name) {
                    continue;
                }
                if options.warn {
                    warn!("Filling missing field {}.{} with its default", class.name(), name);
                } else {
                    debug!("Flushing {}.{}", class.name(), name);
                }
                self.get_or_init(ctx, &name)?;
            }

            if options.recurse {
                // wrap stored raw children so they get flushed as nodes
                let declared: Vec<String> = self
                    .keys()
                    .filter(|key| class.declares(key))
                    .map(str::to_string)
                    .collect();
                for key in declared {
                    self.get_or_init(ctx, &key)?;
                }
            }
        }

        if options.recurse {
            for key in self.keys().map(str::to_string).collect::<Vec<_>>() {
                if let Some(child) = self.get_mut(&key) {
                    flush_value(child, ctx, options)?;
                }
            }
        }

        Ok(())
    }
}

fn flush_value(value: &mut Value, ctx: &DataModels, options: &FlushOptions) -> Result<()> {
    match value {
        Value::Object(node) => node.flush(ctx, options),
        Value::List(list) => list
            .iter_mut()
            .try_for_each(|item| flush_value(item, ctx, options)),
        Value::Sequence(items) => items
            .iter_mut()
            .try_for_each(|item| flush_value(item, ctx, options)),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "flush_test.rs"]
mod flush_test;
