//! Current tree context
//!
//! Document encoding reads its conventions (time format, leaf tag namespace)
//! from the innermost context installed with [`with_tree_context`] on the
//! current thread, falling back to [`TreeContext::default`].

use crate::models::LEAF_NAMESPACE;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// Encoding of time leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    /// RFC 3339 string
    #[default]
    Isot,
    /// Seconds since the Unix epoch
    Unix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeContext {
    pub leaf_namespace: String,
    pub time_format: TimeFormat,
}

impl Default for TreeContext {
    fn default() -> Self {
        Self {
            leaf_namespace: LEAF_NAMESPACE.to_string(),
            time_format: TimeFormat::default(),
        }
    }
}

thread_local! {
    static CONTEXTS: RefCell<Vec<TreeContext>> = const { RefCell::new(Vec::new()) };
}

/// Pops the installed context even if the closure panics
struct Installed;

impl Drop for Installed {
    fn drop(&mut self) {
        CONTEXTS.with(|contexts| {
            contexts.borrow_mut().pop();
        });
    }
}

/// Run `f` with `context` as the current tree context
pub fn with_tree_context<T>(context: TreeContext, f: impl FnOnce() -> T) -> T {
    CONTEXTS.with(|contexts| contexts.borrow_mut().push(context));
    let _installed = Installed;
    f()
}

/// The innermost installed context, or the default
pub fn current_tree_context() -> TreeContext {
    CONTEXTS.with(|contexts| contexts.borrow().last().cloned().unwrap_or_default())
}
