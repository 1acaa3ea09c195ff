//! Tag Identifiers and Attribute Aliases
//!
//! A tag is a versioned type marker of the form `<namespace>/<name>-<version>`,
//! for example `https://datamodels.org/tags/image-1.0.0`. The same string
//! marks a value's type in a persisted tree and selects the schema used to
//! describe it.
//!
//! Versions may end in `*` when used as a pattern (`quantity-1.*`), which is
//! how schemas refer to leaf types without pinning a patch release.

use crate::error::RegistryError;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Namespace of the opaque leaf tags (`ndarray`, `time`, `quantity`)
pub const LEAF_NAMESPACE: &str = "https://datamodels.org/leaf";

/// Parsed `<namespace>/<name>-<version>` tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagId {
    namespace: String,
    name: String,
    version: String,
}

impl TagId {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `<namespace>/<name>` without the version
    pub fn base(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Whether this version is a wildcard pattern
    pub fn is_pattern(&self) -> bool {
        self.version.ends_with('*')
    }

    /// True when both tags name the same type, regardless of version
    pub fn same_type(&self, other: &TagId) -> bool {
        self.namespace == other.namespace && self.name == other.name
    }

    /// Match this (concrete) tag against a possibly wildcarded pattern
    ///
    /// ```ignore
    /// let tag: TagId = "https://datamodels.org/leaf/quantity-1.1.0".parse()?;
    /// let pattern: TagId = "https://datamodels.org/leaf/quantity-1.*".parse()?;
    /// assert!(tag.matches(&pattern));
    /// ```
    pub fn matches(&self, pattern: &TagId) -> bool {
        if !self.same_type(pattern) {
            return false;
        }
        match pattern.version.strip_suffix('*') {
            Some(prefix) => self.version.starts_with(prefix),
            None => self.version == pattern.version,
        }
    }

    /// Compare versions numerically component by component
    pub fn cmp_version(&self, other: &TagId) -> Ordering {
        version_key(&self.version).cmp(&version_key(&other.version))
    }
}

fn version_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect()
}

impl FromStr for TagId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RegistryError::InvalidTag(s.to_string());
        let (namespace, rest) = s.rsplit_once('/').ok_or_else(invalid)?;
        let (name, version) = rest.rsplit_once('-').ok_or_else(invalid)?;

        let version_ok = version
            .chars()
            .next()
            .map(|c| c.is_ascii_digit() || c == '*')
            .unwrap_or(false);
        if namespace.is_empty() || name.is_empty() || !version_ok {
            return Err(invalid());
        }

        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{}", self.namespace, self.name, self.version)
    }
}

/// Rust keywords; schema fields with these names get a `_` suffixed alias
pub const RESERVED_WORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

/// Map an attribute name to its storage key (`type_` -> `type`)
pub fn attr_to_key(attr: &str) -> &str {
    match attr.strip_suffix('_') {
        Some(base) if is_reserved(base) => base,
        _ => attr,
    }
}

/// Map a storage key to its attribute name (`type` -> `type_`)
pub fn key_to_attr(key: &str) -> Cow<'_, str> {
    if is_reserved(key) {
        Cow::Owned(format!("{}_", key))
    } else {
        Cow::Borrowed(key)
    }
}
