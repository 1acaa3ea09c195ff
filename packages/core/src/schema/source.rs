//! Schema Document Sources
//!
//! A [`SchemaSource`] resolves a schema URI to its parsed JSON document.
//! Documents are shared as `Arc<serde_json::Value>` since one document is
//! typically referenced from many bindings.

use crate::error::SchemaError;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Resolver from schema URI to parsed document
pub trait SchemaSource: Send + Sync {
    /// Load the document identified by `uri` (no fragment)
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotFound` when the source has no such document.
    fn load(&self, uri: &str) -> Result<Arc<JsonValue>, SchemaError>;
}

/// Schema documents held in memory, keyed by URI
#[derive(Debug, Clone, Default)]
pub struct MemorySchemaSource {
    documents: HashMap<String, Arc<JsonValue>>,
}

impl MemorySchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, document: JsonValue) {
        self.documents.insert(uri.into(), Arc::new(document));
    }

    /// Parse and insert a JSON document
    pub fn insert_str(&mut self, uri: impl Into<String>, text: &str) -> Result<(), SchemaError> {
        let uri = uri.into();
        let document = serde_json::from_str(text)
            .map_err(|e| SchemaError::malformed(uri.clone(), e.to_string()))?;
        self.insert(uri, document);
        Ok(())
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.documents.contains_key(uri)
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl SchemaSource for MemorySchemaSource {
    fn load(&self, uri: &str) -> Result<Arc<JsonValue>, SchemaError> {
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| SchemaError::not_found(uri))
    }
}

/// Schema documents read from disk, mapping URI prefixes to directories
///
/// `https://example.org/schemas/foo-1.0.0` under the root
/// `("https://example.org/schemas", "/srv/schemas")` is read from
/// `/srv/schemas/foo-1.0.0.json`. Parsed documents are cached.
#[derive(Debug, Default)]
pub struct DirectorySchemaSource {
    roots: Vec<(String, PathBuf)>,
    cache: RwLock<HashMap<String, Arc<JsonValue>>>,
}

impl DirectorySchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve URIs starting with `prefix` from `dir`
    pub fn with_root(mut self, prefix: impl Into<String>, dir: impl AsRef<Path>) -> Self {
        let prefix = prefix.into().trim_end_matches('/').to_string();
        self.roots.push((prefix, dir.as_ref().to_path_buf()));
        self
    }

    /// File path for a URI, if some root covers it
    pub fn path_for(&self, uri: &str) -> Option<PathBuf> {
        self.roots.iter().find_map(|(prefix, dir)| {
            let rest = uri.strip_prefix(prefix.as_str())?.trim_start_matches('/');
            if rest.is_empty() {
                return None;
            }
            let mut path = dir.join(rest);
            if path.extension().is_none() {
                path.set_extension("json");
            } else if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                // version suffixes such as `-1.0.0` look like extensions
                path = dir.join(format!("{}.json", rest));
            }
            Some(path)
        })
    }

    fn cached(&self, uri: &str) -> Option<Arc<JsonValue>> {
        self.cache.read().ok()?.get(uri).cloned()
    }
}

impl SchemaSource for DirectorySchemaSource {
    fn load(&self, uri: &str) -> Result<Arc<JsonValue>, SchemaError> {
        if let Some(document) = self.cached(uri) {
            return Ok(document);
        }

        let path = self.path_for(uri).ok_or_else(|| SchemaError::not_found(uri))?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SchemaError::not_found(uri));
            }
            Err(e) => return Err(e.into()),
        };
        let document: JsonValue = serde_json::from_str(&text)
            .map_err(|e| SchemaError::malformed(uri, e.to_string()))?;
        let document = Arc::new(document);

        debug!("Loaded schema {} from {}", uri, path.display());
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(uri.to_string(), document.clone());
        }
        Ok(document)
    }
}

/// Sources consulted in order; the first that has the document wins
#[derive(Default)]
pub struct ChainedSchemaSource {
    sources: Vec<Box<dyn SchemaSource>>,
}

impl ChainedSchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl SchemaSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl SchemaSource for ChainedSchemaSource {
    fn load(&self, uri: &str) -> Result<Arc<JsonValue>, SchemaError> {
        for source in &self.sources {
            match source.load(uri) {
                Err(SchemaError::NotFound { .. }) => continue,
                result => return result,
            }
        }
        Err(SchemaError::not_found(uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_memory_source() {
        let mut source = MemorySchemaSource::new();
        source.insert("https://example.org/schemas/a-1.0.0", json!({"type": "object"}));
        assert!(source.load("https://example.org/schemas/a-1.0.0").is_ok());
        assert!(matches!(
            source.load("https://example.org/schemas/b-1.0.0"),
            Err(SchemaError::NotFound { .. })
        ));
        assert!(source.insert_str("bad", "{not json").is_err());
    }

    #[test]
    fn test_directory_source_reads_and_caches() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a-1.0.0.json"), r#"{"title": "A"}"#).unwrap();

        let source = DirectorySchemaSource::new().with_root("https://example.org/schemas/", dir.path());
        let document = source.load("https://example.org/schemas/a-1.0.0").unwrap();
        assert_eq!(document["title"], "A");

        // served from cache once the file is gone
        std::fs::remove_file(dir.path().join("a-1.0.0.json")).unwrap();
        assert!(source.load("https://example.org/schemas/a-1.0.0").is_ok());

        assert!(matches!(
            source.load("https://example.org/schemas/missing-1.0.0"),
            Err(SchemaError::NotFound { .. })
        ));
        assert!(matches!(
            source.load("https://other.org/schemas/a-1.0.0"),
            Err(SchemaError::NotFound { .. })
        ));
    }

    #[test]
    fn test_chained_source_falls_through() {
        let mut first = MemorySchemaSource::new();
        first.insert("one", json!({"title": "first"}));
        let mut second = MemorySchemaSource::new();
        second.insert("one", json!({"title": "second"}));
        second.insert("two", json!({"title": "two"}));

        let chained = ChainedSchemaSource::new().with(first).with(second);
        assert_eq!(chained.load("one").unwrap()["title"], "first");
        assert_eq!(chained.load("two").unwrap()["title"], "two");
        assert!(chained.load("three").is_err());
    }
}
