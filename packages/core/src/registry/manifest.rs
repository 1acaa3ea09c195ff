//! Manifest Declarations
//!
//! A manifest lists the tags a catalog provides and the implied classes
//! reached through their fields:
//!
//! ```json
//! {
//!   "id": "https://datamodels.org/manifests/datamodels-1.0.0",
//!   "tags": [
//!     {
//!       "tag_uri": "https://datamodels.org/tags/image-1.0.0",
//!       "schema_uri": "https://datamodels.org/schemas/image-1.0.0",
//!       "kind": "object",
//!       "model": "ImageModel",
//!       "arrays": {"primary": "data", "rules": {"amp33": "amp33"}}
//!     }
//!   ],
//!   "implied": [
//!     {"class": "ImageMeta", "implied_by": [{"class": "Image", "field": "meta"}]}
//!   ]
//! }
//! ```
//!
//! The same document drives `build.rs`, which emits one typed struct per
//! declared class.

use crate::arrays::ArrayLayout;
use crate::error::{RegistryError, SchemaError};
use crate::models::TagId;
use crate::registry::node_class::{NodeKind, ScalarKind};
use crate::schema::bundled;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagDecl>,
    #[serde(default)]
    pub implied: Vec<ImpliedDecl>,
}

/// One tagged class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDecl {
    pub tag_uri: String,
    pub schema_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Class name; defaults to the PascalCase tag name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<ScalarKind>,
    /// External data model wrapping this class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrays: Option<ArrayLayout>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub historical_schema_uris: Vec<String>,
}

impl TagDecl {
    pub fn tag(&self) -> Result<TagId, RegistryError> {
        self.tag_uri.parse()
    }

    /// Declared class name, or the PascalCase tag name
    pub fn class_name(&self) -> Result<String, RegistryError> {
        match &self.class {
            Some(class) => Ok(class.clone()),
            None => Ok(class_name_for_tag(self.tag()?.name())),
        }
    }
}

/// One implied class and the `(class, field)` pairs that own it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpliedDecl {
    pub class: String,
    pub implied_by: Vec<ImpliedOwner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrays: Option<ArrayLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpliedOwner {
    pub class: String,
    pub field: String,
}

impl Manifest {
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(text).map_err(|e| SchemaError::malformed("manifest", e.to_string()))
    }

    /// The manifest bundled with the crate
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::from_json(bundled::MANIFEST)
    }

    /// Number of classes the manifest declares
    pub fn class_count(&self) -> usize {
        self.tags.len() + self.implied.len()
    }
}

/// `science_raw` -> `ScienceRaw`, `ref-file` -> `RefFile`
pub fn class_name_for_tag(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_for_tag() {
        assert_eq!(class_name_for_tag("image"), "Image");
        assert_eq!(class_name_for_tag("science_raw"), "ScienceRaw");
        assert_eq!(class_name_for_tag("ref-file"), "RefFile");
    }

    #[test]
    fn test_parse_minimal_manifest() {
        let manifest = Manifest::from_json(
            r#"{
                "id": "https://example.org/manifests/test-1.0.0",
                "tags": [
                    {
                        "tag_uri": "https://example.org/tags/widget-1.0.0",
                        "schema_uri": "https://example.org/schemas/widget-1.0.0"
                    }
                ]
            }"#,
        )
        .unwrap();

        let decl = &manifest.tags[0];
        assert_eq!(decl.kind, NodeKind::Object);
        assert_eq!(decl.class_name().unwrap(), "Widget");
        assert!(manifest.implied.is_empty());
    }

    #[test]
    fn test_builtin_manifest_parses() {
        let manifest = Manifest::builtin().unwrap();
        assert!(manifest.tags.iter().any(|decl| decl.model.as_deref() == Some("ImageModel")));
        assert!(manifest.implied.iter().any(|decl| decl.class == "Exposure"));
    }

    #[test]
    fn test_malformed_manifest() {
        assert!(matches!(
            Manifest::from_json(r#"{"tags": []}"#),
            Err(SchemaError::Malformed { .. })
        ));
    }
}
