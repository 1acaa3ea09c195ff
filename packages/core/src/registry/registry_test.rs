//! Tests for the tag and type registry
//!
//! Covers registration conflicts (and that they leave the registry
//! untouched), wrapper and implied lookups, version-tolerant tag lookup and
//! manifest loading against small in-memory schemas.

#[cfg(test)]
mod tests {
    use crate::error::{DataModelError, RegistryError};
    use crate::models::TagId;
    use crate::registry::{Manifest, NodeClass, NodeKind, Registry};
    use crate::schema::MemorySchemaSource;
    use serde_json::json;

    fn tag(text: &str) -> TagId {
        text.parse().unwrap()
    }

    fn tagged(name: &str, tag_uri: &str) -> NodeClass {
        NodeClass::new(name, NodeKind::Object).with_tag(tag(tag_uri))
    }

    fn widget_schemas() -> MemorySchemaSource {
        let mut source = MemorySchemaSource::new();
        source.insert(
            "https://example.org/schemas/widget-1.0.0",
            json!({
                "type": "object",
                "properties": {
                    "meta": {
                        "type": "object",
                        "properties": {
                            "owner": {"type": "string"},
                            "origin": {
                                "type": "object",
                                "properties": {"site": {"type": "string"}}
                            }
                        }
                    },
                    "size": {"type": "integer"}
                },
                "required": ["meta"]
            }),
        );
        source
    }

    fn widget_manifest(implied: serde_json::Value) -> Manifest {
        serde_json::from_value(json!({
            "id": "https://example.org/manifests/widgets-1.0.0",
            "tags": [{
                "tag_uri": "https://example.org/tags/widget-1.0.0",
                "schema_uri": "https://example.org/schemas/widget-1.0.0",
                "model": "WidgetModel"
            }],
            "implied": implied
        }))
        .unwrap()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    #[test]
    fn test_register_and_round_trip() {
        let mut registry = Registry::new();
        registry
            .register(tagged("Widget", "https://example.org/tags/widget-1.0.0"))
            .unwrap();

        let tag = registry.tag_for_class("Widget").unwrap().to_string();
        let class = registry.class_for_tag(&tag).unwrap();
        assert_eq!(class.name(), "Widget");
    }

    #[test]
    fn test_duplicate_tag_leaves_registry_unchanged() {
        let mut registry = Registry::new();
        registry
            .register(tagged("Widget", "https://example.org/tags/widget-1.0.0"))
            .unwrap();
        let tags_before: Vec<(String, String)> = registry
            .tags()
            .into_iter()
            .map(|(t, c)| (t.to_string(), c.to_string()))
            .collect();

        let result = registry.register(tagged("Gadget", "https://example.org/tags/widget-1.0.0"));

        assert_eq!(
            result.unwrap_err(),
            RegistryError::DuplicateTag {
                tag: "https://example.org/tags/widget-1.0.0".to_string(),
                existing: "Widget".to_string(),
                class: "Gadget".to_string(),
            }
        );
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains_class("Gadget"));
        let tags_after: Vec<(String, String)> = registry
            .tags()
            .into_iter()
            .map(|(t, c)| (t.to_string(), c.to_string()))
            .collect();
        assert_eq!(tags_before, tags_after);
    }

    #[test]
    fn test_duplicate_class_name() {
        let mut registry = Registry::new();
        registry
            .register(tagged("Widget", "https://example.org/tags/widget-1.0.0"))
            .unwrap();
        let result = registry.register(tagged("Widget", "https://example.org/tags/widget-2.0.0"));
        assert_eq!(result.unwrap_err(), RegistryError::DuplicateClass("Widget".to_string()));
        assert!(registry
            .class_for_tag("https://example.org/tags/widget-2.0.0")
            .is_err());
    }

    #[test]
    fn test_untagged_class_has_no_tag() {
        let mut registry = Registry::new();
        registry
            .register(NodeClass::new("Loose", NodeKind::Object))
            .unwrap();
        assert_eq!(
            registry.tag_for_class("Loose").unwrap_err(),
            RegistryError::Untagged("Loose".to_string())
        );
        assert_eq!(
            registry.tag_for_class("Nope").unwrap_err(),
            RegistryError::UnknownClass("Nope".to_string())
        );
    }

    // ========================================================================
    // Wrappers
    // ========================================================================

    #[test]
    fn test_wrappers_are_injective() {
        let mut registry = Registry::new();
        registry
            .register(tagged("Widget", "https://example.org/tags/widget-1.0.0"))
            .unwrap();
        registry
            .register(tagged("Gadget", "https://example.org/tags/gadget-1.0.0"))
            .unwrap();

        registry.register_wrapper("Widget", "WidgetModel").unwrap();
        assert_eq!(registry.wrapper_for("Widget"), Some("WidgetModel"));
        assert_eq!(registry.wrapper_for("Gadget"), None);
        assert_eq!(registry.class_for_wrapper("WidgetModel").unwrap().name(), "Widget");

        assert!(matches!(
            registry.register_wrapper("Gadget", "WidgetModel"),
            Err(RegistryError::DuplicateWrapper { .. })
        ));
        assert!(matches!(
            registry.register_wrapper("Widget", "OtherModel"),
            Err(RegistryError::DuplicateWrapper { .. })
        ));
        assert_eq!(
            registry.register_wrapper("Missing", "MissingModel"),
            Err(RegistryError::UnknownClass("Missing".to_string()))
        );
        assert_eq!(registry.wrapper_for("Gadget"), None);
    }

    // ========================================================================
    // Version-tolerant lookup
    // ========================================================================

    #[test]
    fn test_compatible_lookup() {
        let mut registry = Registry::new();
        registry
            .register(tagged("WidgetV1", "https://example.org/tags/widget-1.0.0"))
            .unwrap();
        registry
            .register(tagged("WidgetV11", "https://example.org/tags/widget-1.1.0"))
            .unwrap();
        registry
            .register(tagged("WidgetV2", "https://example.org/tags/widget-2.0.0"))
            .unwrap();

        let exact = registry
            .class_for_tag_compatible("https://example.org/tags/widget-1.0.0")
            .unwrap();
        assert_eq!(exact.name(), "WidgetV1");

        let pattern = registry
            .class_for_tag_compatible("https://example.org/tags/widget-1.*")
            .unwrap();
        assert_eq!(pattern.name(), "WidgetV11");

        let older = registry
            .class_for_tag_compatible("https://example.org/tags/widget-0.9.0")
            .unwrap();
        assert_eq!(older.name(), "WidgetV2");

        assert!(registry
            .class_for_tag_compatible("https://example.org/tags/gizmo-1.0.0")
            .is_err());
        assert!(registry.class_for_tag("https://example.org/tags/widget-0.9.0").is_err());
    }

    // ========================================================================
    // Manifest loading
    // ========================================================================

    #[test]
    fn test_load_manifest_resolves_implied_chain() {
        let source = widget_schemas();
        // listed child-first so resolution needs a second pass
        let manifest = widget_manifest(json!([
            {"class": "WidgetOrigin", "implied_by": [{"class": "WidgetMeta", "field": "origin"}]},
            {"class": "WidgetMeta", "implied_by": [{"class": "Widget", "field": "meta"}]}
        ]));

        let mut registry = Registry::new();
        let added = registry.load_manifest(&manifest, &source).unwrap();
        assert_eq!(added, 3);

        let meta = registry.implied_class("Widget", "meta").unwrap();
        assert_eq!(meta.name(), "WidgetMeta");
        assert!(meta.declares("owner"));
        assert!(meta.is_implied());

        let origin = registry.implied_class("WidgetMeta", "origin").unwrap();
        assert!(origin.declares("site"));
        assert_eq!(registry.class_for_wrapper("WidgetModel").unwrap().name(), "Widget");
    }

    #[test]
    fn test_load_manifest_rejects_orphan_implied_class() {
        let source = widget_schemas();
        let manifest = widget_manifest(json!([
            {"class": "Orphan", "implied_by": [{"class": "Nowhere", "field": "meta"}]}
        ]));

        let mut registry = Registry::new();
        let result = registry.load_manifest(&manifest, &source);
        assert!(matches!(
            result,
            Err(DataModelError::Registry(RegistryError::UnresolvedImplied { ref class, .. })) if class == "Orphan"
        ));
    }

    #[test]
    fn test_load_manifest_rejects_implied_non_object_field() {
        let source = widget_schemas();
        let manifest = widget_manifest(json!([
            {"class": "Size", "implied_by": [{"class": "Widget", "field": "size"}]}
        ]));

        let mut registry = Registry::new();
        assert!(matches!(
            registry.load_manifest(&manifest, &source),
            Err(DataModelError::Registry(RegistryError::UnresolvedImplied { .. }))
        ));
    }

    #[test]
    fn test_load_manifest_missing_schema() {
        let manifest = widget_manifest(json!([]));
        let mut registry = Registry::new();
        assert!(matches!(
            registry.load_manifest(&manifest, &MemorySchemaSource::new()),
            Err(DataModelError::Schema(_))
        ));
    }

    // ========================================================================
    // Default producers
    // ========================================================================

    #[test]
    fn test_extra_fields_exclude_declared_fields() {
        let source = widget_schemas();
        let mut registry = Registry::new();
        registry
            .load_manifest(&widget_manifest(json!([])), &source)
            .unwrap();

        fn produce(_: &crate::DataModels) -> crate::error::Result<crate::models::Value> {
            Ok(crate::models::Value::from("extra"))
        }

        registry.register_default("Widget", "size", produce).unwrap();
        registry.register_default("Widget", "checksum", produce).unwrap();
        assert!(registry.register_default("Missing", "x", produce).is_err());

        let widget = registry.class("Widget").unwrap();
        assert_eq!(registry.extra_fields(&widget), vec!["checksum"]);
        assert!(registry.default_producer("Widget", "size").is_some());
    }
}
