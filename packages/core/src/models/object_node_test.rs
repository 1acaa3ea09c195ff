//! Tests for object nodes
//!
//! Raw storage access needs no context; resolved access runs against the
//! bundled catalog.

#[cfg(test)]
mod tests {
    use crate::config::RuntimeConfig;
    use crate::context::DataModels;
    use crate::error::{DataModelError, NodeError, ShapeError};
    use crate::models::{DType, Mapping, NdArray, ObjectNode, Value};

    fn test_context() -> DataModels {
        DataModels::bundled_with(RuntimeConfig::testing()).unwrap()
    }

    // ========================================================================
    // Raw storage
    // ========================================================================

    #[test]
    fn test_set_get_remove() {
        let mut node = ObjectNode::new();
        assert!(node.set("a", 1i64).is_none());
        assert_eq!(node.set("a", 2i64), Some(Value::Int(1)));
        assert!(node.has("a"));
        assert_eq!(node.len(), 1);
        assert_eq!(node.remove("a"), Some(Value::Int(2)));
        assert!(node.is_empty());
    }

    #[test]
    fn test_copy_is_independent() {
        let mut original = ObjectNode::new();
        original.set("name", "a");

        let mut copy = original.copy();
        copy.set("name", "b");
        copy.set("extra", true);

        assert_eq!(original.get("name"), Some(&Value::from("a")));
        assert!(!original.has("extra"));
    }

    #[test]
    fn test_from_mapping_moves_storage() {
        let mut map = Mapping::new();
        map.insert("x".to_string(), Value::Int(1));
        let node = ObjectNode::from(map);
        assert_eq!(node.into_storage().get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_from_value_rejects_non_mappings() {
        assert!(matches!(
            ObjectNode::from_value(Value::Int(3), None),
            Err(NodeError::TypeError(_))
        ));
        assert!(ObjectNode::from_value(Value::Mapping(Mapping::new()), None).is_ok());
    }

    #[test]
    fn test_untyped_node_has_no_defaults() {
        let ctx = test_context();
        let mut node = ObjectNode::new();
        node.set("kept", 5i64);

        assert_eq!(node.get_or_init(&ctx, "kept").unwrap(), &Value::Int(5));
        assert!(matches!(
            node.get_or_init(&ctx, "absent"),
            Err(DataModelError::Node(NodeError::MissingField { .. }))
        ));
    }

    // ========================================================================
    // Resolved access
    // ========================================================================

    #[test]
    fn test_default_is_cached() {
        let ctx = test_context();
        let mut image = ctx.create("Image").unwrap();

        let first = image.get_or_init(&ctx, "dq").unwrap().clone();
        let len = image.len();
        let second = image.get_or_init(&ctx, "dq").unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(image.len(), len);
        assert_eq!(first.as_array().unwrap().dtype(), DType::UInt32);
    }

    #[test]
    fn test_undeclared_field_is_missing() {
        let ctx = test_context();
        let mut image = ctx.create("Image").unwrap();
        let err = image.get_or_init(&ctx, "not_a_field").unwrap_err();
        assert!(matches!(
            err,
            DataModelError::Node(NodeError::MissingField { ref class, ref field })
                if class == "Image" && field == "not_a_field"
        ));
        assert!(image.is_empty());
    }

    #[test]
    fn test_stored_undeclared_field_is_returned() {
        let ctx = test_context();
        let mut image = ctx.create("Image").unwrap();
        image.set("notes", "kept as-is");
        assert_eq!(image.get_or_init(&ctx, "notes").unwrap(), &Value::from("kept as-is"));
    }

    #[test]
    fn test_raw_mapping_is_wrapped_once() {
        let ctx = test_context();
        let mut image = ctx.create("Image").unwrap();
        let mut raw = Mapping::new();
        raw.insert("filename".to_string(), Value::from("r0001.json"));
        image.set("meta", raw);
        let before = image.copy();

        let meta = image.get_or_init(&ctx, "meta").unwrap();
        assert_eq!(meta.as_object().unwrap().class_name(), Some("ImageMeta"));

        // wrapping changes the form, not the content
        assert_eq!(image, before);
        assert!(matches!(image.get("meta"), Some(Value::Object(_))));
    }

    #[test]
    fn test_nested_implied_classes() {
        let ctx = test_context();
        let mut image = ctx.create("Image").unwrap();

        let meta = image.get_or_init(&ctx, "meta").unwrap().as_object_mut().unwrap();
        let exposure = meta.get_or_init(&ctx, "exposure").unwrap();
        assert_eq!(exposure.as_object().unwrap().class_name(), Some("Exposure"));

        let photometry = meta.get_or_init(&ctx, "photometry").unwrap();
        assert_eq!(photometry.as_object().unwrap().class_name(), Some("Photometry"));
    }

    #[test]
    fn test_leaf_defaults() {
        let ctx = test_context();
        let mut meta = ctx.create("ImageMeta").unwrap();

        assert_eq!(meta.get_or_init(&ctx, "filename").unwrap(), &Value::from("?"));
        assert_eq!(meta.get_or_init(&ctx, "origin").unwrap(), &Value::from("SIMULATION"));
        assert!(meta.get_or_init(&ctx, "file_date").unwrap().as_scalar().is_some());

        let instrument = meta.get_or_init(&ctx, "instrument").unwrap().as_object_mut().unwrap();
        assert_eq!(instrument.get_or_init(&ctx, "optical_element").unwrap(), &Value::from("F158"));
    }

    #[test]
    fn test_pattern_property_fields() {
        let ctx = test_context();
        let mut meta = ctx.create("ImageMeta").unwrap();

        let detectors = meta.get_or_init(&ctx, "detectors").unwrap().as_object_mut().unwrap();
        let d01 = detectors.get_or_init(&ctx, "D01").unwrap().as_object_mut().unwrap();
        assert_eq!(d01.get_or_init(&ctx, "gain").unwrap(), &Value::Float(1.0));
        assert!(detectors.get_or_init(&ctx, "detector_1").is_err());
    }

    #[test]
    fn test_time_and_scalar_coercion() {
        let ctx = test_context();
        let mut meta = ctx.create("ImageMeta").unwrap();
        meta.set("file_date", "2024-03-01T10:00:00Z");

        let file_date = meta.get_or_init(&ctx, "file_date").unwrap();
        let scalar = file_date.as_scalar().unwrap();
        assert_eq!(scalar.class_name(), "FileDate");
        assert!(scalar.value().as_time().is_some());

        let mut exposure = ctx.create("Exposure").unwrap();
        exposure.set("start_time", "2024-03-01T10:00:00Z");
        assert!(matches!(
            exposure.get_or_init(&ctx, "start_time").unwrap(),
            Value::Time(_)
        ));
    }

    // ========================================================================
    // Enums and reserved words
    // ========================================================================

    #[test]
    fn test_invalid_enum_literal_is_rejected() {
        let ctx = test_context();
        let mut exposure = ctx.create("Exposure").unwrap();
        exposure.set("type", "WFI_BOGUS");

        let err = exposure.get_or_init(&ctx, "type").unwrap_err();
        assert!(matches!(
            err,
            DataModelError::Node(NodeError::InvalidEnumValue { .. })
        ));
        // the raw value is still there
        assert_eq!(exposure.get("type"), Some(&Value::from("WFI_BOGUS")));
    }

    #[test]
    fn test_assign_validates_enum() {
        let ctx = test_context();
        let mut meta = ctx.create("ImageMeta").unwrap();

        meta.assign(&ctx, "origin", "OBSERVATION").unwrap();
        assert!(meta.get("origin").unwrap().as_enum().is_some());

        assert!(meta.assign(&ctx, "origin", "GUESSWORK").is_err());
        assert_eq!(meta.get("origin"), Some(&Value::from("OBSERVATION")));
    }

    #[test]
    fn test_reserved_word_alias() {
        let ctx = test_context();
        let mut exposure = ctx.create("Exposure").unwrap();

        exposure.set_attr(&ctx, "type_", "WFI_DARK").unwrap();
        assert!(exposure.has("type"));
        assert!(!exposure.has("type_"));
        assert_eq!(exposure.attr(&ctx, "type_").unwrap(), &Value::from("WFI_DARK"));
        assert_eq!(exposure.attr(&ctx, "type").unwrap(), &Value::from("WFI_DARK"));
    }

    // ========================================================================
    // Array defaults
    // ========================================================================

    #[test]
    fn test_border_shapes_follow_configured_ramp() {
        let ctx = DataModels::bundled().unwrap();
        let mut ramp = ctx.create("Ramp").unwrap();

        let left = ramp.get_or_init(&ctx, "border_ref_pix_left").unwrap();
        assert_eq!(left.as_array().unwrap().shape(), &[8, 4096, 4]);
        let top = ramp.get_or_init(&ctx, "border_ref_pix_top").unwrap();
        assert_eq!(top.as_array().unwrap().shape(), &[8, 4, 4096]);

        // reading a secondary array initialised the primary
        assert_eq!(
            ramp.get("data").and_then(Value::as_array).unwrap().shape(),
            &[8, 4096, 4096]
        );
    }

    #[test]
    fn test_amp33_follows_assigned_data() {
        let ctx = DataModels::bundled().unwrap();
        let mut image = ctx.create("Image").unwrap();
        image.set("data", NdArray::zeros(vec![4088, 4088], DType::Float32));

        let shape = image
            .get_or_init(&ctx, "amp33")
            .unwrap()
            .as_array()
            .unwrap()
            .shape()
            .to_vec();
        assert_eq!(shape, vec![8, 4088, 128]);

        image.get_or_init(&ctx, "amp33").unwrap();
        assert_eq!(image.get("amp33").and_then(Value::as_array).unwrap().shape(), &[8, 4088, 128]);
    }

    #[test]
    fn test_shape_override_wins() {
        let ctx = test_context();
        let mut ramp = ctx.create("Ramp").unwrap();
        ramp.set("data", NdArray::zeros(vec![2, 8, 8], DType::Float32));
        ramp.set_default_shape(Some(vec![3, 16, 16]));

        let amp33 = ramp.get_or_init(&ctx, "amp33").unwrap();
        assert_eq!(amp33.as_array().unwrap().shape(), &[3, 16, 128]);
        assert_eq!(ramp.default_shape(), Some(&[3, 16, 16][..]));
    }

    #[test]
    fn test_no_default_shape() {
        let config = RuntimeConfig {
            default_shape: None,
            ..RuntimeConfig::default()
        };
        let ctx = DataModels::bundled_with(config).unwrap();
        let mut image = ctx.create("Image").unwrap();

        assert!(matches!(
            image.get_or_init(&ctx, "dq"),
            Err(DataModelError::Shape(ShapeError::NoDefaultShape { .. }))
        ));
        assert!(image.is_empty());
    }
}
