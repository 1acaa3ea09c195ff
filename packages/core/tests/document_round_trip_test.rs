//! Tree Document Round Trip Tests
//!
//! Saves data models built from the bundled catalog, reopens them and checks
//! that content, tags and node types survive the trip.

use datamodels_core::tree::{with_tree_context, TimeFormat, TreeContext, TAG_KEY};
use datamodels_core::{
    DataModel, DataModelError, DataModels, DType, FlushOptions, NdArray, RegistryError, RuntimeConfig,
    TreeDocument, Value,
};
use serde_json::{json, Value as JsonValue};
use std::path::Path;
use tempfile::TempDir;

fn test_context() -> DataModels {
    DataModels::bundled_with(RuntimeConfig::testing()).unwrap()
}

fn read_json(path: &Path) -> JsonValue {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_save_and_open_image() {
    let ctx = test_context();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("r0001_image.json");

    let mut model = DataModel::new(&ctx, "ImageModel").unwrap();
    model
        .node_mut()
        .set("data", NdArray::zeros(vec![16, 16], DType::Float32).with_unit("DN / s"));
    model.save(&ctx, &path).unwrap();

    let mut opened = DataModel::open(&ctx, &path).unwrap();
    assert_eq!(opened.model_type(), "ImageModel");
    assert_eq!(opened.node().class_name(), Some("Image"));
    assert_eq!(opened.node(), model.node());

    // untagged children come back raw and are wrapped on first read
    let meta = opened.get(&ctx, "meta").unwrap().as_object().unwrap();
    assert_eq!(meta.class_name(), Some("ImageMeta"));
    assert!(meta.get("origin").unwrap().as_enum().is_some());
    assert!(meta.get("file_date").unwrap().as_scalar().is_some());

    let amp33 = opened.get(&ctx, "amp33").unwrap().as_array().unwrap();
    assert_eq!(amp33.shape(), &[8, 16, 128]);
}

#[test]
fn test_document_marks_tagged_values() {
    let ctx = test_context();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ramp.json");

    let mut model = DataModel::new(&ctx, "RampModel").unwrap();
    model.save(&ctx, &path).unwrap();

    let json = read_json(&path);
    assert_eq!(json[TAG_KEY], "https://datamodels.org/tags/ramp-1.0.0");
    assert_eq!(json["meta"]["origin"][TAG_KEY], "https://datamodels.org/tags/data_origin-1.0.0");
    assert_eq!(json["meta"]["origin"]["value"], "SIMULATION");
    assert_eq!(json["meta"]["file_date"]["value"][TAG_KEY], "https://datamodels.org/leaf/time-1.0.0");
    assert_eq!(json["data"][TAG_KEY], "https://datamodels.org/leaf/ndarray-1.0.0");
    assert_eq!(json["data"]["shape"], json!([2, 8, 8]));
    assert_eq!(json["data"]["unit"], "DN");
    // implied and anonymous objects are plain mappings
    assert!(json["meta"].get(TAG_KEY).is_none());
    assert!(json["meta"]["exposure"].get(TAG_KEY).is_none());
    assert_eq!(json["meta"]["exposure"]["type"], "WFI_IMAGE");
}

#[test]
fn test_save_with_all_fields() {
    let ctx = test_context();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("all.json");

    let mut model = DataModel::new(&ctx, "ImageModel").unwrap();
    model
        .save_with(&ctx, &path, &FlushOptions::ALL.with_recurse(true))
        .unwrap();

    let json = read_json(&path);
    assert_eq!(json["border_ref_pix_left"]["shape"], json!([8, 4]));
    assert_eq!(json["border_ref_pix_top"]["shape"], json!([4, 8]));
    assert_eq!(json["meta"]["cal_logs"]["items"], json!([]));
    assert_eq!(json["meta"]["exposure"]["frame_time"]["unit"], "s");

    let opened = DataModel::open(&ctx, &path).unwrap();
    assert_eq!(opened.node(), model.node());
}

#[test]
fn test_older_tag_version_opens() {
    let ctx = test_context();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("old.json");
    std::fs::write(
        &path,
        json!({
            TAG_KEY: "https://datamodels.org/tags/image-0.9.0",
            "meta": {"filename": "old.json"}
        })
        .to_string(),
    )
    .unwrap();

    let mut opened = DataModel::open(&ctx, &path).unwrap();
    assert_eq!(opened.model_type(), "ImageModel");
    let meta = opened.get(&ctx, "meta").unwrap().as_object_mut().unwrap();
    assert_eq!(meta.get_or_init(&ctx, "filename").unwrap(), &Value::from("old.json"));
}

#[test]
fn test_unknown_root_tag_fails() {
    let ctx = test_context();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("unknown.json");
    std::fs::write(
        &path,
        json!({ TAG_KEY: "https://example.org/tags/widget-1.0.0" }).to_string(),
    )
    .unwrap();

    assert!(matches!(
        DataModel::open(&ctx, &path),
        Err(DataModelError::Registry(RegistryError::UnknownTag(_)))
    ));
}

#[test]
fn test_invalid_enum_in_document_fails() {
    let ctx = test_context();
    let json = json!({
        TAG_KEY: "https://datamodels.org/tags/data_origin-1.0.0",
        "value": "GUESSWORK"
    });
    assert!(matches!(
        TreeDocument::from_json(&json, ctx.registry()),
        Err(DataModelError::Node(_))
    ));
}

#[test]
fn test_unix_time_documents() {
    let ctx = test_context();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("unix.json");
    let unix = TreeContext {
        time_format: TimeFormat::Unix,
        ..TreeContext::default()
    };

    let mut model = DataModel::new(&ctx, "ImageModel").unwrap();
    with_tree_context(unix, || model.save(&ctx, &path)).unwrap();

    let json = read_json(&path);
    assert_eq!(json["meta"]["file_date"]["value"]["value"], json!(1_577_836_800));

    let opened = DataModel::open(&ctx, &path).unwrap();
    assert_eq!(opened.node(), model.node());
}
