//! Schemas and manifest compiled into the crate

use crate::error::SchemaError;
use crate::schema::source::MemorySchemaSource;

/// URI prefix of the bundled schema documents
pub const SCHEMA_NAMESPACE: &str = "https://datamodels.org/schemas";

/// URI prefix of the bundled tags
pub const TAG_NAMESPACE: &str = "https://datamodels.org/tags";

/// The bundled manifest document
pub const MANIFEST: &str = include_str!("../../manifests/datamodels-1.0.0.json");

const DOCUMENTS: &[(&str, &str)] = &[
    ("common-1.0.0", include_str!("../../schemas/common-1.0.0.json")),
    ("exposure-1.0.0", include_str!("../../schemas/exposure-1.0.0.json")),
    ("image-1.0.0", include_str!("../../schemas/image-1.0.0.json")),
    ("ramp-1.0.0", include_str!("../../schemas/ramp-1.0.0.json")),
    ("science_raw-1.0.0", include_str!("../../schemas/science_raw-1.0.0.json")),
    ("cal_logs-1.0.0", include_str!("../../schemas/cal_logs-1.0.0.json")),
    ("file_date-1.0.0", include_str!("../../schemas/file_date-1.0.0.json")),
    ("software_version-1.0.0", include_str!("../../schemas/software_version-1.0.0.json")),
    ("data_origin-1.0.0", include_str!("../../schemas/data_origin-1.0.0.json")),
];

/// Full URI of a bundled schema by file stem
pub fn schema_uri(name: &str) -> String {
    format!("{}/{}", SCHEMA_NAMESPACE, name)
}

/// Full URI of a bundled tag by `<name>-<version>`
pub fn tag_uri(name: &str) -> String {
    format!("{}/{}", TAG_NAMESPACE, name)
}

/// In-memory source holding every bundled schema
pub fn source() -> Result<MemorySchemaSource, SchemaError> {
    let mut source = MemorySchemaSource::new();
    for (name, text) in DOCUMENTS {
        source.insert_str(schema_uri(name), text)?;
    }
    Ok(source)
}
