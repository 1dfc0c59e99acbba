//! Integration tests for the hot-folder processor.


use std::path::Path;
use std::sync::Arc;

use crate::app::models::LocationInfo;
use crate::app::services::plugins::PluginRegistry;
use crate::remote::memory::InMemoryRemoteStore;

pub fn gauge_location() -> LocationInfo {
    LocationInfo {
        identifier: "LOC-1".to_string(),
        unique_id: "uid-LOC-1".to_string(),
        name: "North Fork Gauge".to_string(),
        utc_offset_hours: 0.0,
    }
}

pub fn store_with_gauge() -> Arc<InMemoryRemoteStore> {
    Arc::new(InMemoryRemoteStore::new().with_location(gauge_location()))
}

pub fn json_registry() -> Arc<PluginRegistry> {
    Arc::new(PluginRegistry::from_names(&["json-field-data".to_string()]).unwrap())
}

/// A minimal JSON field data document with one reading
pub fn visit_document(start: &str, end: &str) -> String {
    format!(
        r#"{{
            "locationIdentifier": "LOC-1",
            "fieldVisits": [{{
                "startTime": "{start}",
                "endTime": "{end}",
                "readings": [{{
                    "parameterId": "HG",
                    "unit": "m",
                    "value": 1.52,
                    "time": "{start}"
                }}]
            }}]
        }}"#
    )
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    use std::io::Write;
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for (name, content) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}
