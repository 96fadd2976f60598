//! Shared test support utilities for integration tests

#![allow(dead_code)]

use reportsink_core::{Repository, ReportSink, ValidationOrchestrator};
use reportsink_schemas::{
    CachedSchemaLoader, FileSystemLoader, InMemoryObjectStore, JsonSchemaValidator, ObjectStoreLoader,
    ObjectStoreProvider,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Directory holding the fixture schemas
pub fn schema_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/schemas")
}

/// A fully valid report message against `base.1.0.0` and `hl7v2-debatch.1.0.0`
pub fn valid_report() -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/reports/valid-hl7v2.json");
    let text = std::fs::read_to_string(path).expect("fixture report");
    serde_json::from_str(&text).expect("fixture report is JSON")
}

/// A valid report with `field` removed from the top level
pub fn report_without(field: &str) -> Value {
    let mut report = valid_report();
    report.as_object_mut().expect("object").remove(field);
    report
}

/// Orchestrator over the fixture directory behind a cache
pub fn fixture_orchestrator() -> ValidationOrchestrator {
    let loader = CachedSchemaLoader::new(FileSystemLoader::new(schema_dir()));
    ValidationOrchestrator::new(Arc::new(loader), Arc::new(JsonSchemaValidator::new()))
}

/// In-memory object store seeded with every fixture schema
pub fn seeded_store() -> InMemoryObjectStore {
    let store = InMemoryObjectStore::new();
    for entry in std::fs::read_dir(schema_dir()).expect("fixture dir") {
        let path = entry.expect("entry").path();
        let name = path.file_name().and_then(|n| n.to_str()).expect("name").to_string();
        store.insert(name, std::fs::read(&path).expect("fixture schema"));
    }
    store
}

pub fn object_store_loader(store: InMemoryObjectStore) -> ObjectStoreLoader<InMemoryObjectStore> {
    ObjectStoreLoader::new(ObjectStoreProvider::s3("processing-status-schemas", "us-east-1"), store)
}

/// Sink over the fixture schemas and fresh in-memory collections
pub fn fixture_sink() -> ReportSink {
    ReportSink::new(fixture_orchestrator(), Repository::in_memory())
}

pub fn minimal_base64_report(upload_id: &str) -> Value {
    json!({
        "report_schema_version": "1.0.0",
        "upload_id": upload_id,
        "data_stream_id": "celr",
        "data_stream_route": "csv",
        "stage_info": {"service": "UPLOAD API", "action": "upload-status", "status": "SUCCESS"},
        "content_type": "application/base64",
        "content": "eyJrZXkiOiAidmFsdWUifQ=="
    })
}
