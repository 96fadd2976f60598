//! End-to-end validation scenarios against the fixture schemas

mod test_support;

use reportsink_core::validation::{
    content_schema_not_found_reason, schema_violation_reason, BASE64_REASON, MISSING_CONTENT_REASON,
    MISSING_SELECTOR_REASON,
};
use reportsink_core::ValidationOrchestrator;
use reportsink_schemas::{CachedSchemaLoader, JsonSchemaValidator, SchemaLoader};
use serde_json::json;
use std::sync::Arc;
use test_support::*;

#[test]
fn test_fully_valid_report() {
    let result = fixture_orchestrator().validate_document(&valid_report()).unwrap();
    assert!(result.status, "{:?}", result);
    assert!(result.invalid_data.is_empty());
    assert_eq!(
        result.schema_files_attempted,
        vec!["base.1.0.0.schema.json", "hl7v2-debatch.1.0.0.schema.json"]
    );
}

#[test]
fn test_missing_upload_id() {
    let result = fixture_orchestrator()
        .validate_document(&report_without("upload_id"))
        .unwrap();
    assert!(!result.status);
    assert_eq!(
        result.reason,
        "The report could not be validated against the JSON schema: base.1.0.0.schema.json."
    );
    assert!(result
        .invalid_data
        .contains(&"$.upload_id: is missing but it is required".to_string()));
}

#[test]
fn test_missing_content() {
    let result = fixture_orchestrator()
        .validate_document(&report_without("content"))
        .unwrap();
    assert!(!result.status);
    assert_eq!(result.reason, MISSING_CONTENT_REASON);
    assert_eq!(result.reason, "Report rejected: `content` is not JSON or is missing.");
}

#[test]
fn test_missing_content_schema_selector() {
    let orchestrator = fixture_orchestrator();

    for content in [
        json!({"report": {"message_count": 1}}),
        json!({"content_schema_name": "hl7v2-debatch", "content_schema_version": ""}),
        json!({"content_schema_name": "", "content_schema_version": "1.0.0"}),
    ] {
        let mut report = valid_report();
        report["content"] = content;
        let result = orchestrator.validate_document(&report).unwrap();
        assert!(!result.status);
        assert_eq!(result.reason, MISSING_SELECTOR_REASON);
        assert_eq!(result.schema_files_attempted, vec!["base.1.0.0.schema.json"]);
    }
}

#[test]
fn test_unresolvable_content_schema() {
    let mut report = valid_report();
    report["content"]["content_schema_version"] = json!("2.0.0");

    let result = fixture_orchestrator().validate_document(&report).unwrap();
    assert!(!result.status);
    assert_eq!(
        result.reason,
        "Report rejected: Content schema file not found for content schema name 'hl7v2-debatch' and schema version '2.0.0'."
    );
    assert_eq!(result.reason, content_schema_not_found_reason("hl7v2-debatch", "2.0.0"));
    assert_eq!(
        result.schema_files_attempted,
        vec!["base.1.0.0.schema.json", "hl7v2-debatch.2.0.0.schema.json"]
    );
}

#[test]
fn test_numeric_report_schema_version_selects_its_base_schema() {
    let mut report = valid_report();
    report["report_schema_version"] = json!(1.0);

    let result = fixture_orchestrator().validate_document(&report).unwrap();
    assert!(!result.status);
    assert_eq!(result.schema_files_attempted, vec!["base.1.0.schema.json"]);
    assert_eq!(
        result.reason,
        "Report rejected: Schema file not found for base schema version 1.0"
    );
}

#[test]
fn test_numeric_content_schema_version_selects_its_schema() {
    let mut report = valid_report();
    report["content"]["content_schema_version"] = json!(2);

    let result = fixture_orchestrator().validate_document(&report).unwrap();
    assert!(!result.status);
    assert_eq!(result.reason, content_schema_not_found_reason("hl7v2-debatch", "2"));
    assert_eq!(
        result.schema_files_attempted,
        vec!["base.1.0.0.schema.json", "hl7v2-debatch.2.schema.json"]
    );
}

#[test]
fn test_whitespace_content_schema_name_is_looked_up() {
    let mut report = valid_report();
    report["content"]["content_schema_name"] = json!(" ");

    let result = fixture_orchestrator().validate_document(&report).unwrap();
    assert!(!result.status);
    assert_eq!(result.reason, content_schema_not_found_reason(" ", "1.0.0"));
    assert_eq!(
        result.schema_files_attempted,
        vec!["base.1.0.0.schema.json", " .1.0.0.schema.json"]
    );
}

#[test]
fn test_content_schema_violations() {
    let mut report = valid_report();
    report["content"]["report"] = json!({"batch_id": 7});

    let result = fixture_orchestrator().validate_document(&report).unwrap();
    assert!(!result.status);
    assert_eq!(result.reason, schema_violation_reason("hl7v2-debatch.1.0.0.schema.json"));
    assert!(result
        .invalid_data
        .contains(&"$.report.message_count: is missing but it is required".to_string()));
    assert!(result.invalid_data.iter().any(|v| v.starts_with("$.report.batch_id:")));
}

#[test]
fn test_additional_property_in_content() {
    let mut report = valid_report();
    report["content"] = json!({
        "content_schema_name": "upload-status",
        "content_schema_version": "1.0.0",
        "offset": 0,
        "size": 10,
        "unexpected": true
    });

    let result = fixture_orchestrator().validate_document(&report).unwrap();
    assert!(!result.status);
    assert_eq!(result.invalid_data.len(), 1);
    assert!(result.invalid_data[0].contains("unexpected"));
}

#[test]
fn test_default_version_fallback() {
    let result = fixture_orchestrator()
        .validate_document(&json!({"content_type": "application/base64"}))
        .unwrap();
    assert_eq!(result.schema_files_attempted, vec!["base.0.0.1.schema.json"]);
    // base.0.0.1 requires upload_id
    assert!(!result.status);

    let result = fixture_orchestrator()
        .validate_document(&json!({"upload_id": "u", "content_type": "application/base64"}))
        .unwrap();
    assert!(result.status);
    assert_eq!(result.schema_files_attempted, vec!["base.0.0.1.schema.json"]);
}

#[test]
fn test_base64_bypass_ignores_content_shape() {
    let orchestrator = fixture_orchestrator();
    for content in [json!("not-json"), json!(42), json!([1, 2]), json!({"anything": true})] {
        let mut report = minimal_base64_report("u-1");
        report["content"] = content;
        let result = orchestrator.validate_document(&report).unwrap();
        assert!(result.status);
        assert_eq!(result.reason, BASE64_REASON);
        assert_eq!(result.schema_files_attempted, vec!["base.1.0.0.schema.json"]);
    }
}

#[test]
fn test_short_circuit_on_base_failure() {
    // content selects a schema that would also fail, yet only the base is attempted
    let mut report = report_without("upload_id");
    report["content"]["content_schema_version"] = json!("2.0.0");

    let result = fixture_orchestrator().validate_document(&report).unwrap();
    assert!(!result.status);
    assert_eq!(result.schema_files_attempted, vec!["base.1.0.0.schema.json"]);
    assert!(result.invalid_data.iter().all(|m| m.starts_with("$.")));
}

#[test]
fn test_determinism() {
    let orchestrator = fixture_orchestrator();
    let mut report = report_without("data_stream_id");
    report["stage_info"] = json!({"service": "x"});

    let first = orchestrator.validate_document(&report).unwrap();
    for _ in 0..5 {
        assert_eq!(orchestrator.validate_document(&report).unwrap(), first);
    }

    let fresh = fixture_orchestrator().validate_document(&report).unwrap();
    assert_eq!(fresh, first);
}

#[test]
fn test_same_results_from_object_store() {
    let loader = CachedSchemaLoader::new(object_store_loader(seeded_store()));
    let from_store = ValidationOrchestrator::new(Arc::new(loader), Arc::new(JsonSchemaValidator::new()));

    for report in [valid_report(), report_without("upload_id"), report_without("content")] {
        assert_eq!(
            from_store.validate_document(&report).unwrap(),
            fixture_orchestrator().validate_document(&report).unwrap()
        );
    }
}

#[test]
fn test_cache_serves_repeated_validation() {
    let loader = Arc::new(CachedSchemaLoader::new(object_store_loader(seeded_store())));
    let orchestrator = ValidationOrchestrator::new(loader.clone(), Arc::new(JsonSchemaValidator::new()));

    for _ in 0..10 {
        assert!(orchestrator.validate_document(&valid_report()).unwrap().status);
    }
    assert_eq!(loader.stats().fetches, 2);
    assert_eq!(loader.inner().transport().get_count(), 2);
    assert_eq!(loader.schema_files().unwrap().len(), 4);
}

#[test]
fn test_malformed_raw_message() {
    let result = fixture_orchestrator().validate("{\"upload_id\": \"u-1\",").unwrap();
    assert!(!result.status);
    assert!(result.schema_files_attempted.is_empty());
    assert_eq!(result.invalid_data.last(), Some(&result.reason));
}
