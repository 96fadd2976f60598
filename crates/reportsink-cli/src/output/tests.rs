// Tests for output formatting
//
// The writer is pointed at a shared buffer so the rendered text can be asserted on.

use super::*;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn writer(format: OutputFormat) -> (OutputWriter, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let writer = OutputWriter::with_writer(format, false, false, Box::new(buffer.clone()));
    (writer, buffer)
}

fn rejected_result() -> ValidationResult {
    ValidationResult {
        reason: "The report could not be validated against the JSON schema: base.1.0.0.schema.json."
            .to_string(),
        status: false,
        schema_files_attempted: vec!["base.1.0.0.schema.json".to_string()],
        invalid_data: vec![
            "$.upload_id: is missing but it is required".to_string(),
            "$.stage_info.action: is missing but it is required".to_string(),
        ],
    }
}

#[test]
fn test_validation_result_human() {
    let (mut out, buffer) = writer(OutputFormat::Human);
    out.validation_result(&rejected_result()).unwrap();

    let text = buffer.contents();
    assert!(text.starts_with("Status: REJECTED\n"));
    assert!(text.contains("  - base.1.0.0.schema.json"));
    assert!(text.contains("Problems (2):"));
    assert!(text.contains("  1. $.upload_id: is missing but it is required"));
    assert!(text.contains("  2. $.stage_info.action: is missing but it is required"));
}

#[test]
fn test_validation_result_json_round_trips() {
    let (mut out, buffer) = writer(OutputFormat::Json);
    out.validation_result(&rejected_result()).unwrap();

    let parsed: ValidationResult = serde_json::from_str(buffer.contents().trim()).unwrap();
    assert_eq!(parsed, rejected_result());
}

#[test]
fn test_validation_result_yaml() {
    let (mut out, buffer) = writer(OutputFormat::Yaml);
    out.validation_result(&rejected_result()).unwrap();

    let text = buffer.contents();
    assert!(text.contains("status: false"));
    assert!(text.contains("schema_files_attempted:"));
}

#[test]
fn test_ingest_summary_human_orders_reasons() {
    let mut reasons = BTreeMap::new();
    reasons.insert("Report rejected: `content` is not JSON or is missing.".to_string(), 1);
    reasons.insert("Report rejected: `content_type` is missing".to_string(), 4);
    let summary = IngestSummary {
        total: 10,
        persisted: 5,
        dead_lettered: 5,
        failed: 0,
        reasons,
        duration_ms: 12,
    };

    let (mut out, buffer) = writer(OutputFormat::Human);
    out.ingest_summary(&summary).unwrap();

    let text = buffer.contents();
    assert!(text.starts_with("Processed 10 messages in 12ms\n"));
    assert!(!text.contains("Failed:"));
    let content_type = text.find("`content_type`").unwrap();
    let content = text.find("`content` is not JSON").unwrap();
    assert!(content_type < content);
}

#[test]
fn test_data_is_redacted() {
    let (mut out, buffer) = writer(OutputFormat::Json);
    out.data(&serde_json::json!({
        "blob_connection_string": "AccountName=dex;AccountKey=topsecret",
    }))
    .unwrap();

    let text = buffer.contents();
    assert!(text.contains("AccountName=dex"));
    assert!(!text.contains("topsecret"));
}

#[test]
fn test_schema_list_table() {
    let (mut out, buffer) = writer(OutputFormat::Human);
    out.schema_list(&[ReportSchemaMetadata {
        filename: "hl7v2-debatch.1.0.0.schema.json".to_string(),
        schema_name: "hl7v2-debatch".to_string(),
        schema_version: "1.0.0".to_string(),
        description: "HL7v2 debatch report".to_string(),
    }])
    .unwrap();

    let lines: Vec<_> = buffer.contents().lines().map(str::to_string).collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("NAME"));
    assert!(lines[2].starts_with("hl7v2-debatch │ 1.0.0"));
}

#[test]
fn test_quiet_suppresses_messages() {
    let buffer = SharedBuffer::default();
    let mut out = OutputWriter::with_writer(OutputFormat::Human, false, true, Box::new(buffer.clone()));
    out.info("hello").unwrap();
    out.success("done").unwrap();
    assert!(buffer.contents().is_empty());
    assert!(out.progress_bar(10, "ingest").is_none());
}
