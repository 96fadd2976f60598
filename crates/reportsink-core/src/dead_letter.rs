//! Dead-letter construction for rejected messages

use crate::model::{
    current_field_name, replace_deprecated_fields, ReportDeadLetter, ReportMessage, SALVAGEABLE_FIELDS,
};
use crate::validation::ValidationResult;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::debug;
use uuid::Uuid;

static STRING_FIELD_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn string_field_regex() -> Option<&'static Regex> {
    STRING_FIELD_REGEX
        .get_or_init(|| Regex::new(r#""([A-Za-z_][A-Za-z0-9_]*)"\s*:\s*"((?:[^"\\]|\\.)*)""#).ok())
        .as_ref()
}

/// Recover whatever identification fields a raw message still carries.
///
/// A message that parses as JSON is projected structurally. Otherwise the raw text is
/// scanned for `"field": "string"` pairs of the known scalar fields; the first
/// occurrence of each wins.
pub fn salvage(raw: &str) -> ReportMessage {
    if let Ok(mut value) = serde_json::from_str::<Value>(raw) {
        replace_deprecated_fields(&mut value);
        return ReportMessage::from_value(&value);
    }

    let Some(regex) = string_field_regex() else {
        return ReportMessage::default();
    };

    let mut recovered = Map::new();
    for captures in regex.captures_iter(raw) {
        let field = current_field_name(&captures[1]);
        if !SALVAGEABLE_FIELDS.contains(&field) || recovered.contains_key(field) {
            continue;
        }
        let escaped = &captures[2];
        let value = serde_json::from_str::<String>(&format!("\"{}\"", escaped))
            .unwrap_or_else(|_| escaped.to_string());
        recovered.insert(field.to_string(), Value::String(value));
    }
    debug!(fields = recovered.len(), "Salvaged fields from malformed message");
    ReportMessage::from_value(&Value::Object(recovered))
}

/// Builds the dead-letter record for a rejected message
#[derive(Debug, Clone, Default)]
pub struct DeadLetterBuilder {
    id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
}

impl DeadLetterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed identifier instead of a fresh UUID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Use a fixed timestamp instead of the current time
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Project `message` and the terminal `result` into a dead letter
    pub fn build(&self, message: &ReportMessage, result: &ValidationResult) -> ReportDeadLetter {
        let id = self
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let timestamp = self.timestamp.unwrap_or_else(Utc::now);

        ReportDeadLetter {
            report: message.to_report(id, timestamp),
            disposition_type: message.disposition(),
            dead_letter_reasons: result.invalid_data.clone(),
            validation_schemas: result.schema_files_attempted.clone(),
        }
    }

    /// Salvage what can be recovered from `raw`, then build the dead letter
    pub fn build_from_raw(&self, raw: &str, result: &ValidationResult) -> ReportDeadLetter {
        self.build(&salvage(raw), result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DispositionType;
    use crate::validation::ValidationOrchestrator;

    #[test]
    fn test_salvage_from_truncated_json() {
        let raw = r#"{"upload_id": "u-\"1\"", "data_stream_id": "ds", "stage_info": {"action": "x"}, "content_type": "json", "content": {"#;
        let message = salvage(raw);
        assert_eq!(message.upload_id.as_deref(), Some("u-\"1\""));
        assert_eq!(message.data_stream_id.as_deref(), Some("ds"));
        assert_eq!(message.content_type.as_deref(), Some("json"));
        assert_eq!(message.stage_info, None);
        assert_eq!(message.content, None);
    }

    #[test]
    fn test_salvage_ignores_unknown_and_repeated_fields() {
        let raw = r#"{"upload_id": "first", "secret": "s", "upload_id": "second", "destination_id": "ds", oops"#;
        let message = salvage(raw);
        assert_eq!(message.upload_id.as_deref(), Some("first"));
        assert_eq!(message.data_stream_id.as_deref(), Some("ds"));
    }

    #[test]
    fn test_salvage_of_garbage_is_empty() {
        assert_eq!(salvage("not json at all"), ReportMessage::default());
    }

    #[test]
    fn test_dead_letter_carries_result() {
        let raw = r#"{"upload_id": "u-1", "disposition_type": "replace", "#;
        let result = ValidationOrchestrator::malformed("EOF while parsing an object");
        let dead_letter = DeadLetterBuilder::new()
            .with_id("dl-1")
            .build_from_raw(raw, &result);

        assert_eq!(dead_letter.id(), "dl-1");
        assert_eq!(dead_letter.report.report_id, "dl-1");
        assert_eq!(dead_letter.report.upload_id.as_deref(), Some("u-1"));
        assert_eq!(dead_letter.disposition_type, DispositionType::Replace);
        assert_eq!(dead_letter.dead_letter_reasons, result.invalid_data);
        assert!(dead_letter.validation_schemas.is_empty());
        assert_eq!(dead_letter.partition_key(), "u-1");
    }

    #[test]
    fn test_fresh_ids() {
        let result = ValidationOrchestrator::malformed("x");
        let builder = DeadLetterBuilder::new();
        let a = builder.build(&ReportMessage::default(), &result);
        let b = builder.build(&ReportMessage::default(), &result);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.partition_key(), a.id());
    }
}
