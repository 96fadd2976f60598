//! The report validation state machine
//!
//! Stages run in a fixed order and the first failing stage ends validation:
//!
//! 1. parse the raw message as JSON
//! 2. load the base schema for `report_schema_version` (default `0.0.1`)
//! 3. validate the whole message against the base schema
//! 4. check `content_type` (base64 payloads are accepted here without further checks)
//! 5. require `content`
//! 6. require `content.content_schema_name` and `content.content_schema_version`
//! 7. load the content schema they name
//! 8. validate `content` against the content schema
//!
//! Rejections are returned as a [`ValidationResult`] with `status == false`. Only a
//! failure of the schema store itself, or an unusable schema, is an `Err`.

use crate::error::{Error, Result};
use crate::model::{value_text, SchemaDefinition};
use crate::validation::content_type::ContentKind;
use crate::validation::result::{ErrorAccumulator, ValidationResult, SUCCESS_REASON};
use reportsink_schemas::{
    base_schema_file_name, SchemaFile, SchemaLoader, SchemaValidator, DEFAULT_REPORT_SCHEMA_VERSION,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MALFORMED_REASON: &str = "Report rejected: Malformed JSON or error processing the report";
pub const MISSING_CONTENT_TYPE_REASON: &str = "Report rejected: `content_type` is missing";
pub const BASE64_REASON: &str = "The content type provided is valid base64 encoded";
pub const NOT_JSON_MIME_REASON: &str = "Don't need to go further down the schema, since the mimetype is not json.";
pub const MISSING_CONTENT_REASON: &str = "Report rejected: `content` is not JSON or is missing.";
pub const MISSING_SELECTOR_REASON: &str =
    "Report rejected: `content_schema_name` or `content_schema_version` is missing or empty.";

pub fn base_schema_not_found_reason(report_schema_version: &str) -> String {
    format!(
        "Report rejected: Schema file not found for base schema version {}",
        report_schema_version
    )
}

pub fn content_schema_not_found_reason(schema_name: &str, schema_version: &str) -> String {
    format!(
        "Report rejected: Content schema file not found for content schema name '{}' and schema version '{}'.",
        schema_name, schema_version
    )
}

pub fn schema_violation_reason(schema_file: &str) -> String {
    format!("The report could not be validated against the JSON schema: {}.", schema_file)
}

/// Validation stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    ParseJson,
    LoadBaseSchema,
    ValidateBaseSchema,
    ValidateContentType,
    ValidateContentPresence,
    ValidateContentSchemaSelector,
    LoadContentSchema,
    ValidateContentSchema,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ParseJson => "parse_json",
            Stage::LoadBaseSchema => "load_base_schema",
            Stage::ValidateBaseSchema => "validate_base_schema",
            Stage::ValidateContentType => "validate_content_type",
            Stage::ValidateContentPresence => "validate_content_presence",
            Stage::ValidateContentSchemaSelector => "validate_content_schema_selector",
            Stage::LoadContentSchema => "load_content_schema",
            Stage::ValidateContentSchema => "validate_content_schema",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs report messages through the validation stages.
///
/// Stateless apart from the shared loader and validator, so one instance can serve any
/// number of concurrent callers.
#[derive(Clone)]
pub struct ValidationOrchestrator {
    loader: Arc<dyn SchemaLoader>,
    validator: Arc<dyn SchemaValidator>,
}

impl ValidationOrchestrator {
    pub fn new(loader: Arc<dyn SchemaLoader>, validator: Arc<dyn SchemaValidator>) -> Self {
        Self { loader, validator }
    }

    pub fn loader(&self) -> &Arc<dyn SchemaLoader> {
        &self.loader
    }

    pub fn validator(&self) -> &Arc<dyn SchemaValidator> {
        &self.validator
    }

    /// Validate a raw message
    pub fn validate(&self, raw: &str) -> Result<ValidationResult> {
        match serde_json::from_str::<Value>(raw) {
            Ok(document) => self.validate_document(&document),
            Err(e) => Ok(Self::malformed(&e.to_string())),
        }
    }

    /// Result for a message that is not JSON; the parser error precedes the reason
    pub fn malformed(parse_error: &str) -> ValidationResult {
        rejected(
            Stage::ParseJson,
            ErrorAccumulator::new().invalid(parse_error).reject(MALFORMED_REASON),
        )
    }

    /// Validate an already parsed message
    pub fn validate_document(&self, document: &Value) -> Result<ValidationResult> {
        let acc = ErrorAccumulator::new();

        let version = document
            .get("report_schema_version")
            .and_then(value_text)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_REPORT_SCHEMA_VERSION.to_string());
        let base_file = base_schema_file_name(&version);
        let base_schema = self.load(Stage::LoadBaseSchema, &base_file)?;
        let acc = acc.attempted(&base_file);
        if !base_schema.exists() {
            return Ok(rejected(
                Stage::LoadBaseSchema,
                acc.reject(base_schema_not_found_reason(&version)),
            ));
        }

        if let Some(result) = self.check_violations(Stage::ValidateBaseSchema, &acc, document, &base_schema)? {
            return Ok(result);
        }

        debug!(stage = %Stage::ValidateContentType, "Checking content type");
        let Some(content_type) = document.get("content_type").and_then(value_text) else {
            return Ok(rejected(
                Stage::ValidateContentType,
                acc.reject(MISSING_CONTENT_TYPE_REASON),
            ));
        };
        match ContentKind::classify(&content_type) {
            ContentKind::Base64 => {
                debug!(content_type = %content_type, "Accepting opaque base64 content");
                return Ok(acc.accept(BASE64_REASON));
            }
            ContentKind::Other => {
                return Ok(rejected(
                    Stage::ValidateContentType,
                    acc.reject(NOT_JSON_MIME_REASON),
                ))
            }
            ContentKind::Json => {}
        }

        let Some(content) = document.get("content").filter(|c| !c.is_null()) else {
            return Ok(rejected(
                Stage::ValidateContentPresence,
                acc.reject(MISSING_CONTENT_REASON),
            ));
        };

        let Some(definition) = SchemaDefinition::from_content(content) else {
            return Ok(rejected(
                Stage::ValidateContentSchemaSelector,
                acc.reject(MISSING_SELECTOR_REASON),
            ));
        };

        let content_file = definition.file_name();
        let content_schema = self.load(Stage::LoadContentSchema, &content_file)?;
        let acc = acc.attempted(&content_file);
        if !content_schema.exists() {
            return Ok(rejected(
                Stage::LoadContentSchema,
                acc.reject(content_schema_not_found_reason(
                    &definition.schema_name,
                    &definition.schema_version,
                )),
            ));
        }

        if let Some(result) =
            self.check_violations(Stage::ValidateContentSchema, &acc, content, &content_schema)?
        {
            return Ok(result);
        }

        debug!(schema_files = ?acc.schema_files_attempted(), "Report validated");
        Ok(acc.accept(SUCCESS_REASON))
    }

    fn load(&self, stage: Stage, schema_file: &str) -> Result<SchemaFile> {
        debug!(stage = %stage, schema_file, "Loading schema file");
        self.loader.load_schema_file(schema_file).map_err(|e| {
            warn!(stage = %stage, schema_file, error = %e, "Schema store failure");
            Error::SchemaFetch(e)
        })
    }

    fn check_violations(
        &self,
        stage: Stage,
        acc: &ErrorAccumulator,
        instance: &Value,
        schema: &SchemaFile,
    ) -> Result<Option<ValidationResult>> {
        debug!(stage = %stage, schema_file = schema.name(), "Validating against schema");
        let violations = self.validator.validate(instance, schema)?;
        if violations.is_empty() {
            return Ok(None);
        }
        Ok(Some(rejected(
            stage,
            acc.reject_with_violations(
                schema_violation_reason(schema.name()),
                violations.iter().map(ToString::to_string),
            ),
        )))
    }
}

impl fmt::Debug for ValidationOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationOrchestrator")
            .field("loader", &self.loader.info())
            .finish()
    }
}

fn rejected(stage: Stage, result: ValidationResult) -> ValidationResult {
    info!(
        stage = %stage,
        reason = %result.reason,
        violations = result.invalid_data.len(),
        "Report rejected"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportsink_schemas::{
        InMemoryObjectStore, JsonSchemaValidator, ObjectStoreLoader, ObjectStoreProvider,
    };
    use serde_json::json;

    fn orchestrator(schemas: &[(&str, Value)]) -> ValidationOrchestrator {
        let store = InMemoryObjectStore::new();
        for (name, schema) in schemas {
            store.insert(*name, schema.to_string().into_bytes());
        }
        let loader = ObjectStoreLoader::new(ObjectStoreProvider::s3("schemas", "us-east-1"), store);
        ValidationOrchestrator::new(Arc::new(loader), Arc::new(JsonSchemaValidator::new()))
    }

    fn open_base() -> (&'static str, Value) {
        ("base.0.0.1.schema.json", json!({"type": "object"}))
    }

    #[test]
    fn test_malformed_json() {
        let result = orchestrator(&[open_base()]).validate("{\"upload_id\": ").unwrap();
        assert!(!result.status);
        assert_eq!(result.reason, MALFORMED_REASON);
        assert_eq!(result.invalid_data.len(), 2);
        assert_eq!(result.invalid_data[1], MALFORMED_REASON);
        assert!(result.schema_files_attempted.is_empty());
    }

    #[test]
    fn test_missing_base_schema_records_attempt() {
        let result = orchestrator(&[open_base()])
            .validate_document(&json!({"report_schema_version": "9.9.9"}))
            .unwrap();
        assert_eq!(result.reason, "Report rejected: Schema file not found for base schema version 9.9.9");
        assert_eq!(result.schema_files_attempted, vec!["base.9.9.9.schema.json"]);
        assert_eq!(result.invalid_data, vec![result.reason.clone()]);
    }

    #[test]
    fn test_empty_version_uses_default() {
        let result = orchestrator(&[open_base()])
            .validate_document(&json!({"report_schema_version": "", "content_type": "application/base64"}))
            .unwrap();
        assert!(result.status);
        assert_eq!(result.schema_files_attempted, vec!["base.0.0.1.schema.json"]);
    }

    #[test]
    fn test_content_type_rules() {
        let o = orchestrator(&[open_base()]);

        let missing = o.validate_document(&json!({"content": {}})).unwrap();
        assert_eq!(missing.reason, MISSING_CONTENT_TYPE_REASON);

        let null = o.validate_document(&json!({"content_type": null})).unwrap();
        assert_eq!(null.reason, MISSING_CONTENT_TYPE_REASON);

        let base64 = o
            .validate_document(&json!({"content_type": "text/plain; base64", "content": 17}))
            .unwrap();
        assert!(base64.status);
        assert_eq!(base64.reason, BASE64_REASON);

        let xml = o.validate_document(&json!({"content_type": "application/xml"})).unwrap();
        assert!(!xml.status);
        assert_eq!(xml.reason, NOT_JSON_MIME_REASON);
    }

    #[test]
    fn test_structured_content_type_has_no_text() {
        let o = orchestrator(&[open_base()]);

        let object = o
            .validate_document(&json!({"content_type": {"encoding": "base64"}, "content": 17}))
            .unwrap();
        assert!(!object.status);
        assert_eq!(object.reason, NOT_JSON_MIME_REASON);

        let array = o.validate_document(&json!({"content_type": ["base64"]})).unwrap();
        assert_eq!(array.reason, NOT_JSON_MIME_REASON);
    }

    #[test]
    fn test_store_failure_is_an_error() {
        let store = InMemoryObjectStore::new();
        store.fail_next_gets(1);
        let loader = ObjectStoreLoader::new(ObjectStoreProvider::blob("schemas"), store);
        let o = ValidationOrchestrator::new(Arc::new(loader), Arc::new(JsonSchemaValidator::new()));

        let err = o.validate("{}").unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_unusable_base_schema_is_an_error() {
        let store = InMemoryObjectStore::new();
        store.insert("base.0.0.1.schema.json", b"{not json".to_vec());
        let loader = ObjectStoreLoader::new(ObjectStoreProvider::blob("schemas"), store);
        let o = ValidationOrchestrator::new(Arc::new(loader), Arc::new(JsonSchemaValidator::new()));

        let err = o.validate("{}").unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_stage_order() {
        assert!(Stage::ParseJson < Stage::LoadBaseSchema);
        assert!(Stage::LoadContentSchema < Stage::ValidateContentSchema);
        assert_eq!(Stage::ValidateContentType.to_string(), "validate_content_type");
    }
}
