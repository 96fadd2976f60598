//! Draft 7 JSON Schema validation of report documents
//!
//! Copyright (c) 2025 Report Sink Team
//! Licensed under the Apache-2.0 license

use crate::schema_file::SchemaFile;
use crate::validation::error::{SchemaCheckError, Violation};
use crate::validation::path::{child_path, pointer_to_path};
use dashmap::DashMap;
use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, ValidationError, Validator};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Validates documents against schema files
pub trait SchemaValidator: Send + Sync {
    /// Every violation of `schema` by `instance`, empty when the document is valid.
    ///
    /// Fails only when the schema itself is unusable.
    fn validate(&self, instance: &Value, schema: &SchemaFile) -> Result<Vec<Violation>, SchemaCheckError>;

    /// Check that `content` is a usable schema without validating anything against it
    fn check_schema(&self, filename: &str, content: &str) -> Result<(), SchemaCheckError>;
}

struct CompiledSchema {
    source: Vec<u8>,
    validator: Arc<Validator>,
}

/// Draft 7 validator built on the `jsonschema` crate.
///
/// Compiled schemas are kept per file name and recompiled when the file content changes.
#[derive(Default)]
pub struct JsonSchemaValidator {
    compiled: DashMap<String, CompiledSchema>,
}

impl JsonSchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of compiled schemas currently held
    pub fn compiled_count(&self) -> usize {
        self.compiled.len()
    }

    fn compile(filename: &str, schema: &Value) -> Result<Validator, SchemaCheckError> {
        jsonschema::options()
            .with_draft(Draft::Draft7)
            .build(schema)
            .map_err(|e| SchemaCheckError::Compile {
                filename: filename.to_string(),
                reason: e.to_string(),
            })
    }

    fn parse(filename: &str, bytes: &[u8]) -> Result<Value, SchemaCheckError> {
        serde_json::from_slice(bytes).map_err(|source| SchemaCheckError::NotJson {
            filename: filename.to_string(),
            source,
        })
    }

    fn validator_for(&self, schema: &SchemaFile) -> Result<Arc<Validator>, SchemaCheckError> {
        let bytes = schema.bytes().ok_or_else(|| SchemaCheckError::MissingContent {
            filename: schema.name().to_string(),
        })?;

        if let Some(entry) = self.compiled.get(schema.name()) {
            if entry.source == bytes {
                return Ok(Arc::clone(&entry.validator));
            }
        }

        let validator = Arc::new(Self::compile(schema.name(), &Self::parse(schema.name(), bytes)?)?);
        debug!(schema_file = schema.name(), "Compiled JSON schema");
        self.compiled.insert(
            schema.name().to_string(),
            CompiledSchema {
                source: bytes.to_vec(),
                validator: Arc::clone(&validator),
            },
        );
        Ok(validator)
    }
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("compiled", &self.compiled.len())
            .finish()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, instance: &Value, schema: &SchemaFile) -> Result<Vec<Violation>, SchemaCheckError> {
        let validator = self.validator_for(schema)?;
        Ok(validator.iter_errors(instance).flat_map(violations_for).collect())
    }

    fn check_schema(&self, filename: &str, content: &str) -> Result<(), SchemaCheckError> {
        let schema = Self::parse(filename, content.as_bytes())?;
        Self::compile(filename, &schema).map(|_| ())
    }
}

/// Render one engine error in the `<path>: <message>` style.
///
/// Missing required properties and unexpected additional properties are reported at the
/// property's own path, one violation per property.
fn violations_for(error: ValidationError<'_>) -> Vec<Violation> {
    let path = pointer_to_path(&error.instance_path.to_string());
    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| property.to_string());
            vec![Violation::new(
                child_path(&path, &name),
                "is missing but it is required",
            )]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|name| {
                Violation::new(
                    child_path(&path, name),
                    "is not defined in the schema and the schema does not allow additional properties",
                )
            })
            .collect(),
        ValidationErrorKind::Enum { options } => vec![Violation::new(
            path,
            format!("does not have a value in the enumeration {}", options),
        )],
        _ => vec![Violation::new(path, error.to_string())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: Value) -> SchemaFile {
        SchemaFile::found("base.1.0.0.schema.json", value.to_string().into_bytes())
    }

    fn base_schema() -> SchemaFile {
        schema(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "required": ["upload_id", "stage_info"],
            "properties": {
                "upload_id": {"type": "string"},
                "stage_info": {
                    "type": "object",
                    "required": ["action"],
                    "properties": {"action": {"type": "string"}}
                },
                "disposition_type": {"enum": ["add", "replace"]}
            }
        }))
    }

    #[test]
    fn test_valid_document() {
        let validator = JsonSchemaValidator::new();
        let violations = validator
            .validate(&json!({"upload_id": "u1", "stage_info": {"action": "a"}}), &base_schema())
            .unwrap();
        assert!(violations.is_empty());
    }

    #[test]
    fn test_required_messages() {
        let validator = JsonSchemaValidator::new();
        let violations = validator
            .validate(&json!({"stage_info": {}}), &base_schema())
            .unwrap();
        let messages: Vec<String> = violations.iter().map(ToString::to_string).collect();
        assert!(messages.contains(&"$.upload_id: is missing but it is required".to_string()));
        assert!(messages.contains(&"$.stage_info.action: is missing but it is required".to_string()));
    }

    #[test]
    fn test_type_and_enum_paths() {
        let validator = JsonSchemaValidator::new();
        let violations = validator
            .validate(
                &json!({"upload_id": 7, "stage_info": {"action": "a"}, "disposition_type": "merge"}),
                &base_schema(),
            )
            .unwrap();
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().any(|v| v.instance_path == "$.upload_id"));
        assert!(violations
            .iter()
            .any(|v| v.instance_path == "$.disposition_type" && v.message.contains("enumeration")));
    }

    #[test]
    fn test_additional_properties() {
        let validator = JsonSchemaValidator::new();
        let strict = schema(json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "additionalProperties": false
        }));
        let violations = validator.validate(&json!({"a": "x", "b": 1}), &strict).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].instance_path, "$.b");
    }

    #[test]
    fn test_recompiles_on_content_change() {
        let validator = JsonSchemaValidator::new();
        let loose = schema(json!({"type": "object"}));
        let tight = schema(json!({"type": "object", "required": ["x"]}));

        assert!(validator.validate(&json!({}), &loose).unwrap().is_empty());
        assert_eq!(validator.validate(&json!({}), &tight).unwrap().len(), 1);
        assert_eq!(validator.compiled_count(), 1);
    }

    #[test]
    fn test_unusable_schemas() {
        let validator = JsonSchemaValidator::new();
        assert!(matches!(
            validator.validate(&json!({}), &SchemaFile::missing("x.1.0.schema.json")),
            Err(SchemaCheckError::MissingContent { .. })
        ));
        assert!(matches!(
            validator.check_schema("x.1.0.schema.json", "{not json"),
            Err(SchemaCheckError::NotJson { .. })
        ));
        assert!(matches!(
            validator.check_schema("x.1.0.schema.json", r#"{"type": 12}"#),
            Err(SchemaCheckError::Compile { .. })
        ));
        assert!(validator
            .check_schema("x.1.0.schema.json", r#"{"type": "object"}"#)
            .is_ok());
    }
}
