//! Validate command handler

use super::utils::{read_file, run_blocking, with_schema_dir, Pipeline};
use crate::cli::ValidateArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use reportsink_core::model::replace_deprecated_fields;
use reportsink_core::{ValidationOrchestrator, ValidationResult};
use serde_json::Value;

/// Handle the validate command
pub async fn handle_validate(args: ValidateArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::with_details("validate", &args.report.display().to_string());
    output.info(&format!("Validating report: {}", args.report.display()))?;

    let raw = read_file(&args.report)?;
    let config = with_schema_dir(config, args.schemas.as_deref());

    let spinner = output.spinner("Loading schemas");
    let result = run_blocking(move || {
        let pipeline = Pipeline::from_config(&config)?;
        validate_raw(&pipeline.orchestrator(), &raw)
    })
    .await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let result = result?;

    output.validation_result(&result)?;
    if result.status {
        output.success("✓ Report is valid")?;
        Ok(())
    } else {
        Err(Error::Rejected {
            reason: result.reason,
        })
    }
}

/// Validate a raw message the way the sink does, accepting deprecated field names
pub fn validate_raw(orchestrator: &ValidationOrchestrator, raw: &str) -> Result<ValidationResult> {
    match serde_json::from_str::<Value>(raw) {
        Ok(mut document) => {
            replace_deprecated_fields(&mut document);
            Ok(orchestrator.validate_document(&document)?)
        }
        Err(e) => Ok(ValidationOrchestrator::malformed(&e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use reportsink_schemas::{FileSystemLoader, JsonSchemaValidator};
    use std::sync::Arc;

    fn orchestrator(dir: &std::path::Path) -> ValidationOrchestrator {
        ValidationOrchestrator::new(
            Arc::new(FileSystemLoader::new(dir)),
            Arc::new(JsonSchemaValidator::new()),
        )
    }

    #[test]
    fn test_deprecated_names_validate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.0.0.1.schema.json"),
            r#"{"type": "object", "required": ["data_stream_id"]}"#,
        )
        .unwrap();

        let result = validate_raw(
            &orchestrator(dir.path()),
            r#"{"destination_id": "celr", "content_type": "base64"}"#,
        )
        .unwrap();
        assert!(result.status, "{:?}", result);
    }

    #[test]
    fn test_malformed_is_a_result() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate_raw(&orchestrator(dir.path()), "{oops").unwrap();
        assert!(!result.status);
        assert!(result.schema_files_attempted.is_empty());
    }

    #[tokio::test]
    async fn test_rejection_is_an_error_exit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.0.0.1.schema.json"),
            r#"{"type": "object", "required": ["upload_id"]}"#,
        )
        .unwrap();
        let report = dir.path().join("report.json");
        std::fs::write(&report, r#"{"content_type": "json"}"#).unwrap();

        let args = ValidateArgs {
            report,
            schemas: Some(dir.path().to_path_buf()),
        };
        let mut output = OutputWriter::with_writer(OutputFormat::Json, false, true, Box::new(std::io::sink()));
        let err = handle_validate(args, &Config::default(), &mut output).await.unwrap_err();
        assert!(matches!(err, Error::Rejected { .. }));
    }
}
