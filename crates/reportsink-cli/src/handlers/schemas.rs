//! Schema administration command handlers

use super::utils::{read_file, run_blocking, with_schema_dir, Pipeline};
use crate::cli::{SchemaCheckArgs, SchemaRef, SchemaUpsertArgs, SchemasAction, SchemasArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use reportsink_core::SchemaAdmin;
use reportsink_schemas::{JsonSchemaValidator, SchemaValidator};

/// Handle the schemas command
pub async fn handle_schemas(args: SchemasArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let config = with_schema_dir(config, args.schemas.as_deref());
    match args.action {
        SchemasAction::List => handle_list(config, output).await,
        SchemasAction::Show(schema) => handle_show(schema, config, output).await,
        SchemasAction::Upsert(upsert) => handle_upsert(upsert, config, output).await,
        SchemasAction::Remove(schema) => handle_remove(schema, config, output).await,
        SchemasAction::Check(check) => handle_check(check, output),
        SchemasAction::Info => handle_info(config, output).await,
    }
}

/// Run `f` against an admin bound to the configured loader, off the runtime
async fn with_admin<F, T>(config: Config, f: F) -> Result<T>
where
    F: FnOnce(&SchemaAdmin) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    run_blocking(move || {
        let pipeline = Pipeline::from_config(&config)?;
        f(&SchemaAdmin::new(pipeline.loader, pipeline.validator))
    })
    .await
}

async fn handle_list(config: Config, output: &mut OutputWriter) -> Result<()> {
    let spinner = output.spinner("Listing schemas");
    let schemas = with_admin(config, |admin| Ok(admin.list_schemas()?)).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    output.schema_list(&schemas?)
}

async fn handle_show(schema: SchemaRef, config: Config, output: &mut OutputWriter) -> Result<()> {
    let SchemaRef { name, version } = schema;
    let lookup = (name.clone(), version.clone());
    let content = with_admin(config, move |admin| Ok(admin.schema(&lookup.0, &lookup.1)?)).await?;

    match content {
        Some(content) => output.data(&content),
        None => Err(Error::other(format!("Schema not found: {} {}", name, version))),
    }
}

async fn handle_upsert(args: SchemaUpsertArgs, config: Config, output: &mut OutputWriter) -> Result<()> {
    let content = read_file(&args.file)?;
    let SchemaRef { name, version } = args.schema;
    let filename = with_admin(config, move |admin| Ok(admin.upsert_schema(&name, &version, &content)?)).await?;
    output.success(&format!("✓ Stored {}", filename))
}

async fn handle_remove(schema: SchemaRef, config: Config, output: &mut OutputWriter) -> Result<()> {
    let SchemaRef { name, version } = schema;
    let filename = with_admin(config, move |admin| Ok(admin.remove_schema(&name, &version)?)).await?;
    output.success(&format!("✓ Removed {}", filename))
}

fn handle_check(args: SchemaCheckArgs, output: &mut OutputWriter) -> Result<()> {
    let content = read_file(&args.file)?;
    let filename = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    JsonSchemaValidator::new()
        .check_schema(&filename, &content)
        .map_err(reportsink_core::Error::from)?;
    output.success(&format!("✓ {} is a valid Draft 7 schema", filename))
}

async fn handle_info(config: Config, output: &mut OutputWriter) -> Result<()> {
    let info = with_admin(config, |admin| Ok(admin.info())).await?;
    output.data(&info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use std::path::Path;

    fn output() -> OutputWriter {
        OutputWriter::with_writer(OutputFormat::Json, false, true, Box::new(std::io::sink()))
    }

    fn schemas_args(dir: &Path, action: SchemasAction) -> SchemasArgs {
        SchemasArgs {
            schemas: Some(dir.to_path_buf()),
            action,
        }
    }

    fn debatch() -> SchemaRef {
        SchemaRef {
            name: "hl7v2-debatch".to_string(),
            version: "1.0.0".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_show_remove() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("candidate.json");
        std::fs::write(&file, r#"{"type": "object", "required": ["message_count"]}"#).unwrap();
        let config = Config::default();

        let upsert = SchemaUpsertArgs {
            schema: debatch(),
            file,
        };
        handle_schemas(schemas_args(dir.path(), SchemasAction::Upsert(upsert)), &config, &mut output())
            .await
            .unwrap();
        assert!(dir.path().join("hl7v2-debatch.1.0.0.schema.json").exists());

        handle_schemas(schemas_args(dir.path(), SchemasAction::Show(debatch())), &config, &mut output())
            .await
            .unwrap();

        handle_schemas(schemas_args(dir.path(), SchemasAction::Remove(debatch())), &config, &mut output())
            .await
            .unwrap();
        assert!(!dir.path().join("hl7v2-debatch.1.0.0.schema.json").exists());

        let err = handle_schemas(schemas_args(dir.path(), SchemasAction::Show(debatch())), &config, &mut output())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Schema not found"));
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_schema() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("candidate.json");
        std::fs::write(&file, r#"{"type": 12}"#).unwrap();

        let upsert = SchemaUpsertArgs {
            schema: debatch(),
            file,
        };
        let err = handle_schemas(
            schemas_args(dir.path(), SchemasAction::Upsert(upsert)),
            &Config::default(),
            &mut output(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Core(reportsink_core::Error::InvalidSchema(_))));
        assert!(!dir.path().join("hl7v2-debatch.1.0.0.schema.json").exists());
    }

    #[test]
    fn test_check_reports_non_json() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.schema.json");
        std::fs::write(&file, "{ not json").unwrap();

        let err = handle_check(SchemaCheckArgs { file }, &mut output()).unwrap_err();
        assert!(matches!(err, Error::Core(_)));
    }
}
