//! Configuration command handlers

use super::utils::{run_blocking, Pipeline};
use crate::cli::{ConfigAction, ConfigArgs, ConfigFormat, ConfigShowArgs, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::logging::redaction;
use crate::output::OutputWriter;
use serde_json::Value;

/// Handle the config command
pub async fn handle_config(args: ConfigArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    match args.action {
        ConfigAction::Show(show_args) => handle_config_show(show_args, config, output),
        ConfigAction::Validate => handle_config_validate(config, output).await,
    }
}

/// Print the effective configuration with credentials redacted
fn handle_config_show(args: ConfigShowArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    output.write(&render_config(config, args.format)?)
}

fn render_config(config: &Config, format: ConfigFormat) -> Result<String> {
    let mut value = serde_json::to_value(config)?;
    redaction::redact_json_value(&mut value);

    Ok(match format {
        ConfigFormat::Json => format!("{}\n", serde_json::to_string_pretty(&value)?),
        ConfigFormat::Yaml => serde_yaml::to_string(&value)?,
        ConfigFormat::Toml => {
            // TOML has no null
            strip_nulls(&mut value);
            toml::to_string_pretty(&value)?
        }
    })
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

/// Check the configuration and that its schema loader can be built
async fn handle_config_validate(config: &Config, output: &mut OutputWriter) -> Result<()> {
    output.info("Validating configuration")?;

    for warning in config.validate()? {
        output.warning(&warning)?;
    }

    let loader_config = config.clone();
    let info = run_blocking(move || {
        let pipeline = Pipeline::from_config(&loader_config)?;
        Ok(pipeline.loader.info())
    })
    .await?;

    output.success("✓ Configuration is valid")?;
    if output.format() == OutputFormat::Human {
        output.section("Schema loader")?;
        output.table(&["SYSTEM", "LOCATION"], vec![vec![info.system, info.location]])
    } else {
        output.data(&info)
    }
}
