//! Output formatting and writing utilities
//!
//! This module formats validation results, ingest summaries and schema listings
//! as JSON, YAML or human-readable text, and provides progress indicators.

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::logging::redaction;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use reportsink_core::ValidationResult;
use reportsink_schemas::ReportSchemaMetadata;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;
use tracing::trace;

/// Counts produced by an ingest run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub total: usize,
    pub persisted: usize,
    pub dead_lettered: usize,
    /// Messages that hit infrastructure errors after all retries
    pub failed: usize,
    /// Dead-letter reasons with their counts
    pub reasons: BTreeMap<String, usize>,
    pub duration_ms: u64,
}

/// Trait for formatting output with specialized support for common types
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format a validation result
    fn format_validation_result(&self, result: &ValidationResult) -> Result<String>;

    /// Format an ingest summary
    fn format_ingest_summary(&self, summary: &IngestSummary) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty | OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }

    fn format_validation_result(&self, result: &ValidationResult) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_validation_result_human(result)),
            _ => self.format(result),
        }
    }

    fn format_ingest_summary(&self, summary: &IngestSummary) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_ingest_summary_human(summary)),
            _ => self.format(summary),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    show_progress: bool,
    quiet: bool,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool) -> Self {
        Self {
            format,
            use_color,
            show_progress: !quiet && io::stderr().is_terminal(),
            quiet,
            writer: Box::new(io::stdout()),
        }
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(format: OutputFormat, use_color: bool, quiet: bool, writer: Box<dyn Write>) -> Self {
        Self {
            format,
            use_color,
            show_progress: false,
            quiet,
            writer,
        }
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write raw output
    pub fn write(&mut self, content: &str) -> Result<()> {
        write!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if self.format != OutputFormat::Human {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }
        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write data in the configured format; credentials are redacted first
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let mut value = serde_json::to_value(value)?;
        redaction::redact_json_value(&mut value);
        trace!(bytes = value.to_string().len(), "Writing data");

        let formatted = self.format.format(&value)?;
        self.write_formatted(&formatted)
    }

    /// Write a validation result
    pub fn validation_result(&mut self, result: &ValidationResult) -> Result<()> {
        let formatted = self.format.format_validation_result(result)?;
        self.write_formatted(&formatted)
    }

    /// Write an ingest summary
    pub fn ingest_summary(&mut self, summary: &IngestSummary) -> Result<()> {
        let formatted = self.format.format_ingest_summary(summary)?;
        self.write_formatted(&formatted)
    }

    /// Write a schema listing as a table, or as data for machine formats
    pub fn schema_list(&mut self, schemas: &[ReportSchemaMetadata]) -> Result<()> {
        if self.format != OutputFormat::Human {
            return self.data(&schemas);
        }
        if schemas.is_empty() {
            return self.info("No schemas found");
        }
        let rows = schemas
            .iter()
            .map(|s| {
                vec![
                    s.schema_name.clone(),
                    s.schema_version.clone(),
                    s.filename.clone(),
                    s.description.clone(),
                ]
            })
            .collect();
        self.table(&["NAME", "VERSION", "FILE", "DESCRIPTION"], rows)
    }

    fn write_formatted(&mut self, formatted: &str) -> Result<()> {
        if formatted.ends_with('\n') {
            self.write(formatted)
        } else {
            self.writeln(formatted)
        }
    }

    /// Create a progress bar for long operations
    pub fn progress_bar(&self, length: u64, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new(length);
        pb.set_style(default_progress_style());
        pb.set_message(message.to_string());
        Some(pb)
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(default_spinner_style());
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    /// Write a table (for human format)
    pub fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }

        let mut widths = headers.iter().map(|h| h.len()).collect::<Vec<_>>();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        let header_row = headers
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" │ ");
        if self.use_color {
            self.writeln(&header_row.bold().to_string())?;
        } else {
            self.writeln(&header_row)?;
        }

        let separator = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─");
        self.writeln(&separator)?;

        for row in rows {
            let row_str = row
                .iter()
                .enumerate()
                .map(|(i, cell)| match widths.get(i) {
                    Some(width) => format!("{:width$}", cell, width = *width),
                    None => cell.clone(),
                })
                .collect::<Vec<_>>()
                .join(" │ ");
            self.writeln(row_str.trim_end())?;
        }

        Ok(())
    }
}

/// Progress bar style for ingest
pub fn default_progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Spinner style for schema store calls
pub fn default_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn format_validation_result_human(result: &ValidationResult) -> String {
    let mut output = String::new();

    let status = if result.status { "VALID" } else { "REJECTED" };
    output.push_str(&format!("Status: {}\n", status));
    output.push_str(&format!("Reason: {}\n", result.reason));

    if !result.schema_files_attempted.is_empty() {
        output.push_str("\nSchema files:\n");
        for file in &result.schema_files_attempted {
            output.push_str(&format!("  - {}\n", file));
        }
    }

    if !result.invalid_data.is_empty() {
        output.push_str(&format!("\nProblems ({}):\n", result.invalid_data.len()));
        for (i, message) in result.invalid_data.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, message));
        }
    }

    output
}

fn format_ingest_summary_human(summary: &IngestSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Processed {} messages in {}ms\n",
        summary.total, summary.duration_ms
    ));
    output.push_str(&format!("  Persisted:     {}\n", summary.persisted));
    output.push_str(&format!("  Dead-lettered: {}\n", summary.dead_lettered));
    if summary.failed > 0 {
        output.push_str(&format!("  Failed:        {}\n", summary.failed));
    }

    if !summary.reasons.is_empty() {
        output.push_str("\nDead-letter reasons:\n");
        let mut reasons: Vec<_> = summary.reasons.iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (reason, count) in reasons {
            output.push_str(&format!("  {:>5}  {}\n", count, reason));
        }
    }

    output
}
