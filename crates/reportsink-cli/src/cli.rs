//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::path::PathBuf;

/// Report Sink CLI - validate and persist processing-status reports
///
/// Validates report messages against versioned base and content JSON schemas,
/// ingests batches of reports, and manages the schema store.
#[derive(Parser, Debug)]
#[command(
    name = "reportsink",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "REPORTSINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate one report message against the schema store
    Validate(ValidateArgs),

    /// Validate and persist a batch of report messages
    Ingest(IngestArgs),

    /// Inspect and manage content schemas
    Schemas(SchemasArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the report message (JSON)
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,

    /// Directory of schema files, overriding the configured loader
    #[arg(long, value_name = "DIR")]
    pub schemas: Option<PathBuf>,
}

/// Arguments for the ingest command
#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// A JSON file, a JSON-lines file, or a directory of `*.json` files
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory of schema files, overriding the configured loader
    #[arg(long, value_name = "DIR")]
    pub schemas: Option<PathBuf>,

    /// Write `reports.jsonl` and `dead_letters.jsonl` into this directory
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Number of messages processed at once (defaults to the configured value)
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Maximum retries for transient failures (defaults to the configured value)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,
}

/// Arguments for the schemas command
#[derive(Parser, Debug)]
pub struct SchemasArgs {
    /// Directory of schema files, overriding the configured loader
    #[arg(long, global = true, value_name = "DIR")]
    pub schemas: Option<PathBuf>,

    #[command(subcommand)]
    pub action: SchemasAction,
}

/// Schema management actions
#[derive(Subcommand, Debug)]
pub enum SchemasAction {
    /// List every schema in the store
    List,

    /// Print the content of one content schema
    Show(SchemaRef),

    /// Add or replace a content schema after checking it
    Upsert(SchemaUpsertArgs),

    /// Remove a content schema
    Remove(SchemaRef),

    /// Check that a file is a usable JSON schema without storing it
    Check(SchemaCheckArgs),

    /// Show which store the loader reads from
    Info,
}

/// A content schema name and version
#[derive(Parser, Debug)]
pub struct SchemaRef {
    /// Schema name, e.g. hl7v2-debatch
    pub name: String,

    /// Schema version, e.g. 1.0.0
    #[arg(id = "schema_version", value_name = "VERSION")]
    pub version: String,
}

/// Arguments for schemas upsert
#[derive(Parser, Debug)]
pub struct SchemaUpsertArgs {
    #[command(flatten)]
    pub schema: SchemaRef,

    /// File holding the schema content
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Arguments for schemas check
#[derive(Parser, Debug)]
pub struct SchemaCheckArgs {
    /// File holding the schema content
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration values
    Show(ConfigShowArgs),

    /// Validate current configuration
    Validate,
}

/// Arguments for config show
#[derive(Parser, Debug)]
pub struct ConfigShowArgs {
    /// Show configuration in specified format
    #[arg(short, long, value_enum, default_value = "toml")]
    pub format: ConfigFormat,
}

/// Configuration file formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}
