//! Report Sink CLI - validate and persist processing-status reports
//!
//! This is the main entry point for the `reportsink` binary, providing commands for
//! validating single reports, ingesting batches, and administering the schema store.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use logging::timing::Timer;
use output::OutputWriter;
use std::process;
use tracing::instrument;
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let config = match Config::load_with_file(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(&e, cli.use_color()),
    };

    let use_color = cli.use_color() && config.output.color;
    control::set_override(use_color);

    // Held until exit so buffered file logs are flushed
    let guard = match init_logging(&cli, &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    match run(cli, config, use_color).await {
        Ok(()) => {}
        Err(e) => {
            drop(guard);
            exit_with(&e, use_color)
        }
    }
}

fn exit_with(error: &error::Error, use_color: bool) -> ! {
    eprintln!("{}", error::format_error(error, use_color));
    if error.should_show_help() {
        eprintln!("\nFor more information, try '--help'");
    }
    process::exit(error.exit_code());
}

/// Main application logic
#[instrument(skip_all, fields(command = ?cli.command))]
async fn run(cli: Cli, config: Config, use_color: bool) -> Result<()> {
    let _timer = Timer::new("cli_execution");
    let mut output = OutputWriter::new(cli.output, use_color, cli.quiet);

    tracing::info!(
        verbosity = cli.verbosity_level(),
        loader = config.schema_loader.system.as_str(),
        "Executing command"
    );

    match cli.command {
        Commands::Validate(args) => handlers::handle_validate(args, &config, &mut output).await,
        Commands::Ingest(args) => handlers::handle_ingest(args, &config, &mut output).await,
        Commands::Schemas(args) => handlers::handle_schemas(args, &config, &mut output).await,
        Commands::Config(args) => handlers::handle_config(args, &config, &mut output).await,
        Commands::Completions(args) => handlers::handle_completions(args),
    }
}

/// Initialize logging from the configuration file, environment and flags
fn init_logging(cli: &Cli, config: &Config) -> Result<Option<WorkerGuard>> {
    let mut logging_config = config.logging.clone();
    logging_config.apply_verbosity(cli.verbosity_level());

    if cli.quiet {
        logging_config.level = "error".to_string();
        logging_config.console = false;
    }

    logging::init_logging(&logging_config)
}
