//! Command handlers for CLI subcommands
//!
//! Loader and sink work is synchronous; handlers move it onto blocking threads
//! so the async runtime stays free for progress output and task scheduling.

mod completions;
mod config;
mod ingest;
mod schemas;
mod utils;
mod validate;

pub use completions::handle_completions;
pub use config::handle_config;
pub use ingest::handle_ingest;
pub use schemas::handle_schemas;
pub use validate::handle_validate;
