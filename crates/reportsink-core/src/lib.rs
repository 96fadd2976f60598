//! Report Sink Core - validation pipeline and persistence for processing-status reports
//!
//! This crate takes raw report messages from any transport, validates them against a
//! versioned base schema and a content schema selected by the message itself, and
//! persists the outcome.
//!
//! # Main Components
//!
//! - **Validation**: [`ValidationOrchestrator`] runs the staged pipeline and returns a
//!   [`ValidationResult`] with the ordered reasons a report was rejected
//! - **Sink**: [`ReportSink`] persists valid reports and dead-letters rejected ones
//! - **Dead letters**: [`DeadLetterBuilder`] salvages identification fields even from
//!   malformed input
//! - **Administration**: [`SchemaAdmin`] upserts, removes and lists content schemas
//! - **Retry**: [`execute_with_retry`] retries transient infrastructure failures
//!
//! # Example
//!
//! ```no_run
//! use reportsink_core::{Repository, ReportSink, ValidationOrchestrator};
//! use reportsink_schemas::{CachedSchemaLoader, FileSystemLoader, JsonSchemaValidator};
//! use std::sync::Arc;
//!
//! fn example() -> reportsink_core::Result<()> {
//!     let loader = Arc::new(CachedSchemaLoader::new(FileSystemLoader::new("./schemas")));
//!     let orchestrator = ValidationOrchestrator::new(loader, Arc::new(JsonSchemaValidator::new()));
//!     let sink = ReportSink::new(orchestrator, Repository::in_memory());
//!
//!     let outcome = sink.process(r#"{"upload_id": "abc"}"#)?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod dead_letter;
pub mod error;
pub mod model;
pub mod persistence;
pub mod retry;
pub mod sink;
pub mod validation;

// Re-export main types for convenience
pub use admin::SchemaAdmin;
pub use dead_letter::{salvage, DeadLetterBuilder};
pub use error::{Error, Result};
pub use model::{
    DispositionType, Issue, MessageMetadata, Report, ReportDeadLetter, ReportMessage, SchemaDefinition,
    StageInfo,
};
pub use persistence::{
    Collection, CollectionExt, InMemoryCollection, Query, Repository, DEAD_LETTER_COLLECTION,
    REPORTS_COLLECTION,
};
pub use retry::{execute_with_retry, RetryDecision, RetryHandler, RetryPolicy};
pub use sink::{ReportSink, SinkOutcome};
pub use validation::{ErrorAccumulator, Stage, ValidationOrchestrator, ValidationResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
