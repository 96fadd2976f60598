//! Report Sink Schemas - schema sourcing and JSON Schema validation for reports
//!
//! This crate owns everything the report sink needs to know about schema files:
//! - **Schema files**: the [`SchemaFile`] value object and the file naming contract
//!   (`base.<version>.schema.json`, `<name>.<version>.schema.json`)
//! - **Loaders**: the [`SchemaLoader`] trait with filesystem and object-store backends
//! - **Caching**: [`CachedSchemaLoader`], a TTL decorator with single-flight misses and
//!   explicit invalidation
//! - **Validation**: a Draft 7 [`JsonSchemaValidator`] producing networknt-style
//!   violation messages such as `$.upload_id: is missing but it is required`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reportsink_schemas::{
//!     CachedSchemaLoader, FileSystemLoader, JsonSchemaValidator, SchemaLoader, SchemaValidator,
//! };
//! use serde_json::json;
//!
//! let loader = CachedSchemaLoader::new(FileSystemLoader::new("./schemas"));
//! let schema = loader.load_schema_file("base.1.0.0.schema.json")?;
//!
//! let validator = JsonSchemaValidator::new();
//! let violations = validator.validate(&json!({"content_type": "json"}), &schema)?;
//! for violation in &violations {
//!     println!("{}", violation);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Copyright (c) 2025 Report Sink Team
//! Licensed under the Apache-2.0 license

pub mod loader;
pub mod schema_file;
pub mod validation;

// Re-export commonly used types for convenience
pub use loader::{
    build_loader, CacheConfig, CacheStats, CachedSchemaLoader, Clock, FileSystemLoader, ManualClock,
    HttpObjectStore, InMemoryObjectStore, LoaderError, LoaderResult, LoaderSystem,
    ObjectStoreLoader, ObjectStoreProvider, ObjectStoreTransport, SchemaLoader,
    SchemaLoaderConfig, SystemClock,
};
pub use schema_file::{
    base_schema_file_name, content_schema_file_name, ReportSchemaMetadata, SchemaFile,
    SchemaLoaderInfo, DEFAULT_REPORT_SCHEMA_VERSION,
};
pub use validation::{JsonSchemaValidator, SchemaCheckError, SchemaValidator, Violation};
