//! Schema loading
//!
//! This module provides the pluggable schema sourcing used by report validation:
//! - [`SchemaLoader`], the trait every backend implements
//! - [`FileSystemLoader`] for schemas in a local directory
//! - [`ObjectStoreLoader`] for schemas stored as objects in an S3-like bucket or a
//!   Blob-like container, with the byte transport injected
//! - [`CachedSchemaLoader`], a decorator adding a TTL cache to any loader
//! - [`SchemaLoaderConfig`] and [`build_loader`] for configuration-driven construction
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use reportsink_schemas::loader::{CachedSchemaLoader, FileSystemLoader, SchemaLoader};
//!
//! let loader = CachedSchemaLoader::new(FileSystemLoader::new("/etc/reportsink/schemas"));
//! let schema = loader.load_schema_file("base.0.0.1.schema.json")?;
//! if !schema.exists() {
//!     println!("no such schema: {}", schema.name());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Copyright (c) 2025 Report Sink Team
//! Licensed under the Apache-2.0 license

pub mod cache;
pub mod config;
pub mod error;
pub mod fs;
pub mod object_store;

pub use cache::{CacheConfig, CacheStats, CachedSchemaLoader, Clock, ManualClock, SystemClock};
pub use config::{build_loader, LoaderSystem, SchemaLoaderConfig};
pub use error::{LoaderError, LoaderResult};
pub use fs::FileSystemLoader;
pub use object_store::{
    HttpObjectStore, InMemoryObjectStore, ObjectStoreLoader, ObjectStoreProvider,
    ObjectStoreTransport,
};

use crate::schema_file::{content_schema_file_name, ReportSchemaMetadata, SchemaFile, SchemaLoaderInfo};
use serde_json::Value;
use std::sync::Arc;

/// A source of report schema files.
///
/// `load_schema_file` never fails for a schema that does not exist; that case is a
/// [`SchemaFile`] with `exists == false`. An `Err` always means the backing store itself
/// failed (I/O, network, credentials) or the operation is not supported.
pub trait SchemaLoader: Send + Sync {
    /// Load the schema file with the given file name
    fn load_schema_file(&self, filename: &str) -> LoaderResult<SchemaFile>;

    /// Metadata for every schema file available from this loader
    fn schema_files(&self) -> LoaderResult<Vec<ReportSchemaMetadata>>;

    /// Which system backs this loader and where it reads from
    fn info(&self) -> SchemaLoaderInfo;

    /// Add or replace the schema for a name and version, returning its file name
    fn upsert_schema(&self, schema_name: &str, schema_version: &str, content: &str) -> LoaderResult<String>;

    /// Remove the schema for a name and version, returning its file name.
    ///
    /// Removing a schema that does not exist is an error.
    fn remove_schema(&self, schema_name: &str, schema_version: &str) -> LoaderResult<String>;

    /// Parsed JSON content of a schema file, `None` when it does not exist
    fn schema_content(&self, filename: &str) -> LoaderResult<Option<Value>> {
        let file = self.load_schema_file(filename)?;
        if !file.exists() {
            return Ok(None);
        }
        file.to_json().map(Some)
    }

    /// Parsed JSON content of the schema for a name and version
    fn schema_content_for(&self, schema_name: &str, schema_version: &str) -> LoaderResult<Option<Value>> {
        self.schema_content(&content_schema_file_name(schema_name, schema_version))
    }
}

impl<L: SchemaLoader + ?Sized> SchemaLoader for Box<L> {
    fn load_schema_file(&self, filename: &str) -> LoaderResult<SchemaFile> {
        (**self).load_schema_file(filename)
    }

    fn schema_files(&self) -> LoaderResult<Vec<ReportSchemaMetadata>> {
        (**self).schema_files()
    }

    fn info(&self) -> SchemaLoaderInfo {
        (**self).info()
    }

    fn upsert_schema(&self, schema_name: &str, schema_version: &str, content: &str) -> LoaderResult<String> {
        (**self).upsert_schema(schema_name, schema_version, content)
    }

    fn remove_schema(&self, schema_name: &str, schema_version: &str) -> LoaderResult<String> {
        (**self).remove_schema(schema_name, schema_version)
    }
}

impl<L: SchemaLoader + ?Sized> SchemaLoader for Arc<L> {
    fn load_schema_file(&self, filename: &str) -> LoaderResult<SchemaFile> {
        (**self).load_schema_file(filename)
    }

    fn schema_files(&self) -> LoaderResult<Vec<ReportSchemaMetadata>> {
        (**self).schema_files()
    }

    fn info(&self) -> SchemaLoaderInfo {
        (**self).info()
    }

    fn upsert_schema(&self, schema_name: &str, schema_version: &str, content: &str) -> LoaderResult<String> {
        (**self).upsert_schema(schema_name, schema_version, content)
    }

    fn remove_schema(&self, schema_name: &str, schema_version: &str) -> LoaderResult<String> {
        (**self).remove_schema(schema_name, schema_version)
    }
}
