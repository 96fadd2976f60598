//! Error types for schema loading operations
//!
//! A schema that simply does not exist is not an error for `load_schema_file`; it is a
//! [`SchemaFile`](crate::SchemaFile) with `exists == false`. The variants here cover
//! infrastructure failures and administrative misuse.
//!
//! Copyright (c) 2025 Report Sink Team
//! Licensed under the Apache-2.0 license

use std::path::PathBuf;
use thiserror::Error;

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Error types for schema loading operations
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Local file I/O errors
    #[error("Failed to access schema file '{path}': {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Remote store could not be reached or answered with an unexpected status
    #[error("Failed to fetch schema '{key}' from {location}: {reason}")]
    Fetch {
        location: String,
        key: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Remote store rejected our credentials
    #[error("Access to schema '{key}' in {location} was denied (status {status})")]
    Unauthorized {
        location: String,
        key: String,
        status: u16,
    },

    /// A schema expected to exist was not found (administrative operations)
    #[error("Schema file not found: {filename}")]
    SchemaNotFound { filename: String },

    /// Schema content is not usable as a JSON Schema
    #[error("Invalid schema '{filename}': {reason}")]
    InvalidSchema { filename: String, reason: String },

    /// JSON parsing errors
    #[error("Failed to parse JSON schema '{filename}': {source}")]
    JsonParseError {
        filename: String,
        source: serde_json::Error,
    },

    /// The configured loader system is not supported
    #[error("Unsupported schema loader system: '{system}'")]
    UnsupportedSystem { system: String },

    /// The backend does not support the requested operation
    #[error("Operation '{operation}' is not supported by the {system} schema loader")]
    UnsupportedOperation { system: String, operation: String },

    /// Missing or invalid loader configuration
    #[error("Schema loader configuration error: {reason}")]
    Configuration { reason: String },
}

impl LoaderError {
    /// Create an I/O error with path context
    pub fn io_error(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source: error,
        }
    }

    /// Create a fetch error without an underlying source
    pub fn fetch(location: impl Into<String>, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            location: location.into(),
            key: key.into(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Create a fetch error wrapping the transport error
    pub fn fetch_with_source<E>(location: impl Into<String>, key: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Fetch {
            location: location.into(),
            key: key.into(),
            reason: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    pub fn schema_not_found(filename: impl Into<String>) -> Self {
        Self::SchemaNotFound {
            filename: filename.into(),
        }
    }

    pub fn invalid_schema(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            filename: filename.into(),
            reason: reason.into(),
        }
    }

    /// Create a JSON parsing error with file context
    pub fn json_parse_error(filename: impl Into<String>, error: serde_json::Error) -> Self {
        Self::JsonParseError {
            filename: filename.into(),
            source: error,
        }
    }

    pub fn unsupported_operation(system: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            system: system.into(),
            operation: operation.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Get the local path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::IoError { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether this is an infrastructure failure of the backing store.
    ///
    /// Transient errors must be surfaced to the transport for redelivery and never turned
    /// into a dead-letter record.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::IoError { .. } | Self::Fetch { .. } | Self::Unauthorized { .. }
        )
    }
}
