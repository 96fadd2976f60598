//! Error types for the report sink core
//!
//! Expected rejections of report content are not errors: they are a
//! [`ValidationResult`](crate::ValidationResult) with `status == false`. The variants here
//! cover infrastructure failures and misuse, using thiserror for the definitions and
//! anyhow for free-form sources.

use reportsink_schemas::{LoaderError, SchemaCheckError};
use thiserror::Error;

/// Main error type for report sink operations
#[derive(Error, Debug)]
pub enum Error {
    /// The schema store failed or refused an operation
    #[error("Schema store error: {0}")]
    SchemaFetch(#[from] LoaderError),

    /// A collection rejected or failed a write
    #[error("Persistence error in '{collection}': {message}")]
    Persistence {
        collection: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// JSON parsing and serialization errors outside report validation
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Schema content offered for administration is not a usable JSON Schema
    #[error("Invalid schema: {0}")]
    InvalidSchema(#[from] SchemaCheckError),

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn persistence(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persistence {
            collection: collection.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the failure is in infrastructure rather than in the message.
    ///
    /// Transient failures must be retried or redelivered, never dead-lettered.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::SchemaFetch(e) => e.is_transient(),
            Self::Persistence { .. } => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}
