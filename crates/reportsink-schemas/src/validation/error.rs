//! Violation and schema error types
//!
//! Copyright (c) 2025 Report Sink Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One way a document fails its schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// `$`-rooted path of the offending value, e.g. `$.stage_info.action`
    pub instance_path: String,
    /// What is wrong at that path
    pub message: String,
}

impl Violation {
    pub fn new(instance_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            instance_path: instance_path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.instance_path, self.message)
    }
}

/// A schema that cannot be used to validate anything
#[derive(Debug, Error)]
pub enum SchemaCheckError {
    /// The schema file has no content to compile
    #[error("Schema '{filename}' has no content")]
    MissingContent { filename: String },

    /// The schema text is not JSON
    #[error("Schema '{filename}' is not valid JSON: {source}")]
    NotJson {
        filename: String,
        source: serde_json::Error,
    },

    /// The schema is JSON but not a usable JSON Schema
    #[error("Schema '{filename}' is not a valid JSON Schema: {reason}")]
    Compile { filename: String, reason: String },
}

impl SchemaCheckError {
    pub fn filename(&self) -> &str {
        match self {
            Self::MissingContent { filename }
            | Self::NotJson { filename, .. }
            | Self::Compile { filename, .. } => filename,
        }
    }
}
