//! Schema file value objects and the schema file naming contract
//!
//! Copyright (c) 2025 Report Sink Team
//! Licensed under the Apache-2.0 license

use crate::loader::error::{LoaderError, LoaderResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// Base schema version used when a report does not carry `report_schema_version`.
///
/// Kept for backward compatibility with reports produced before versioned base schemas
/// existed. Never upgrade this silently.
pub const DEFAULT_REPORT_SCHEMA_VERSION: &str = "0.0.1";

const SCHEMA_FILE_SUFFIX: &str = ".schema.json";

static VERSIONED_NAME_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn versioned_name_regex() -> Option<&'static Regex> {
    VERSIONED_NAME_REGEX
        .get_or_init(|| Regex::new(r"^(.+?)\.([0-9]+\.[0-9]+(?:\.[0-9]+)*)\.schema\.json$").ok())
        .as_ref()
}

/// File name of the base schema for a report schema version
pub fn base_schema_file_name(report_schema_version: &str) -> String {
    format!("base.{}{}", report_schema_version, SCHEMA_FILE_SUFFIX)
}

/// File name of a content schema
pub fn content_schema_file_name(schema_name: &str, schema_version: &str) -> String {
    format!("{}.{}{}", schema_name, schema_version, SCHEMA_FILE_SUFFIX)
}

/// A schema file as returned by a loader.
///
/// "Not found" is a value (`exists == false`), not an error. Cloning is cheap since the
/// bytes are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFile {
    name: String,
    exists: bool,
    content: Option<Arc<[u8]>>,
}

impl SchemaFile {
    /// A schema file that was found with the given content
    pub fn found(name: impl Into<String>, content: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            exists: true,
            content: Some(content.into()),
        }
    }

    /// A schema file that does not exist in the backing store
    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exists: false,
            content: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Raw schema bytes, absent when the file does not exist
    pub fn bytes(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    /// Parse the schema bytes as JSON
    pub fn to_json(&self) -> LoaderResult<Value> {
        let bytes = self
            .bytes()
            .ok_or_else(|| LoaderError::schema_not_found(self.name.clone()))?;
        serde_json::from_slice(bytes).map_err(|e| LoaderError::json_parse_error(self.name.clone(), e))
    }
}

/// Descriptive metadata for one available report schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSchemaMetadata {
    pub filename: String,
    pub schema_name: String,
    pub schema_version: String,
    /// The schema `title`, or `"unknown"`
    pub description: String,
}

impl ReportSchemaMetadata {
    /// Build metadata from a schema filename and its raw content.
    ///
    /// Name and version come from the `<name>.<major>.<minor>[.<patch>...].schema.json`
    /// pattern; filenames that do not follow it report `"unknown"` for both.
    pub fn from_content(filename: &str, content: &[u8]) -> Self {
        let description = serde_json::from_slice::<Value>(content)
            .ok()
            .and_then(|schema| schema.get("title").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());

        let (schema_name, schema_version) = split_versioned_name(filename)
            .map(|(name, version)| (name.to_string(), version.to_string()))
            .unwrap_or_else(|| ("unknown".to_string(), "unknown".to_string()));

        Self {
            filename: filename.to_string(),
            schema_name,
            schema_version,
            description,
        }
    }
}

/// Split `<name>.<version>.schema.json` at the first dot followed by a dotted numeric
/// version with at least two components.
fn split_versioned_name(filename: &str) -> Option<(&str, &str)> {
    let captures = versioned_name_regex()?.captures(filename)?;
    Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

/// Identifies the backing system of a loader and where it reads from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaLoaderInfo {
    /// `file_system`, `s3` or `blob_storage`
    pub system: String,
    /// Directory, bucket or container
    pub location: String,
}

impl SchemaLoaderInfo {
    pub fn new(system: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            location: location.into(),
        }
    }
}
