//! Report data model
//!
//! Inbound messages use snake_case keys (`upload_id`, `stage_info`, ...). Stored records
//! use camelCase keys (`uploadId`, `stageInfo`, ...) and accept the snake_case spelling
//! on input for the nested structures that are copied across unchanged.

use chrono::{DateTime, Utc};
use reportsink_schemas::content_schema_file_name;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Whether a new report is added next to earlier reports for the same stage or replaces them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispositionType {
    #[default]
    Add,
    Replace,
}

impl fmt::Display for DispositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispositionType::Add => write!(f, "add"),
            DispositionType::Replace => write!(f, "replace"),
        }
    }
}

impl FromStr for DispositionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(DispositionType::Add),
            "replace" => Ok(DispositionType::Replace),
            other => Err(format!("unknown disposition type '{}'", other)),
        }
    }
}

/// Issue raised by a processing stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The processing stage that produced a report
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Stage action; with `replace` disposition, reports sharing it are superseded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<Issue>>,

    #[serde(alias = "start_processing_time", skip_serializing_if = "Option::is_none")]
    pub start_processing_time: Option<String>,

    #[serde(alias = "end_processing_time", skip_serializing_if = "Option::is_none")]
    pub end_processing_time: Option<String>,
}

/// Bookkeeping about the transport message that carried a report
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(alias = "message_uuid", skip_serializing_if = "Option::is_none")]
    pub message_uuid: Option<String>,

    #[serde(alias = "message_hash", skip_serializing_if = "Option::is_none")]
    pub message_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,

    #[serde(alias = "message_index", skip_serializing_if = "Option::is_none")]
    pub message_index: Option<i64>,
}

/// Text of a JSON value as used for schema selection.
///
/// Strings are taken as is and numbers and booleans by their JSON text. Objects and
/// arrays have empty text. Null has none.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => Some(String::new()),
    }
}

/// Content schema selector carried in `content`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDefinition {
    pub schema_name: String,
    pub schema_version: String,
}

impl SchemaDefinition {
    /// Read `content_schema_name` and `content_schema_version`; both must have non-empty text
    pub fn from_content(content: &Value) -> Option<Self> {
        let non_empty = |key: &str| content.get(key).and_then(value_text).filter(|s| !s.is_empty());
        Some(Self {
            schema_name: non_empty("content_schema_name")?,
            schema_version: non_empty("content_schema_version")?,
        })
    }

    pub fn file_name(&self) -> String {
        content_schema_file_name(&self.schema_name, &self.schema_version)
    }
}

/// Identification fields of an inbound report message.
///
/// Built leniently from JSON: a field with an unexpected type is treated as absent, so the
/// same projection serves both accepted messages and salvage of rejected ones.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportMessage {
    pub report_schema_version: Option<String>,
    pub upload_id: Option<String>,
    pub data_stream_id: Option<String>,
    pub data_stream_route: Option<String>,
    pub dex_ingest_datetime: Option<String>,
    pub message_metadata: Option<MessageMetadata>,
    pub stage_info: Option<StageInfo>,
    pub tags: Option<Map<String, Value>>,
    pub data: Option<Map<String, Value>>,
    pub jurisdiction: Option<String>,
    pub sender_id: Option<String>,
    pub data_producer_id: Option<String>,
    pub disposition_type: Option<String>,
    pub content_type: Option<String>,
    pub content: Option<Value>,
}

/// Scalar string fields that can be recovered from raw text when a message does not parse
pub const SALVAGEABLE_FIELDS: &[&str] = &[
    "report_schema_version",
    "upload_id",
    "data_stream_id",
    "data_stream_route",
    "dex_ingest_datetime",
    "jurisdiction",
    "sender_id",
    "data_producer_id",
    "disposition_type",
    "content_type",
];

/// Field names still accepted from older producers, with their replacements
pub const DEPRECATED_FIELDS: &[(&str, &str)] = &[
    ("destination_id", "data_stream_id"),
    ("event_type", "data_stream_route"),
];

/// Current name for a possibly deprecated top-level field
pub fn current_field_name(field: &str) -> &str {
    DEPRECATED_FIELDS
        .iter()
        .find(|(old, _)| *old == field)
        .map(|(_, new)| *new)
        .unwrap_or(field)
}

/// Rename deprecated top-level fields in place; a value under the current name wins
pub fn replace_deprecated_fields(document: &mut Value) {
    let Some(object) = document.as_object_mut() else {
        return;
    };
    for (old, new) in DEPRECATED_FIELDS {
        if let Some(value) = object.remove(*old) {
            if !object.contains_key(*new) {
                object.insert((*new).to_string(), value);
            }
        }
    }
}

impl ReportMessage {
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        let object = |key: &str| value.get(key).and_then(Value::as_object).cloned();

        Self {
            report_schema_version: text("report_schema_version"),
            upload_id: text("upload_id"),
            data_stream_id: text("data_stream_id"),
            data_stream_route: text("data_stream_route"),
            dex_ingest_datetime: text("dex_ingest_datetime"),
            message_metadata: typed(value, "message_metadata"),
            stage_info: typed(value, "stage_info"),
            tags: object("tags"),
            data: object("data"),
            jurisdiction: text("jurisdiction"),
            sender_id: text("sender_id"),
            data_producer_id: text("data_producer_id"),
            disposition_type: text("disposition_type"),
            content_type: text("content_type"),
            content: value.get("content").filter(|c| !c.is_null()).cloned(),
        }
    }

    /// Disposition requested by the message; absent or unrecognized values mean `add`
    pub fn disposition(&self) -> DispositionType {
        self.disposition_type
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or_default()
    }

    /// Project into a stored report with the given identifier
    pub fn to_report(&self, id: impl Into<String>, timestamp: DateTime<Utc>) -> Report {
        let id = id.into();
        Report {
            id: id.clone(),
            upload_id: self.upload_id.clone(),
            report_id: id,
            data_stream_id: self.data_stream_id.clone(),
            data_stream_route: self.data_stream_route.clone(),
            dex_ingest_date_time: self.dex_ingest_datetime.clone(),
            message_metadata: self.message_metadata.clone(),
            stage_info: self.stage_info.clone(),
            tags: self.tags.clone(),
            data: self.data.clone(),
            content_type: self.content_type.clone(),
            jurisdiction: self.jurisdiction.clone(),
            sender_id: self.sender_id.clone(),
            data_producer_id: self.data_producer_id.clone(),
            content: self.content.clone(),
            timestamp,
        }
    }
}

fn typed<T: DeserializeOwned>(value: &Value, key: &str) -> Option<T> {
    value
        .get(key)
        .filter(|v| v.is_object())
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

/// A validated report as stored in the reports collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub upload_id: Option<String>,
    pub report_id: String,
    pub data_stream_id: Option<String>,
    pub data_stream_route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dex_ingest_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_metadata: Option<MessageMetadata>,
    pub stage_info: Option<StageInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_producer_id: Option<String>,
    pub content: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl Report {
    /// Partition key used when storing the report
    pub fn partition_key(&self) -> &str {
        self.upload_id.as_deref().unwrap_or(&self.id)
    }
}

/// A rejected message as stored in the dead-letter collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDeadLetter {
    #[serde(flatten)]
    pub report: Report,
    pub disposition_type: DispositionType,
    pub dead_letter_reasons: Vec<String>,
    pub validation_schemas: Vec<String>,
}

impl ReportDeadLetter {
    pub fn id(&self) -> &str {
        &self.report.id
    }

    pub fn partition_key(&self) -> &str {
        self.report.partition_key()
    }
}
