//! Validation results and the accumulator that builds them

use serde::{Deserialize, Serialize};

/// Reason reported when every stage passes
pub const SUCCESS_REASON: &str = "Successfully validated the report schema";

/// Outcome of validating one report message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub reason: String,
    pub status: bool,
    /// Every schema file a load was attempted for, in order
    pub schema_files_attempted: Vec<String>,
    pub invalid_data: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.status
    }
}

/// Running record of the schema files consulted and the problems found so far.
///
/// Every builder method takes `self` and returns the extended value, and the terminal
/// methods copy out of `&self`, so a stage never observes another stage's edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorAccumulator {
    schema_files_attempted: Vec<String>,
    invalid_data: Vec<String>,
}

impl ErrorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a schema file load attempt
    pub fn attempted(mut self, schema_file: impl Into<String>) -> Self {
        self.schema_files_attempted.push(schema_file.into());
        self
    }

    /// Record a problem found before the terminal rejection
    pub fn invalid(mut self, message: impl Into<String>) -> Self {
        self.invalid_data.push(message.into());
        self
    }

    pub fn schema_files_attempted(&self) -> &[String] {
        &self.schema_files_attempted
    }

    pub fn invalid_data(&self) -> &[String] {
        &self.invalid_data
    }

    /// Reject with `reason`, which is also recorded as the last invalid-data entry
    pub fn reject(&self, reason: impl Into<String>) -> ValidationResult {
        let reason = reason.into();
        let mut invalid_data = self.invalid_data.clone();
        invalid_data.push(reason.clone());
        ValidationResult {
            reason,
            status: false,
            schema_files_attempted: self.schema_files_attempted.clone(),
            invalid_data,
        }
    }

    /// Reject because of schema violations; the violations are the invalid data
    pub fn reject_with_violations<I, S>(&self, reason: impl Into<String>, violations: I) -> ValidationResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut invalid_data = self.invalid_data.clone();
        invalid_data.extend(violations.into_iter().map(Into::into));
        ValidationResult {
            reason: reason.into(),
            status: false,
            schema_files_attempted: self.schema_files_attempted.clone(),
            invalid_data,
        }
    }

    /// Accept; accepted results carry no invalid data
    pub fn accept(&self, reason: impl Into<String>) -> ValidationResult {
        ValidationResult {
            reason: reason.into(),
            status: true,
            schema_files_attempted: self.schema_files_attempted.clone(),
            invalid_data: Vec::new(),
        }
    }
}
