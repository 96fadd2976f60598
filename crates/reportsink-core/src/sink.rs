//! Report sink: validate a message, then persist it as a report or a dead letter
//!
//! This is the entry point every transport calls. A message ends up in exactly one of
//! the two collections, or in neither when the schema store fails, in which case the
//! error is returned so the transport can redeliver.

use crate::dead_letter::DeadLetterBuilder;
use crate::error::{Error, Result};
use crate::model::{replace_deprecated_fields, DispositionType, Report, ReportDeadLetter, ReportMessage};
use crate::persistence::{Collection, CollectionExt, Query, Repository};
use crate::validation::{ValidationOrchestrator, ValidationResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Where a processed message went
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SinkOutcome {
    Persisted {
        report_id: String,
    },
    DeadLettered {
        dead_letter_id: String,
        result: ValidationResult,
    },
}

impl SinkOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, SinkOutcome::Persisted { .. })
    }
}

/// Validates and persists report messages
#[derive(Debug, Clone)]
pub struct ReportSink {
    orchestrator: ValidationOrchestrator,
    repository: Repository,
}

impl ReportSink {
    pub fn new(orchestrator: ValidationOrchestrator, repository: Repository) -> Self {
        Self {
            orchestrator,
            repository,
        }
    }

    pub fn orchestrator(&self) -> &ValidationOrchestrator {
        &self.orchestrator
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Process one raw message
    pub fn process(&self, raw: &str) -> Result<SinkOutcome> {
        let mut document = match serde_json::from_str::<Value>(raw) {
            Ok(document) => document,
            Err(e) => {
                let result = ValidationOrchestrator::malformed(&e.to_string());
                let dead_letter = DeadLetterBuilder::new().build_from_raw(raw, &result);
                return self.dead_letter(dead_letter, result);
            }
        };
        replace_deprecated_fields(&mut document);

        let result = self.orchestrator.validate_document(&document)?;
        let message = ReportMessage::from_value(&document);

        if result.status {
            self.persist(&message)
        } else {
            let dead_letter = DeadLetterBuilder::new().build(&message, &result);
            self.dead_letter(dead_letter, result)
        }
    }

    fn persist(&self, message: &ReportMessage) -> Result<SinkOutcome> {
        if message.disposition() == DispositionType::Replace {
            self.remove_replaced(message)?;
        }

        let report_id = Uuid::new_v4().to_string();
        let report = message.to_report(report_id.clone(), Utc::now());
        create(self.repository.reports.as_ref(), &report.id, &report, report.partition_key())?;

        info!(
            upload_id = report.upload_id.as_deref().unwrap_or_default(),
            report_id = %report_id,
            "Report persisted"
        );
        Ok(SinkOutcome::Persisted { report_id })
    }

    /// Delete earlier reports for the same upload and stage action
    fn remove_replaced(&self, message: &ReportMessage) -> Result<usize> {
        let action = message.stage_info.as_ref().and_then(|s| s.action.as_deref());
        let (Some(upload_id), Some(action)) = (message.upload_id.as_deref(), action) else {
            warn!("Replace disposition without upload id and stage action, adding instead");
            return Ok(0);
        };

        let reports = self.repository.reports.as_ref();
        let query = Query::all()
            .eq("uploadId", upload_id)
            .eq("stageInfo.action", action);
        debug!(query = %query.render(reports), "Finding reports to replace");

        let existing: Vec<Report> = reports.query(&query)?;
        let mut removed = 0;
        for report in &existing {
            if reports.delete_item(&report.id, Some(report.partition_key()))? {
                removed += 1;
            }
        }
        info!(upload_id, action, removed, "Replaced earlier reports");
        Ok(removed)
    }

    fn dead_letter(&self, dead_letter: ReportDeadLetter, result: ValidationResult) -> Result<SinkOutcome> {
        let dead_letter_id = dead_letter.id().to_string();
        create(
            self.repository.dead_letters.as_ref(),
            &dead_letter_id,
            &dead_letter,
            dead_letter.partition_key(),
        )?;
        info!(
            upload_id = dead_letter.report.upload_id.as_deref().unwrap_or_default(),
            dead_letter_id = %dead_letter_id,
            reason = %result.reason,
            "Report dead-lettered"
        );
        Ok(SinkOutcome::DeadLettered {
            dead_letter_id,
            result,
        })
    }
}

fn create<T: Serialize>(collection: &dyn Collection, id: &str, item: &T, partition_key: &str) -> Result<()> {
    if collection.create(id, item, Some(partition_key))? {
        Ok(())
    } else {
        Err(Error::persistence(
            collection.name(),
            format!("an item with id '{}' already exists", id),
        ))
    }
}
