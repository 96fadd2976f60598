//! Report validation
//!
//! - [`ValidationOrchestrator`] sequences the validation stages
//! - [`ErrorAccumulator`] builds every [`ValidationResult`]
//! - [`ContentKind`] classifies `content_type`

pub mod content_type;
pub mod orchestrator;
pub mod result;

pub use content_type::{is_json_mime_type, ContentKind};
pub use orchestrator::{
    base_schema_not_found_reason, content_schema_not_found_reason, schema_violation_reason, Stage,
    ValidationOrchestrator, BASE64_REASON, MALFORMED_REASON, MISSING_CONTENT_REASON,
    MISSING_CONTENT_TYPE_REASON, MISSING_SELECTOR_REASON, NOT_JSON_MIME_REASON,
};
pub use result::{ErrorAccumulator, ValidationResult, SUCCESS_REASON};
