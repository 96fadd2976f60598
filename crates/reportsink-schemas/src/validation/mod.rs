//! JSON Schema validation of reports
//!
//! Documents are validated with Draft 7 semantics. Violations are reported one per
//! problem, each as a `$`-rooted path plus a message:
//!
//! ```text
//! $.upload_id: is missing but it is required
//! $.stage_info.action: is missing but it is required
//! ```
//!
//! Copyright (c) 2025 Report Sink Team
//! Licensed under the Apache-2.0 license

pub mod error;
pub mod path;
pub mod validator;

pub use error::{SchemaCheckError, Violation};
pub use path::pointer_to_path;
pub use validator::{JsonSchemaValidator, SchemaValidator};
