//! Validation: walk a concrete value against a schema (or a resolved match
//! result), producing at most one prioritized diagnostic per value node, with
//! structured payloads that hosts key quick-fixes off of.

mod checker;
mod conflict;
mod error;
mod value;

pub use checker::{Checker, ComplianceOptions};
pub use conflict::resolve_conflicts;
pub use error::{IssueData, IssueKind, MissingProperty, Priority, ValidationError};
pub use value::{AsValue, Field, Fields, Kind, ValueId};

use schema::SchemaDocument;

/// Validate a whole document against its schema's root with default options.
pub fn validate(document: &SchemaDocument, value: &serde_json::Value) -> Vec<ValidationError> {
    validate_with_options(document, value, ComplianceOptions::default())
}

pub fn validate_with_options(
    document: &SchemaDocument,
    value: &serde_json::Value,
    options: ComplianceOptions,
) -> Vec<ValidationError> {
    let root = document.root.clone();
    let mut checker = Checker::new(document).with_options(options);
    checker.check_by_schema(value, &root);
    checker.into_errors()
}
