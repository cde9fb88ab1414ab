//! Schema validation capability.
//!
//! The dispatch engine does not interpret schema internals; it hands the
//! parsed body and the declared schema to a [`SchemaValidator`]. The
//! default [`DraftValidator`] delegates to the `jsonschema` crate; tests
//! can inject fakes through the client builder.

use jsonschema::Draft;
use serde::Serialize;
use serde_json::{json, Value};

/// Checks a JSON value against a schema, reporting every violation.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, schema: &Value, instance: &Value) -> Vec<SchemaViolation>;
}

/// One violated constraint: where, what kind, and a readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// Instance path of the offending value ("" for the document root).
    pub path: String,
    /// Violation kind name (e.g. "Required", "Type").
    pub kind: String,
    pub detail: String,
}

/// `jsonschema`-backed validator (Draft 2020-12).
#[derive(Debug, Default, Clone, Copy)]
pub struct DraftValidator;

impl SchemaValidator for DraftValidator {
    fn validate(&self, schema: &Value, instance: &Value) -> Vec<SchemaViolation> {
        let validator = match jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(schema)
        {
            Ok(v) => v,
            // A schema the description itself declares; a compile failure
            // is a violation to report, not a reason to fault the call.
            Err(err) => {
                return vec![SchemaViolation {
                    path: String::new(),
                    kind: "InvalidSchema".to_string(),
                    detail: err.to_string(),
                }]
            }
        };

        validator
            .iter_errors(instance)
            .map(|err| SchemaViolation {
                path: err.instance_path().to_string(),
                kind: leading_ident(&format!("{:?}", err.kind())),
                detail: err.to_string(),
            })
            .collect()
    }
}

/// Variant name from the kind's debug rendering ("Required { .. }" → "Required").
fn leading_ident(debug: &str) -> String {
    debug
        .split([' ', '(', '{'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Compact JSON summary of a violation list, suitable for one failure
/// message covering every issue.
pub fn violation_summary(violations: &[SchemaViolation]) -> String {
    Value::Array(
        violations
            .iter()
            .map(|v| json!({ "path": v.path, "kind": v.kind, "detail": v.detail }))
            .collect(),
    )
    .to_string()
}
