//! Caller input → assembled request parts
//!
//! Maps the flat `(name, value)` pairs supplied by a caller onto an
//! operation's declared parameters and body. Binding never fails fast on
//! per-parameter problems: errors accumulate so one call surfaces every
//! issue at once.

use serde_json::Value;

use crate::error::BindingError;
use crate::spec::{ParamLocation, ParamSpec, RequestBodySpec};
use crate::validate::{violation_summary, SchemaValidator};

/// Reserved input name carrying the request body.
pub const BODY_PARAMETER: &str = "body";

/// The only content type the engine consumes.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Transport-location parts of a request, before the template and body
/// are joined in.
#[derive(Debug, Default, Clone)]
#[non_exhaustive]
pub struct BoundRequest {
    /// Named path-segment substitutions.
    pub path_segments: Vec<(String, String)>,
    /// Query pairs; a key repeats once per supplied value.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

/// Binds caller values onto the declared parameters.
///
/// Per descriptor, in declaration order: collect matching values, fall
/// back to the declared default when none were supplied, then package by
/// location. Path and header take the first value (extra values for a
/// single-slot location are ignored, never rejected); query emits one
/// pair per value in input order.
pub fn bind_parameters(
    params: &[ParamSpec],
    input: &[(&str, &str)],
) -> (BoundRequest, Vec<BindingError>) {
    let mut bound = BoundRequest::default();
    let mut errors = Vec::new();

    for param in params {
        let mut values: Vec<&str> = input
            .iter()
            .filter(|(name, _)| *name == param.name)
            .map(|(_, value)| *value)
            .collect();

        if values.is_empty() {
            if let Some(default) = &param.default {
                values.push(default);
            }
        }

        if values.is_empty() {
            if param.required {
                errors.push(BindingError::MissingRequiredParameter {
                    name: param.name.clone(),
                });
            }
            continue;
        }

        match &param.location {
            ParamLocation::Path => bound
                .path_segments
                .push((param.name.clone(), values[0].to_string())),
            ParamLocation::Header => bound
                .headers
                .push((param.name.clone(), values[0].to_string())),
            ParamLocation::Query => {
                for value in values {
                    bound.query.push((param.name.clone(), value.to_string()));
                }
            }
            ParamLocation::Unsupported(raw) => errors.push(BindingError::UnsupportedLocation {
                name: param.name.clone(),
                location: raw.clone(),
            }),
        }
    }

    (bound, errors)
}

/// Binds the request body, when the operation declares one.
///
/// The `Err` arm short-circuits the whole call: a body with no JSON
/// representation, or one that is not syntactically valid JSON, cannot be
/// processed further. Everything else (missing required body, multiple
/// supplied bodies, schema violations) accumulates alongside parameter
/// errors.
///
/// On success the caller's exact text is attached; reserializing would
/// change formatting and number representations.
pub fn bind_body(
    body: &RequestBodySpec,
    input: &[(&str, &str)],
    validator: &dyn SchemaValidator,
) -> Result<(Option<String>, Vec<BindingError>), BindingError> {
    let values: Vec<&str> = input
        .iter()
        .filter(|(name, _)| *name == BODY_PARAMETER)
        .map(|(_, value)| *value)
        .collect();

    if values.is_empty() {
        if body.required {
            return Ok((None, vec![BindingError::MissingRequiredBody]));
        }
        return Ok((None, Vec::new()));
    }

    if values.len() > 1 {
        return Ok((None, vec![BindingError::MultipleBodyValues]));
    }

    let Some(schema) = body.schema(JSON_CONTENT_TYPE) else {
        return Err(BindingError::UnsupportedContentType);
    };

    let raw = values[0];
    let parsed: Value =
        serde_json::from_str(raw).map_err(|err| BindingError::BodyParse(err.to_string()))?;

    // A null schema means the media type declared no constraints.
    if !schema.is_null() {
        let violations = validator.validate(schema, &parsed);
        if !violations.is_empty() {
            return Ok((
                None,
                vec![BindingError::SchemaValidation(violation_summary(
                    &violations,
                ))],
            ));
        }
    }

    Ok((Some(raw.to_string()), Vec::new()))
}
