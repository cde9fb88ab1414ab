//! OpenAPI document → operation model
//!
//! Loads a dereferenced OpenAPI JSON into an [`ApiDocument`]: a flat list
//! of [`Operation`]s plus a precomputed id index for O(1) resolution.

use std::collections::HashMap;

use serde_json::Value;
use strum::{Display, EnumString};
use tracing::warn;

use crate::error::DocumentError;

/// HTTP verbs the dispatch engine supports.
///
/// Verbs are fixed at document-load time; a description using any other
/// verb fails to load rather than failing at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// Converts to the equivalent `reqwest::Method`.
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Where a parameter is carried on the wire.
///
/// Unknown locations are preserved so binding can report them instead of
/// silently dropping the parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Unsupported(String),
}

impl ParamLocation {
    fn from_raw(raw: &str) -> Self {
        match raw {
            "path" => Self::Path,
            "query" => Self::Query,
            "header" => Self::Header,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// The location string as declared in the description.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Unsupported(raw) => raw,
        }
    }
}

impl std::fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single declared parameter.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ParamSpec {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    /// Declared default, pre-serialized the same way caller values are.
    pub default: Option<String>,
    /// Whether the schema declares an array shape (repeatable values).
    pub is_array: bool,
}

/// A declared request body: required flag plus content-type → schema.
///
/// A media type without a schema is stored as `Value::Null`, meaning
/// there are no constraints to validate against.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct RequestBodySpec {
    pub required: bool,
    pub content: HashMap<String, Value>,
}

impl RequestBodySpec {
    /// The schema for a given content type, if that representation exists.
    pub fn schema(&self, content_type: &str) -> Option<&Value> {
        self.content.get(content_type)
    }
}

/// One invocable operation: verb + path template + declared inputs.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Operation {
    pub operation_id: String,
    pub method: HttpMethod,
    /// URL path template (e.g. "/pets/{petId}")
    pub path: String,
    /// Parameters in declaration order (path-level first, operation-level
    /// overrides in place).
    pub params: Vec<ParamSpec>,
    pub request_body: Option<RequestBodySpec>,
}

/// A loaded API description.
///
/// Immutable once built; shared read-only across concurrent calls.
#[derive(Debug, Clone)]
pub struct ApiDocument {
    operations: Vec<Operation>,
    index: HashMap<String, usize>,
}

const METHOD_KEYS: [(&str, HttpMethod); 7] = [
    ("get", HttpMethod::Get),
    ("post", HttpMethod::Post),
    ("put", HttpMethod::Put),
    ("patch", HttpMethod::Patch),
    ("delete", HttpMethod::Delete),
    ("head", HttpMethod::Head),
    ("options", HttpMethod::Options),
];

impl ApiDocument {
    /// Builds a document from a dereferenced OpenAPI JSON value.
    ///
    /// Operations without an `operationId` are skipped. When two
    /// operations share an id, the first keeps the id for resolution and
    /// a warning is logged.
    pub fn from_json(spec: &Value) -> Result<Self, DocumentError> {
        let mut operations = Vec::new();
        let mut index = HashMap::new();

        let paths = match spec.get("paths").and_then(Value::as_object) {
            Some(p) => p,
            None => return Ok(Self { operations, index }),
        };

        for (path, path_item) in paths {
            if path_item.get("trace").is_some() {
                return Err(DocumentError::UnsupportedMethod {
                    method: "trace".to_string(),
                });
            }

            let path_level_params = path_item.get("parameters");

            for (key, method) in METHOD_KEYS {
                let operation = match path_item.get(key) {
                    Some(op) => op,
                    None => continue,
                };

                let Some(op) = extract_operation(path, method, operation, path_level_params)
                else {
                    continue;
                };

                if index.contains_key(&op.operation_id) {
                    warn!(
                        operation_id = %op.operation_id,
                        path = %op.path,
                        "duplicate operationId, first occurrence wins"
                    );
                } else {
                    index.insert(op.operation_id.clone(), operations.len());
                }
                operations.push(op);
            }
        }

        Ok(Self { operations, index })
    }

    /// Builds a document from API description text.
    pub fn from_json_str(spec: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(spec).map_err(DocumentError::Parse)?;
        Self::from_json(&value)
    }

    /// Looks up an operation by id.
    ///
    /// Pure function of the document: no side effects, identical result
    /// on every call.
    pub fn resolve(&self, operation_id: &str) -> Option<&Operation> {
        self.index.get(operation_id).map(|&i| &self.operations[i])
    }

    /// All operations, in document order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }
}

fn extract_operation(
    path: &str,
    method: HttpMethod,
    operation: &Value,
    path_level_params: Option<&Value>,
) -> Option<Operation> {
    let operation_id = operation
        .get("operationId")
        .and_then(Value::as_str)
        .unwrap_or("");

    if operation_id.is_empty() {
        return None;
    }

    let params = collect_params(path_level_params, operation.get("parameters"));
    let request_body = extract_body(operation);

    Some(Operation {
        operation_id: operation_id.to_string(),
        method,
        path: path.to_string(),
        params,
        request_body,
    })
}

/// Merge path-level + operation-level parameters, in declaration order.
/// Operation-level overrides path-level per OpenAPI spec.
fn collect_params(path_level: Option<&Value>, operation_level: Option<&Value>) -> Vec<ParamSpec> {
    let mut params: Vec<ParamSpec> = Vec::new();
    let mut seen: HashMap<(String, String), usize> = HashMap::new();

    for source in [path_level, operation_level].iter().flatten() {
        let Some(list) = source.as_array() else {
            continue;
        };
        for raw in list {
            let Some(param) = parse_param(raw) else {
                continue;
            };
            let key = (param.name.clone(), param.location.as_str().to_string());
            match seen.get(&key) {
                Some(&i) => params[i] = param,
                None => {
                    seen.insert(key, params.len());
                    params.push(param);
                }
            }
        }
    }

    params
}

fn parse_param(param: &Value) -> Option<ParamSpec> {
    let name = param.get("name")?.as_str()?.to_string();
    let location = ParamLocation::from_raw(param.get("in")?.as_str()?);
    let required = param
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let schema = param.get("schema").cloned().unwrap_or(Value::Null);
    let is_array = schema.get("type").and_then(Value::as_str) == Some("array");
    let default = if is_array {
        schema.pointer("/items/default")
    } else {
        schema.get("default")
    }
    .map(scalar_to_string);

    Some(ParamSpec {
        name,
        location,
        required,
        default,
        is_array,
    })
}

fn extract_body(operation: &Value) -> Option<RequestBodySpec> {
    let request_body = operation.get("requestBody")?;
    let required = request_body
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut content = HashMap::new();
    if let Some(media_types) = request_body.get("content").and_then(Value::as_object) {
        for (content_type, media_type) in media_types {
            let schema = media_type.get("schema").cloned().unwrap_or(Value::Null);
            content.insert(content_type.clone(), schema);
        }
    }

    Some(RequestBodySpec { required, content })
}

/// Defaults arrive as JSON scalars; callers supply pre-serialized strings,
/// so string defaults keep their raw text and other scalars use their
/// JSON rendering.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
