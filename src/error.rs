//! Error types for the openapi-dispatch crate.

use thiserror::Error;

/// Pre-flight binding failures detected before any network call.
///
/// Most variants accumulate: a single call reports every parameter and
/// body problem at once. `UnsupportedContentType` and `BodyParse` instead
/// short-circuit the whole call, since the input cannot be meaningfully
/// processed further.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum BindingError {
    #[error("{name} is required")]
    MissingRequiredParameter { name: String },

    #[error("{name} has an unsupported location {location}")]
    UnsupportedLocation { name: String, location: String },

    #[error("body is required")]
    MissingRequiredBody,

    #[error("multiple body values")]
    MultipleBodyValues,

    #[error("body does not support application/json")]
    UnsupportedContentType,

    #[error("unable to parse body JSON: {0}")]
    BodyParse(String),

    #[error("body has errors {0}")]
    SchemaValidation(String),
}

/// Errors raised while loading an API description.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocumentError {
    #[error("API description is not valid JSON")]
    Parse(#[source] serde_json::Error),

    #[error("unsupported HTTP method: {method}")]
    UnsupportedMethod { method: String },
}

/// Errors raised while constructing an [`OpenApiClient`](crate::OpenApiClient).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    #[error("failed to build HTTP client")]
    Http(#[source] reqwest::Error),

    #[error(transparent)]
    Document(#[from] DocumentError),
}
