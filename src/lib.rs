//! Dynamic operation dispatch over OpenAPI descriptions.
//!
//! Loads a dereferenced OpenAPI JSON into an operation model, then
//! invokes operations by id at runtime: supplied values bind to their
//! declared path/query/header locations, JSON bodies are validated
//! against the declared schema, and every call produces a normalized
//! [`Outcome`]. Binding problems are accumulated and reported together
//! before anything touches the network.
//!
//! # Usage
//!
//! ```no_run
//! use openapi_dispatch::OpenApiClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let description = std::fs::read_to_string("petstore.json")?;
//! let client =
//!     OpenApiClient::from_json_str(&description, "https://petstore.example.com/v2")?;
//!
//! let outcome = client.perform("getPetById", &[("petId", "42")]).await;
//! if outcome.is_successful {
//!     println!("{}", outcome.body.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod client;
pub mod error;
pub mod spec;
pub mod validate;

pub use binding::{bind_body, bind_parameters, BoundRequest, BODY_PARAMETER, JSON_CONTENT_TYPE};
pub use client::{OpenApiClient, OpenApiClientBuilder, Outcome};
pub use error::{BindingError, ClientError, DocumentError};
pub use spec::{ApiDocument, HttpMethod, Operation, ParamLocation, ParamSpec, RequestBodySpec};
pub use validate::{DraftValidator, SchemaValidator, SchemaViolation};

// Re-export dependencies for downstream crates
pub use reqwest;
pub use serde_json;
