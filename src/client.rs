//! Operation dispatch client
//!
//! Resolves an operation by id, binds caller values onto its declared
//! parameters and body, and executes the request, normalizing every
//! result into an [`Outcome`]. Pre-flight failures never reach the
//! network.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::binding::{bind_body, bind_parameters, BoundRequest};
use crate::error::ClientError;
use crate::spec::{ApiDocument, Operation};
use crate::validate::{DraftValidator, SchemaValidator};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Normalized result of one [`perform`](OpenApiClient::perform) call.
///
/// Either `failure_reason` is set (pre-flight or transport failure) or
/// the transport fields are; an HTTP error status is a successful
/// transport outcome with `is_successful == false`, not a failure
/// reason. A transport-level failure may carry both a reason and a
/// status descriptor.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct Outcome {
    pub is_successful: bool,
    pub failure_reason: Option<String>,
    pub http_status_code: Option<u16>,
    pub response_status: Option<String>,
    pub body: Option<String>,
}

impl Outcome {
    fn failure(reason: impl Into<String>) -> Self {
        Self {
            is_successful: false,
            failure_reason: Some(reason.into()),
            http_status_code: None,
            response_status: None,
            body: None,
        }
    }
}

/// Builder for configuring an [`OpenApiClient`].
pub struct OpenApiClientBuilder {
    document: ApiDocument,
    base_url: String,
    timeout: Duration,
    validator: Box<dyn SchemaValidator>,
}

impl OpenApiClientBuilder {
    fn new(document: ApiDocument, base_url: impl Into<String>) -> Self {
        Self {
            document,
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            validator: Box::new(DraftValidator),
        }
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the body schema validator.
    pub fn validator(mut self, validator: impl SchemaValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Builds the [`OpenApiClient`].
    ///
    /// ## Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<OpenApiClient, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ClientError::Http)?;

        Ok(OpenApiClient {
            document: self.document,
            base_url: self.base_url,
            http,
            validator: self.validator,
        })
    }
}

/// Dynamic client over a loaded API description.
///
/// The document is immutable after construction, so one client is safely
/// shared across arbitrarily many concurrent calls; every call is an
/// independent unit of work whose only suspension point is the transport
/// round-trip.
pub struct OpenApiClient {
    document: ApiDocument,
    base_url: String,
    http: reqwest::Client,
    validator: Box<dyn SchemaValidator>,
}

impl OpenApiClient {
    /// Creates a new builder for configuring a client.
    pub fn builder(document: ApiDocument, base_url: impl Into<String>) -> OpenApiClientBuilder {
        OpenApiClientBuilder::new(document, base_url)
    }

    /// Creates a client with default settings.
    pub fn new(document: ApiDocument, base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder(document, base_url).build()
    }

    /// Creates a client directly from API description text.
    pub fn from_json_str(spec: &str, base_url: impl Into<String>) -> Result<Self, ClientError> {
        let document = ApiDocument::from_json_str(spec)?;
        Self::new(document, base_url)
    }

    /// The loaded description.
    pub fn document(&self) -> &ApiDocument {
        &self.document
    }

    /// Invokes an operation by id with pre-serialized `(name, value)`
    /// pairs. A name may repeat (array-valued query parameters); the
    /// reserved name `"body"` carries the request body text.
    ///
    /// Binding problems accumulate and are reported together in one
    /// failure; nothing is sent when any pre-flight error exists.
    #[instrument(skip(self, parameters))]
    pub async fn perform(&self, operation_id: &str, parameters: &[(&str, &str)]) -> Outcome {
        let Some(operation) = self.document.resolve(operation_id) else {
            return Outcome::failure(format!("Invalid operation id: {operation_id}"));
        };

        let (bound, mut errors) = bind_parameters(&operation.params, parameters);

        let body = match &operation.request_body {
            Some(spec) => match bind_body(spec, parameters, self.validator.as_ref()) {
                Ok((body, body_errors)) => {
                    errors.extend(body_errors);
                    body
                }
                Err(fatal) => return Outcome::failure(fatal.to_string()),
            },
            None => None,
        };

        if !errors.is_empty() {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            debug!(reason = %joined, "pre-flight validation failed");
            return Outcome::failure(format!("Parameter validation failed: {joined}"));
        }

        self.execute(operation, bound, body).await
    }

    async fn execute(
        &self,
        operation: &Operation,
        bound: BoundRequest,
        body: Option<String>,
    ) -> Outcome {
        let mut url = format!("{}{}", self.base_url.trim_end_matches('/'), operation.path);
        for (name, value) in &bound.path_segments {
            url = url.replace(&format!("{{{name}}}"), &urlencoding::encode(value));
        }

        debug!(method = %operation.method, url = %url, "dispatching request");

        let mut request = self.http.request(operation.method.to_reqwest(), url);
        if !bound.query.is_empty() {
            request = request.query(&bound.query);
        }
        for (name, value) in &bound.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                match response.text().await {
                    Ok(text) => Outcome {
                        is_successful: status.is_success(),
                        failure_reason: None,
                        http_status_code: Some(status.as_u16()),
                        response_status: Some("Completed".to_string()),
                        body: Some(text),
                    },
                    Err(err) => transport_failure(err),
                }
            }
            Err(err) => transport_failure(err),
        }
    }
}

/// Transport-level failures (connection refused, timeout) are a distinct
/// category from HTTP error statuses, which arrive as completed
/// transport outcomes.
fn transport_failure(err: reqwest::Error) -> Outcome {
    let response_status = if err.is_timeout() { "TimedOut" } else { "Error" };
    Outcome {
        is_successful: false,
        failure_reason: Some(err.to_string()),
        http_status_code: err.status().map(|s| s.as_u16()),
        response_status: Some(response_status.to_string()),
        body: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::SchemaViolation;
    use mockito::Matcher;
    use serde_json::{json, Value};

    fn petstore() -> ApiDocument {
        ApiDocument::from_json(&json!({
            "openapi": "3.0.0",
            "paths": {
                "/pets": {
                    "post": {
                        "operationId": "addPet",
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "required": ["name", "photoUrls"],
                                        "properties": {
                                            "name": { "type": "string" },
                                            "photoUrls": {
                                                "type": "array",
                                                "items": { "type": "string" }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "/pets/findByStatus": {
                    "get": {
                        "operationId": "findPetsByStatus",
                        "parameters": [{
                            "name": "status",
                            "in": "query",
                            "schema": {
                                "type": "array",
                                "items": { "type": "string", "default": "available" }
                            }
                        }]
                    }
                },
                "/pets/{petId}": {
                    "get": {
                        "operationId": "getPetById",
                        "parameters": [{
                            "name": "petId",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "string" }
                        }]
                    },
                    "delete": {
                        "operationId": "deletePet",
                        "parameters": [
                            {
                                "name": "petId",
                                "in": "path",
                                "required": true,
                                "schema": { "type": "string" }
                            },
                            {
                                "name": "api_key",
                                "in": "header",
                                "required": true,
                                "schema": { "type": "string" }
                            }
                        ]
                    }
                }
            }
        }))
        .unwrap()
    }

    fn client_for(url: &str) -> OpenApiClient {
        OpenApiClient::new(petstore(), url).unwrap()
    }

    #[tokio::test]
    async fn unknown_operation_id_fails_without_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let outcome = client.perform("renamePet", &[]).await;

        assert!(!outcome.is_successful);
        let reason = outcome.failure_reason.unwrap();
        assert!(reason.contains("renamePet"), "reason was: {reason}");
        assert!(outcome.http_status_code.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_required_parameters_reported_together() {
        let client = client_for("http://localhost");
        let outcome = client.perform("deletePet", &[]).await;

        assert!(!outcome.is_successful);
        let reason = outcome.failure_reason.unwrap();
        assert!(reason.contains("Parameter validation failed"));
        assert!(reason.contains("petId"), "reason was: {reason}");
        assert!(reason.contains("api_key"), "reason was: {reason}");
    }

    #[tokio::test]
    async fn repeated_query_parameter_sends_repeated_pairs() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/pets/findByStatus")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("status".into(), "available".into()),
                Matcher::UrlEncoded("status".into(), "pending".into()),
                Matcher::UrlEncoded("status".into(), "sold".into()),
            ]))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = client_for(&server.url());
        let outcome = client
            .perform(
                "findPetsByStatus",
                &[
                    ("status", "available"),
                    ("status", "pending"),
                    ("status", "sold"),
                ],
            )
            .await;

        assert!(outcome.is_successful);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn omitted_query_parameter_binds_declared_default() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/pets/findByStatus")
            .match_query(Matcher::UrlEncoded("status".into(), "available".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = client_for(&server.url());
        let outcome = client.perform("findPetsByStatus", &[]).await;

        assert!(outcome.is_successful);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn invalid_body_json_fails_before_any_network_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/pets")
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let outcome = client.perform("addPet", &[("body", "{not json")]).await;

        assert!(!outcome.is_successful);
        let reason = outcome.failure_reason.unwrap();
        assert!(
            reason.contains("unable to parse body JSON"),
            "reason was: {reason}"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn schema_violating_body_is_not_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/pets")
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let outcome = client
            .perform("addPet", &[("body", r#"{"name":"rex"}"#)])
            .await;

        assert!(!outcome.is_successful);
        let reason = outcome.failure_reason.unwrap();
        assert!(reason.contains("body has errors"), "reason was: {reason}");
        assert!(reason.contains("photoUrls"), "reason was: {reason}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn valid_body_is_sent_byte_for_byte() {
        let raw = r#"{ "name":"rex",  "photoUrls":[] }"#;

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/pets")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Exact(raw.to_string()))
            .with_status(200)
            .with_body(r#"{"id":7}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let outcome = client.perform("addPet", &[("body", raw)]).await;

        assert!(outcome.is_successful);
        assert_eq!(outcome.http_status_code, Some(200));
        assert_eq!(outcome.response_status.as_deref(), Some("Completed"));
        assert_eq!(outcome.body.as_deref(), Some(r#"{"id":7}"#));
        assert!(outcome.failure_reason.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn path_parameter_is_percent_encoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/pets/hello%20world")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = client_for(&server.url());
        let outcome = client
            .perform("getPetById", &[("petId", "hello world")])
            .await;

        assert!(outcome.is_successful);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn header_parameter_is_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/pets/1")
            .match_header("api_key", "secret")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = client_for(&server.url());
        let outcome = client
            .perform("deletePet", &[("petId", "1"), ("api_key", "secret")])
            .await;

        assert!(outcome.is_successful);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_status_is_a_completed_outcome() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/pets/404")
            .with_status(404)
            .with_body("no such pet")
            .create_async()
            .await;

        let client = client_for(&server.url());
        let outcome = client.perform("getPetById", &[("petId", "404")]).await;

        assert!(!outcome.is_successful);
        assert_eq!(outcome.http_status_code, Some(404));
        assert_eq!(outcome.response_status.as_deref(), Some("Completed"));
        assert_eq!(outcome.body.as_deref(), Some("no such pet"));
        assert!(outcome.failure_reason.is_none());
    }

    #[tokio::test]
    async fn transport_failure_carries_a_reason() {
        // Nothing listens here; the connection is refused
        let client = client_for("http://127.0.0.1:1");
        let outcome = client.perform("findPetsByStatus", &[]).await;

        assert!(!outcome.is_successful);
        assert!(outcome.failure_reason.is_some());
        assert_eq!(outcome.response_status.as_deref(), Some("Error"));
        assert!(outcome.body.is_none());
    }

    #[tokio::test]
    async fn injected_validator_replaces_the_default() {
        struct AcceptAll;
        impl SchemaValidator for AcceptAll {
            fn validate(&self, _: &Value, _: &Value) -> Vec<SchemaViolation> {
                Vec::new()
            }
        }

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/pets")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = OpenApiClient::builder(petstore(), server.url())
            .validator(AcceptAll)
            .build()
            .unwrap();

        // Violates the declared schema, but the injected validator accepts
        let outcome = client
            .perform("addPet", &[("body", r#"{"name":"rex"}"#)])
            .await;

        assert!(outcome.is_successful);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn builder_timeout_is_configurable() {
        let client = OpenApiClient::builder(petstore(), "http://localhost")
            .timeout(Duration::from_secs(5))
            .build();
        assert!(client.is_ok());
    }
}
