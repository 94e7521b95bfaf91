//! Relay Client
//!
//! Capability interfaces for the pipeline orchestrator and the artifact object
//! store, plus an HTTP implementation of the orchestrator API.
//!
//! The HTTP client speaks the orchestrator's JSON RPC protocol: every call is a
//! `POST` to the service endpoint with the operation named in the
//! `X-Amz-Target` header. Request signing is expected to happen in front of
//! the endpoint (gateway or signing proxy); an optional bearer token is sent
//! when configured.
//!
//! # Example
//!
//! ```no_run
//! use relay_client::{HttpPipelineClient, PipelineApi};
//! use relay_core::domain::action::ActionOwner;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HttpPipelineClient::new("http://localhost:4566");
//!
//!     let types = client.list_action_types(ActionOwner::Custom).await?;
//!     println!("{} custom action types", types.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod error;
mod actions;
mod jobs;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use api::{EncryptionParams, ObjectStore, PipelineApi};
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Operation namespace of the orchestrator API
const TARGET_PREFIX: &str = "CodePipeline_20150709";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// HTTP client for the pipeline orchestrator API
///
/// Implements [`PipelineApi`]; operations are grouped into:
/// - Job lifecycle (poll, acknowledge, details, success/failure results)
/// - Action type discovery
#[derive(Debug, Clone)]
pub struct HttpPipelineClient {
    /// Service endpoint (e.g., "https://codepipeline.us-east-1.amazonaws.com")
    base_url: String,
    /// Bearer token sent with every call, if any
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl HttpPipelineClient {
    /// Create a new orchestrator client
    ///
    /// # Example
    /// ```
    /// use relay_client::HttpPipelineClient;
    ///
    /// let client = HttpPipelineClient::new("http://localhost:4566/");
    /// assert_eq!(client.base_url(), "http://localhost:4566");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client: Client::new(),
        }
    }

    /// Regional public endpoint of the orchestrator
    pub fn for_region(region: &str) -> Self {
        Self::new(format!("https://codepipeline.{}.amazonaws.com", region))
    }

    /// Sends `Authorization: Bearer <token>` with every call
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Invokes one operation and deserializes its JSON response
    async fn call<B, T>(&self, operation: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(operation, body).await?;
        self.handle_response(response).await
    }

    /// Invokes one operation whose response carries no payload
    async fn call_empty<B>(&self, operation: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let response = self.send(operation, body).await?;
        self.handle_empty_response(response).await
    }

    async fn send<B>(&self, operation: &str, body: &B) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|e| ClientError::ParseError(format!("Failed to encode request: {}", e)))?;

        let mut request = self
            .client
            .post(format!("{}/", self.base_url))
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(payload);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        tracing::debug!("Calling orchestrator operation {}", operation);
        Ok(request.send().await?)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            return Err(Self::api_error(status.as_u16(), response).await);
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            return Err(Self::api_error(status.as_u16(), response).await);
        }

        Ok(())
    }

    async fn api_error(status: u16, response: reqwest::Response) -> ClientError {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let (error_type, message) = parse_error_body(&text);
        ClientError::api_error(status, error_type, message)
    }
}

/// Splits an error body into its error type and message
///
/// Error types may come namespaced (`ns#JobNotFoundException`); only the last
/// segment is kept. Bodies that are not JSON are returned as the message.
fn parse_error_body(text: &str) -> (Option<String>, String) {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        #[serde(rename = "__type")]
        error_type: Option<String>,
        #[serde(alias = "Message")]
        message: Option<String>,
    }

    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => {
            let error_type = body
                .error_type
                .map(|t| t.rsplit('#').next().unwrap_or_default().to_string());
            let message = body
                .message
                .or_else(|| error_type.clone())
                .unwrap_or_else(|| "Unknown error".to_string());
            (error_type, message)
        }
        Err(_) => (None, text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HttpPipelineClient::new("http://localhost:4566");
        assert_eq!(client.base_url(), "http://localhost:4566");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = HttpPipelineClient::new("http://localhost:4566/");
        assert_eq!(client.base_url(), "http://localhost:4566");
    }

    #[test]
    fn test_client_for_region() {
        let client = HttpPipelineClient::for_region("eu-west-1");
        assert_eq!(
            client.base_url(),
            "https://codepipeline.eu-west-1.amazonaws.com"
        );
    }

    #[test]
    fn test_parse_namespaced_error_body() {
        let (error_type, message) = parse_error_body(
            r#"{"__type":"com.amazonaws.codepipeline#JobNotFoundException","message":"No job"}"#,
        );
        assert_eq!(error_type.as_deref(), Some("JobNotFoundException"));
        assert_eq!(message, "No job");
    }

    #[test]
    fn test_parse_error_body_without_message() {
        let (error_type, message) = parse_error_body(r#"{"__type":"ValidationException"}"#);
        assert_eq!(error_type.as_deref(), Some("ValidationException"));
        assert_eq!(message, "ValidationException");
    }

    #[test]
    fn test_parse_plain_error_body() {
        let (error_type, message) = parse_error_body("Bad Gateway");
        assert_eq!(error_type, None);
        assert_eq!(message, "Bad Gateway");
    }
}
