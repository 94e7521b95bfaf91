//! Error types for the relay client

use relay_core::RelayError;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the orchestrator or the object store
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("{message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error type reported by the API (e.g. `JobNotFoundException`)
        error_type: Option<String>,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Object not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Local I/O during a transfer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Create an API error from status code, error type and message
    pub fn api_error(status: u16, error_type: Option<String>, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            error_type,
            message: message.into(),
        }
    }

    /// Diagnostic detail beyond the message, if the API gave any
    pub fn details(&self) -> Option<String> {
        match self {
            Self::ApiError {
                status,
                error_type: Some(error_type),
                ..
            } => Some(format!("{} (status {})", error_type, status)),
            Self::ApiError { status, .. } => Some(format!("status {}", status)),
            _ => None,
        }
    }
}

impl From<ClientError> for RelayError {
    fn from(err: ClientError) -> Self {
        match err.details() {
            Some(details) => RelayError::transport_with_details(err.to_string(), details),
            None => RelayError::transport(err.to_string()),
        }
    }
}
