//! Error taxonomy shared by the trigger and the agent

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors raised while processing a job
#[derive(Debug, Error)]
pub enum RelayError {
    /// Invalid or missing trigger parameters; raised before any network call
    #[error("{0}")]
    Configuration(String),

    /// Orchestrator or object-store call failed
    #[error("{message}")]
    Transport {
        message: String,
        details: Option<String>,
    },

    /// Upstream sent something the protocol does not allow
    #[error("{0}")]
    ProtocolViolation(String),

    /// No produced file could be found for a declared output artifact
    #[error("No output artifact {name} (zip, tar, tar.gz) found in {folder} folder")]
    MissingArtifact { name: String, folder: String },

    /// The build failed or was interrupted
    #[error("{0}")]
    BuildOutcome(String),

    /// Local file system failure while staging artifacts
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl RelayError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            details: None,
        }
    }

    pub fn transport_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolViolation(message.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Stable category name, used as the build problem type
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Configuration(_) => "CONFIGURATION_ERROR",
            RelayError::Transport { .. } => "TRANSPORT_ERROR",
            RelayError::ProtocolViolation(_) => "PROTOCOL_VIOLATION",
            RelayError::MissingArtifact { .. } => "PROTOCOL_VIOLATION",
            RelayError::BuildOutcome(_) => "BUILD_OUTCOME_FAILURE",
            RelayError::Io { .. } => "TRANSPORT_ERROR",
        }
    }

    /// Extra diagnostic detail worth surfacing next to the message
    pub fn details(&self) -> Option<&str> {
        match self {
            RelayError::Transport { details, .. } => details.as_deref(),
            _ => None,
        }
    }

    /// Whether the error was raised before any side effect happened
    pub fn is_configuration(&self) -> bool {
        matches!(self, RelayError::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_message() {
        let err = RelayError::MissingArtifact {
            name: "app".to_string(),
            folder: "/tmp/out".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No output artifact app (zip, tar, tar.gz) found in /tmp/out folder"
        );
        assert_eq!(err.kind(), "PROTOCOL_VIOLATION");
    }

    #[test]
    fn test_transport_details() {
        let err = RelayError::transport_with_details("Access denied", "status 403");
        assert_eq!(err.to_string(), "Access denied");
        assert_eq!(err.details(), Some("status 403"));
        assert!(!err.is_configuration());
        assert!(RelayError::configuration("bad").is_configuration());
    }
}
