//! Client error handling
//!
//! Network and availability errors are recovered by the service facades and
//! never reach the caller. Validation errors are raised before anything is
//! submitted and are the only errors callers see.

use fitness_coach_shared::validation::describe;
use fitness_coach_shared::{IdError, ValidationError};
use thiserror::Error;

/// Client error type
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error("Backend unavailable")]
    Unavailable,

    #[error("Chat service error: {0}")]
    Chat(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ClientError {
    /// Whether the fallback path can absorb this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClientError::Http(_)
                | ClientError::Status { .. }
                | ClientError::Decode(_)
                | ClientError::Unavailable
                | ClientError::Chat(_)
        )
    }
}

impl From<Vec<ValidationError>> for ClientError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ClientError::Validation(describe(&errors))
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ClientError::Validation(errors.to_string())
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors_are_recoverable() {
        let error = ClientError::Status {
            status: 503,
            body: "down".to_string(),
        };
        assert!(error.is_recoverable());
        assert!(ClientError::Unavailable.is_recoverable());
    }

    #[test]
    fn test_validation_errors_are_not_recoverable() {
        let error: ClientError = vec![ValidationError::new("weight", "Weight is required")].into();
        assert!(!error.is_recoverable());
        assert_eq!(
            error.to_string(),
            "Validation error: weight: Weight is required"
        );
    }

    #[test]
    fn test_storage_errors_are_not_recoverable() {
        let error = ClientError::Storage(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_temporary_id_is_not_a_backend_failure() {
        let error: ClientError = IdError::NotPersisted(1_700_000_000_000).into();
        assert!(!error.is_recoverable());
    }
}
