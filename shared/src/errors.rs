//! Error types for the Fitness Coach domain

use thiserror::Error;

/// A single failed field check, surfaced inline to the user
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Identifier conversion errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("Entity has no identifier")]
    Missing,

    #[error("Identifier {0} has not been acknowledged by the server")]
    NotPersisted(i64),
}

/// Action block parsing errors
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Malformed payload for action {tag}: {source}")]
    MalformedPayload {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}
