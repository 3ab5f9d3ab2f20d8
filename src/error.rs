//! Error types for the reconciliation pipeline.

use thiserror::Error;

/// Main error type for merge, reconcile and publish operations.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("Invalid push destination: {0}")]
    InvalidDestination(String),

    #[error("Refusing to publish an empty domain list")]
    EmptyDomains,

    #[error("Push to group {group} failed: {reason}")]
    Push { group: String, reason: String },

    #[error("Fetch of {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

impl From<serde_json::Error> for ReconcileError {
    fn from(e: serde_json::Error) -> Self {
        ReconcileError::Serialization(e.to_string())
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
