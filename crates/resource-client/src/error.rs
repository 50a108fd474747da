//! Client-specific error types.

use thiserror::Error;

/// Errors that can occur talking to the Kubernetes API server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Request could not be constructed
    #[error("Request build error: {0}")]
    Http(#[from] http::Error),

    /// Object could not be serialized for an update
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
