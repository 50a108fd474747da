//! ResourceClient trait for mocking
//!
//! This trait abstracts the per-resource-type API surface so the controller
//! can be unit tested against an in-memory mock. The concrete
//! `KubeResourceClient` implements it against a live API server.

use crate::error::ClientError;
use crate::models::ResourceObject;
use futures::stream::BoxStream;
use std::time::Duration;

/// A stream of raw watch lines, one JSON document per item.
///
/// Framing only: decoding a line into an event belongs to the consumer, so a
/// malformed line can be skipped without tearing down the stream.
pub type RawLineStream = BoxStream<'static, std::io::Result<String>>;

/// One watched resource type's API surface.
///
/// All async methods must be `Send` to work with Tokio's work-stealing
/// runtime.
#[async_trait::async_trait]
pub trait ResourceClient: Send + Sync {
    /// User-friendly resource name for logging ("pod", "job", ...).
    fn kind(&self) -> &str;

    /// Cluster-wide snapshot of the handled type, including objects that
    /// still have pending initializers (the API server excludes these by
    /// default). Items are returned in server order.
    async fn list_uninitialized(&self) -> Result<Vec<ResourceObject>, ClientError>;

    /// Opens a cluster-wide watch over the handled type, including
    /// uninitialized objects, bounded server-side by `idle_timeout`.
    ///
    /// The stream ends when the server closes the connection at the timeout
    /// boundary; reconnecting is the caller's responsibility.
    async fn watch_uninitialized(&self, idle_timeout: Duration) -> Result<RawLineStream, ClientError>;

    /// Sends a full-replace update for one object.
    ///
    /// This must be a replace, never a merge-style patch: the
    /// pending-initializers pop has to land atomically with any handler
    /// mutation, and a merge can resurrect a stale queue
    /// (kubernetes/kubernetes#49814).
    async fn replace(
        &self,
        name: &str,
        namespace: &str,
        body: &ResourceObject,
    ) -> Result<(), ClientError>;
}
