//! Watch session management.
//!
//! Runs one streaming watch connection per call, decoding raw lines into
//! change events and delivering `ADDED`/`MODIFIED` objects to the caller
//! in arrival order, one at a time. Going idle for longer than the
//! configured timeout is a normal keep-alive boundary, not a failure; the
//! caller reconnects immediately. Anything else that kills the stream is
//! surfaced as fatal so the controller can decide how to restart.

use crate::error::ControllerError;
use futures::StreamExt;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use resource_client::{ResourceClient, ResourceObject};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// One decoded line of a watch stream.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "object")]
pub enum ChangeEvent {
    /// A new object appeared in the collection.
    #[serde(rename = "ADDED")]
    Added(ResourceObject),
    /// An existing object changed.
    #[serde(rename = "MODIFIED")]
    Modified(ResourceObject),
    /// An object left the collection; observed and discarded.
    #[serde(rename = "DELETED")]
    Deleted(ResourceObject),
    /// The server ended the stream with an error status.
    #[serde(rename = "ERROR")]
    Error(Status),
}

/// Why a watch session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// No data arrived within the idle timeout, or the server closed the
    /// stream at its own timeout boundary. Expected; reconnect immediately.
    IdleTimeout,
    /// Connection-level or protocol-level failure. The controller decides
    /// how to restart.
    Fatal(ControllerError),
}

/// Runs a single watch session to completion.
///
/// `on_event` is awaited for each delivered object before the next line is
/// read, so slow processing back-pressures the stream rather than queueing.
/// The stream (and its connection) is dropped before this returns, on every
/// path.
pub async fn run_session<F, Fut>(
    client: &dyn ResourceClient,
    idle_timeout: Duration,
    mut on_event: F,
) -> SessionOutcome
where
    F: FnMut(ResourceObject) -> Fut,
    Fut: Future<Output = ()>,
{
    let kind = client.kind();
    let mut stream = match client.watch_uninitialized(idle_timeout).await {
        Ok(stream) => stream,
        Err(error) => return SessionOutcome::Fatal(error.into()),
    };

    loop {
        let next = tokio::time::timeout(idle_timeout, stream.next()).await;
        match next {
            // Client-side idle timer fired.
            Err(_elapsed) => return SessionOutcome::IdleTimeout,
            // Server closed the stream at its timeout boundary.
            Ok(None) => return SessionOutcome::IdleTimeout,
            Ok(Some(Err(error))) => {
                return SessionOutcome::Fatal(ControllerError::Watch(format!(
                    "{kind} watch stream failed: {error}"
                )));
            }
            Ok(Some(Ok(line))) => {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<ChangeEvent>(&line) {
                    Ok(ChangeEvent::Added(object)) | Ok(ChangeEvent::Modified(object)) => {
                        on_event(object).await;
                    }
                    Ok(ChangeEvent::Deleted(object)) => {
                        debug!(
                            "Ignored DELETED event for {} {}/{}",
                            kind,
                            object.namespace(),
                            object.name()
                        );
                    }
                    Ok(ChangeEvent::Error(status)) => {
                        return SessionOutcome::Fatal(ControllerError::Watch(format!(
                            "{kind} watch returned error event: {}",
                            status.message.unwrap_or_else(|| "unknown".to_string())
                        )));
                    }
                    Err(error) => {
                        // One undecodable line does not invalidate the
                        // stream; drop the line and keep reading.
                        warn!("Skipping undecodable {kind} watch line: {error}");
                    }
                }
            }
        }
    }
}
