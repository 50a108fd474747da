//! Mock ResourceClient for unit testing
//!
//! Stores scripted list snapshots and watch sessions in memory and records
//! every call, so controller behavior can be asserted without a running
//! API server.

use crate::error::ClientError;
use crate::models::ResourceObject;
use crate::resource_trait::{RawLineStream, ResourceClient};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted line of a mock watch session.
#[derive(Clone, Debug)]
pub enum ScriptedLine {
    /// A raw JSON line delivered to the watcher.
    Line(String),
    /// A connection-level failure surfaced as an I/O error.
    Fail(String),
}

/// Mock ResourceClient for testing.
///
/// Each queued session is served for one `watch_uninitialized` call; the
/// stream ends after its last line (the watcher treats that as an idle
/// timeout). Once all sessions are consumed, further watches return a stream
/// that never yields, pinning the caller on its idle timer.
#[derive(Clone, Debug)]
pub struct MockResourceClient {
    kind: String,
    lists: Arc<Mutex<VecDeque<Vec<ResourceObject>>>>,
    sessions: Arc<Mutex<VecDeque<Vec<ScriptedLine>>>>,
    replaced: Arc<Mutex<Vec<ResourceObject>>>,
    watch_timeouts: Arc<Mutex<Vec<Duration>>>,
    fail_replace: Arc<Mutex<bool>>,
}

impl MockResourceClient {
    /// Creates an empty mock for the given kind name.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            lists: Arc::new(Mutex::new(VecDeque::new())),
            sessions: Arc::new(Mutex::new(VecDeque::new())),
            replaced: Arc::new(Mutex::new(Vec::new())),
            watch_timeouts: Arc::new(Mutex::new(Vec::new())),
            fail_replace: Arc::new(Mutex::new(false)),
        }
    }

    /// Queues a snapshot returned by the next `list_uninitialized` call.
    pub fn push_list(&self, items: Vec<ResourceObject>) {
        self.lists.lock().unwrap().push_back(items);
    }

    /// Queues the lines served by the next `watch_uninitialized` call.
    pub fn push_session(&self, lines: Vec<ScriptedLine>) {
        self.sessions.lock().unwrap().push_back(lines);
    }

    /// Makes every subsequent `replace` call fail.
    pub fn fail_replaces(&self, fail: bool) {
        *self.fail_replace.lock().unwrap() = fail;
    }

    /// Bodies passed to `replace`, in call order (failed calls included).
    pub fn replaced(&self) -> Vec<ResourceObject> {
        self.replaced.lock().unwrap().clone()
    }

    /// Idle timeouts passed to `watch_uninitialized`, in call order.
    pub fn watch_timeouts(&self) -> Vec<Duration> {
        self.watch_timeouts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ResourceClient for MockResourceClient {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn list_uninitialized(&self) -> Result<Vec<ResourceObject>, ClientError> {
        Ok(self.lists.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn watch_uninitialized(&self, idle_timeout: Duration) -> Result<RawLineStream, ClientError> {
        self.watch_timeouts.lock().unwrap().push(idle_timeout);
        let session = self.sessions.lock().unwrap().pop_front();
        match session {
            Some(lines) => {
                let items = lines.into_iter().map(|line| match line {
                    ScriptedLine::Line(text) => Ok(text),
                    ScriptedLine::Fail(message) => Err(std::io::Error::other(message)),
                });
                Ok(Box::pin(futures::stream::iter(items)))
            }
            None => Ok(Box::pin(futures::stream::pending::<std::io::Result<String>>())),
        }
    }

    async fn replace(
        &self,
        _name: &str,
        _namespace: &str,
        body: &ResourceObject,
    ) -> Result<(), ClientError> {
        self.replaced.lock().unwrap().push(body.clone());
        if *self.fail_replace.lock().unwrap() {
            return Err(ClientError::Kube(kube::Error::Api(kube::core::ErrorResponse {
                status: "Failure".to_string(),
                message: "mock replace failure".to_string(),
                reason: "MockFailure".to_string(),
                code: 500,
            })));
        }
        Ok(())
    }
}
